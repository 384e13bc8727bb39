pub mod forwarder;
pub mod handler;
pub mod registry;
