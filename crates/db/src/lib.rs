pub mod connection;
pub mod entity;
pub mod indexes;
pub mod models;

pub use connection::{connect, connect_lazy};
pub use entity::Entity;
