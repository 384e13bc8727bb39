pub mod engine;
pub mod seed;
pub mod test_app;
