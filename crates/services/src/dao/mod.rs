pub mod base;
pub mod fallback;
pub mod hub;
pub mod memory;
pub mod mongo;
pub mod user;

pub use base::{DaoError, DaoResult, Filter, PaginatedResult, PaginationParams, Store};
pub use fallback::FallbackStore;
pub use hub::HubDirectory;
pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use user::{NewUser, UserDirectory};
