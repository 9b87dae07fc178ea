pub mod repositories;
pub mod store;

pub use repositories::{InMemoryRepository, JsonFileRepository};
pub use store::JsonFileStore;
