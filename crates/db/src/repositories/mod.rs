//! [`Repository`](stockroom_core::repository::Repository) implementations.

pub mod json_file;
pub mod memory;

pub use json_file::JsonFileRepository;
pub use memory::InMemoryRepository;
