//! Persistence implementations for environment storage.

mod environment_repository;
mod file_system;
mod memory;

pub use environment_repository::FileEnvironmentRepository;
pub use file_system::TokioFileSystem;
pub use memory::InMemoryEnvironmentRepository;
