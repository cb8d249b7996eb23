//! HTTPulse Infrastructure - Adapters and implementations
//!
//! This crate provides concrete implementations of the ports
//! defined in the application layer.

pub mod adapters;
pub mod persistence;
pub mod serialization;

pub use adapters::SystemClock;
pub use persistence::{FileEnvironmentRepository, InMemoryEnvironmentRepository, TokioFileSystem};
pub use serialization::{
    SerializationError, from_json, from_json_bytes, to_json_stable, to_json_stable_bytes,
};
