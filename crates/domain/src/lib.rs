//! HTTPulse Domain - Core value types
//!
//! This crate defines the domain model shared by the request editor and the
//! environment store. All types here are pure Rust with no I/O dependencies.

pub mod auth;
pub mod environment;
pub mod error;
pub mod id;
pub mod request;

pub use auth::{ApiKeyLocation, AuthConfig};
pub use environment::{Environment, EnvironmentVariable};
pub use error::{DomainError, DomainResult};
pub use id::generate_id;
pub use request::{Header, Headers, HttpMethod, HttpRequest, QueryParam, QueryParams};
