//! Domain error types

use thiserror::Error;

/// Domain-level errors that can occur during validation or processing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// An environment name is empty or blank.
    #[error("invalid environment name: {0:?}")]
    InvalidEnvironmentName(String),

    /// A variable key is empty or blank.
    #[error("invalid variable key: {0:?}")]
    InvalidVariableKey(String),

    /// The HTTP method is not supported.
    #[error("unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    /// An identifier is invalid or empty.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// A variable key appears more than once in the same environment.
    #[error("duplicate variable key: {0}")]
    DuplicateVariableKey(String),
}

/// Result type alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
