//! Application error types

use httpulse_domain::DomainError;
use thiserror::Error;

use crate::ports::EnvironmentError;

/// Application-level errors.
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// Input failed domain validation (empty name, blank key, ...).
    #[error("validation error: {0}")]
    Validation(DomainError),

    /// The referenced environment does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The write would break a uniqueness rule.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The same kind of operation is already running.
    #[error("operation already in progress: {0}")]
    Busy(&'static str),

    /// A storage operation failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for ApplicationError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::DuplicateVariableKey(key) => {
                Self::Conflict(format!("variable '{key}' already exists"))
            }
            other => Self::Validation(other),
        }
    }
}

impl From<EnvironmentError> for ApplicationError {
    fn from(error: EnvironmentError) -> Self {
        match error {
            EnvironmentError::NotFound(id) => Self::NotFound(format!("environment {id}")),
            EnvironmentError::Invalid(message) => {
                Self::Validation(DomainError::InvalidIdentifier(message))
            }
            EnvironmentError::Io(_) | EnvironmentError::Serialization(_) => {
                Self::Storage(error.to_string())
            }
        }
    }
}

/// Result type alias for application operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
