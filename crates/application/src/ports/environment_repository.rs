//! Environment repository port
//!
//! Defines the persistence contract the environment store depends on:
//! create-or-replace by id, enumerate, delete by id(s) and find by name.

use async_trait::async_trait;

use httpulse_domain::environment::Environment;

/// Errors that can occur during environment persistence.
#[derive(Debug, thiserror::Error)]
pub enum EnvironmentError {
    /// Environment not found.
    #[error("Environment not found: {0}")]
    NotFound(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid environment data.
    #[error("Invalid environment: {0}")]
    Invalid(String),
}

/// Repository trait for environment persistence.
#[async_trait]
pub trait EnvironmentRepository: Send + Sync {
    /// Loads an environment by id. Absence is `Ok(None)`.
    async fn get(&self, id: &str) -> Result<Option<Environment>, EnvironmentError>;

    /// Loads every stored environment, in no particular order.
    async fn list(&self) -> Result<Vec<Environment>, EnvironmentError>;

    /// Creates or replaces the environment with the same id.
    async fn save(&self, environment: &Environment) -> Result<(), EnvironmentError>;

    /// Deletes an environment by id.
    ///
    /// # Errors
    /// Returns `EnvironmentError::NotFound` if the environment doesn't exist.
    async fn delete(&self, id: &str) -> Result<(), EnvironmentError>;

    /// Creates or replaces several environments as one write.
    ///
    /// The default writes them one by one; adapters with transactions
    /// should override it.
    async fn save_all(&self, environments: &[Environment]) -> Result<(), EnvironmentError> {
        for environment in environments {
            self.save(environment).await?;
        }
        Ok(())
    }

    /// Deletes several environments by id.
    async fn delete_many(&self, ids: &[String]) -> Result<(), EnvironmentError> {
        for id in ids {
            self.delete(id).await?;
        }
        Ok(())
    }

    /// Finds the first environment with exactly this name.
    async fn find_by_name(&self, name: &str) -> Result<Option<Environment>, EnvironmentError> {
        Ok(self.list().await?.into_iter().find(|env| env.name == name))
    }

    /// Checks if an environment with this id exists.
    async fn exists(&self, id: &str) -> Result<bool, EnvironmentError> {
        Ok(self.get(id).await?.is_some())
    }
}
