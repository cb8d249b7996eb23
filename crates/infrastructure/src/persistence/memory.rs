//! In-memory environment repository.

use std::collections::BTreeMap;

use async_trait::async_trait;
use httpulse_application::ports::{EnvironmentError, EnvironmentRepository};
use httpulse_domain::environment::Environment;
use parking_lot::RwLock;

/// Keeps environments in a map keyed by id. Nothing survives the process.
#[derive(Debug, Default)]
pub struct InMemoryEnvironmentRepository {
    environments: RwLock<BTreeMap<String, Environment>>,
}

impl InMemoryEnvironmentRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository pre-filled with `environments`.
    #[must_use]
    pub fn with_environments(environments: impl IntoIterator<Item = Environment>) -> Self {
        let map = environments
            .into_iter()
            .map(|env| (env.id.clone(), env))
            .collect();
        Self {
            environments: RwLock::new(map),
        }
    }

    /// Returns the number of stored environments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.environments.read().len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.environments.read().is_empty()
    }
}

#[async_trait]
impl EnvironmentRepository for InMemoryEnvironmentRepository {
    async fn get(&self, id: &str) -> Result<Option<Environment>, EnvironmentError> {
        Ok(self.environments.read().get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<Environment>, EnvironmentError> {
        Ok(self.environments.read().values().cloned().collect())
    }

    async fn save(&self, environment: &Environment) -> Result<(), EnvironmentError> {
        self.environments
            .write()
            .insert(environment.id.clone(), environment.clone());
        Ok(())
    }

    async fn save_all(&self, environments: &[Environment]) -> Result<(), EnvironmentError> {
        let mut map = self.environments.write();
        for environment in environments {
            map.insert(environment.id.clone(), environment.clone());
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), EnvironmentError> {
        self.environments
            .write()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| EnvironmentError::NotFound(id.to_string()))
    }

    /// Checks every id before removing any.
    async fn delete_many(&self, ids: &[String]) -> Result<(), EnvironmentError> {
        let mut map = self.environments.write();
        if let Some(missing) = ids.iter().find(|id| !map.contains_key(id.as_str())) {
            return Err(EnvironmentError::NotFound(missing.clone()));
        }
        for id in ids {
            map.remove(id);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_crud() {
        let repo = InMemoryEnvironmentRepository::new();
        let env = Environment::new("dev");

        repo.save(&env).await.expect("save");
        assert_eq!(repo.get(&env.id).await.expect("get"), Some(env.clone()));
        assert_eq!(repo.len(), 1);

        repo.delete(&env.id).await.expect("delete");
        assert!(repo.is_empty());
        assert!(matches!(
            repo.delete(&env.id).await,
            Err(EnvironmentError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_many_is_all_or_nothing() {
        let a = Environment::new("a");
        let b = Environment::new("b");
        let repo = InMemoryEnvironmentRepository::with_environments([a.clone(), b.clone()]);

        let result = repo
            .delete_many(&[a.id.clone(), "missing".to_string()])
            .await;

        assert!(matches!(result, Err(EnvironmentError::NotFound(id)) if id == "missing"));
        assert_eq!(repo.len(), 2);

        repo.delete_many(&[a.id, b.id]).await.expect("delete_many");
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn test_find_by_name_uses_default() {
        let dev = Environment::new("dev");
        let repo = InMemoryEnvironmentRepository::with_environments([dev.clone()]);

        assert_eq!(repo.find_by_name("dev").await.expect("find"), Some(dev));
        assert_eq!(repo.find_by_name("prod").await.expect("find"), None);
    }
}
