//! File-based environment repository implementation.
//!
//! Each environment is one JSON file named after its id:
//!
//! ```text
//! data_dir/
//!   environments/
//!     0190c3b2-....json
//!     0190c3b3-....json
//! ```
//!
//! Writes go to a `.tmp` sibling first and are renamed into place, so a
//! crash never leaves a half-written environment behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use httpulse_application::ports::{EnvironmentError, EnvironmentRepository, FileSystem};
use httpulse_domain::environment::Environment;
use tracing::{debug, warn};

use crate::serialization::{from_json_bytes, to_json_stable_bytes};

const ENVIRONMENTS_DIR: &str = "environments";

/// File-based environment repository rooted at a data directory.
#[derive(Debug, Clone)]
pub struct FileEnvironmentRepository<F> {
    fs: F,
    root: PathBuf,
}

impl<F: FileSystem> FileEnvironmentRepository<F> {
    /// Creates a repository storing files under `root/environments/`.
    pub fn new(fs: F, root: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            root: root.into(),
        }
    }

    /// Returns the directory holding the environment files.
    #[must_use]
    pub fn environments_dir(&self) -> PathBuf {
        self.root.join(ENVIRONMENTS_DIR)
    }

    fn environment_path(&self, id: &str) -> Result<PathBuf, EnvironmentError> {
        if !is_safe_file_stem(id) {
            return Err(EnvironmentError::Invalid(format!(
                "environment id {id:?} cannot be used as a file name"
            )));
        }
        Ok(self.environments_dir().join(format!("{id}.json")))
    }

    async fn read_environment(&self, path: &Path) -> Result<Environment, EnvironmentError> {
        let content = self.fs.read_file(path).await.map_err(std::io::Error::from)?;
        from_json_bytes(&content).map_err(|e| EnvironmentError::Serialization(e.to_string()))
    }

    /// Writes the file next to its destination; returns the temp path.
    async fn stage(
        &self,
        environment: &Environment,
    ) -> Result<(PathBuf, PathBuf), EnvironmentError> {
        let path = self.environment_path(&environment.id)?;
        let tmp = path.with_extension("json.tmp");

        let content = to_json_stable_bytes(environment)
            .map_err(|e| EnvironmentError::Serialization(e.to_string()))?;

        self.fs
            .write_file(&tmp, &content)
            .await
            .map_err(std::io::Error::from)?;
        Ok((tmp, path))
    }

    async fn read_previous(&self, path: &Path) -> Result<Option<Vec<u8>>, EnvironmentError> {
        if !self.fs.exists(path).await {
            return Ok(None);
        }
        let content = self.fs.read_file(path).await.map_err(std::io::Error::from)?;
        Ok(Some(content))
    }

    /// Puts back what the committed files held before the batch started.
    async fn roll_back(&self, committed: &[(PathBuf, PathBuf)], previous: &[Option<Vec<u8>>]) {
        for ((_, path), prior) in committed.iter().zip(previous) {
            let restored = match prior {
                Some(content) => self.fs.write_file(path, content).await,
                None => self.fs.remove_file(path).await,
            };
            if let Err(error) = restored {
                warn!(path = %path.display(), %error, "cannot roll back environment file");
            }
        }
    }

    async fn discard(&self, staged: &[(PathBuf, PathBuf)]) {
        for (tmp, _) in staged {
            if let Err(error) = self.fs.remove_file(tmp).await {
                debug!(path = %tmp.display(), %error, "staged file already gone");
            }
        }
    }

    async fn commit(&self, tmp: &Path, path: &Path) -> Result<(), EnvironmentError> {
        self.fs
            .rename(tmp, path)
            .await
            .map_err(std::io::Error::from)?;
        Ok(())
    }
}

/// Ids are used as file names, so only a conservative character set passes.
fn is_safe_file_stem(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[async_trait]
impl<F: FileSystem> EnvironmentRepository for FileEnvironmentRepository<F> {
    async fn get(&self, id: &str) -> Result<Option<Environment>, EnvironmentError> {
        let path = self.environment_path(id)?;
        if !self.fs.exists(&path).await {
            return Ok(None);
        }
        self.read_environment(&path).await.map(Some)
    }

    async fn list(&self) -> Result<Vec<Environment>, EnvironmentError> {
        let dir = self.environments_dir();
        if !self.fs.exists(&dir).await {
            return Ok(Vec::new());
        }

        let entries = self
            .fs
            .read_dir(&dir)
            .await
            .map_err(std::io::Error::from)?;

        let mut environments = Vec::new();
        for entry in entries {
            if entry.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            match self.read_environment(&entry).await {
                Ok(environment) => environments.push(environment),
                Err(error) => {
                    warn!(path = %entry.display(), %error, "skipping unreadable environment file");
                }
            }
        }

        debug!(count = environments.len(), dir = %dir.display(), "listed environments");
        Ok(environments)
    }

    async fn save(&self, environment: &Environment) -> Result<(), EnvironmentError> {
        let (tmp, path) = self.stage(environment).await?;
        self.commit(&tmp, &path).await
    }

    /// Stages every file before renaming any of them into place. If a
    /// rename fails, files already committed get their previous content back.
    async fn save_all(&self, environments: &[Environment]) -> Result<(), EnvironmentError> {
        let mut staged = Vec::with_capacity(environments.len());
        for environment in environments {
            match self.stage(environment).await {
                Ok(entry) => staged.push(entry),
                Err(error) => {
                    self.discard(&staged).await;
                    return Err(error);
                }
            }
        }

        let mut previous = Vec::with_capacity(staged.len());
        for (_, path) in &staged {
            match self.read_previous(path).await {
                Ok(prior) => previous.push(prior),
                Err(error) => {
                    self.discard(&staged).await;
                    return Err(error);
                }
            }
        }

        for (index, (tmp, path)) in staged.iter().enumerate() {
            if let Err(error) = self.commit(tmp, path).await {
                warn!(path = %path.display(), %error, "batch write failed, rolling back");
                self.roll_back(&staged[..index], &previous[..index]).await;
                self.discard(&staged[index..]).await;
                return Err(error);
            }
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), EnvironmentError> {
        let path = self.environment_path(id)?;

        if !self.fs.exists(&path).await {
            return Err(EnvironmentError::NotFound(id.to_string()));
        }

        self.fs
            .remove_file(&path)
            .await
            .map_err(std::io::Error::from)?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::TokioFileSystem;
    use httpulse_application::ports::FileSystemError;
    use pretty_assertions::assert_eq;

    /// Fails renames onto any file whose name contains `fail_on`.
    struct FailingRename {
        inner: TokioFileSystem,
        fail_on: String,
    }

    impl FileSystem for FailingRename {
        async fn read_file(&self, path: &Path) -> Result<Vec<u8>, FileSystemError> {
            self.inner.read_file(path).await
        }

        async fn write_file(&self, path: &Path, contents: &[u8]) -> Result<(), FileSystemError> {
            self.inner.write_file(path, contents).await
        }

        async fn create_dir_all(&self, path: &Path) -> Result<(), FileSystemError> {
            self.inner.create_dir_all(path).await
        }

        async fn exists(&self, path: &Path) -> bool {
            self.inner.exists(path).await
        }

        async fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>, FileSystemError> {
            self.inner.read_dir(path).await
        }

        async fn remove_file(&self, path: &Path) -> Result<(), FileSystemError> {
            self.inner.remove_file(path).await
        }

        async fn rename(&self, from: &Path, to: &Path) -> Result<(), FileSystemError> {
            if to.to_string_lossy().contains(&self.fail_on) {
                return Err(FileSystemError::Io(std::io::Error::other("rename refused")));
            }
            self.inner.rename(from, to).await
        }
    }

    fn repository(dir: &tempfile::TempDir) -> FileEnvironmentRepository<TokioFileSystem> {
        FileEnvironmentRepository::new(TokioFileSystem::new(), dir.path())
    }

    #[test]
    fn test_safe_file_stem() {
        assert!(is_safe_file_stem("0190c3b2-7a4e-7cc0-b1a8-3b1f7a9e2d10"));
        assert!(is_safe_file_stem("env_1"));
        assert!(!is_safe_file_stem(""));
        assert!(!is_safe_file_stem("../etc/passwd"));
        assert!(!is_safe_file_stem("a b"));
    }

    #[tokio::test]
    async fn test_save_get_and_layout() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = repository(&dir);
        let env = Environment::new("dev").with_variable("baseUrl", "http://localhost:3000");

        repo.save(&env).await.expect("save");

        let file = dir.path().join("environments").join(format!("{}.json", env.id));
        assert!(file.exists());
        assert!(!file.with_extension("json.tmp").exists());
        assert_eq!(repo.get(&env.id).await.expect("get"), Some(env));
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = repository(&dir);
        assert_eq!(repo.get("missing").await.expect("get"), None);
    }

    #[tokio::test]
    async fn test_save_replaces_existing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = repository(&dir);
        let mut env = Environment::new("dev");
        repo.save(&env).await.expect("save");

        env.name = "local".to_string();
        repo.save(&env).await.expect("save again");

        let all = repo.list().await.expect("list");
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "local");
    }

    #[tokio::test]
    async fn test_list_empty_when_directory_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = repository(&dir);
        assert!(repo.list().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn test_list_skips_unreadable_and_foreign_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = repository(&dir);
        let env = Environment::new("dev");
        repo.save(&env).await.expect("save");

        let env_dir = repo.environments_dir();
        std::fs::write(env_dir.join("broken.json"), "{ not json").expect("write");
        std::fs::write(env_dir.join("notes.txt"), "hello").expect("write");

        let all = repo.list().await.expect("list");
        assert_eq!(all, vec![env]);
    }

    #[tokio::test]
    async fn test_save_all_and_find_by_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = repository(&dir);
        let envs = vec![Environment::new("a"), Environment::new("b")];

        repo.save_all(&envs).await.expect("save_all");

        let found = repo.find_by_name("b").await.expect("find");
        assert_eq!(found.map(|e| e.id), Some(envs[1].id.clone()));
        assert!(repo.exists(&envs[0].id).await.expect("exists"));
    }

    #[tokio::test]
    async fn test_save_all_rolls_back_on_failed_rename() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut a = Environment::new("a");
        a.is_active = true;
        let b = Environment::new("b");
        repository(&dir).save_all(&[a.clone(), b.clone()]).await.expect("seed");

        let repo = FileEnvironmentRepository::new(
            FailingRename {
                inner: TokioFileSystem::new(),
                fail_on: b.id.clone(),
            },
            dir.path(),
        );
        let mut a_off = a.clone();
        a_off.is_active = false;
        let mut b_on = b.clone();
        b_on.is_active = true;
        let fresh = Environment::new("c");

        let result = repo.save_all(&[a_off, fresh.clone(), b_on]).await;

        assert!(matches!(result, Err(EnvironmentError::Io(_))));
        assert_eq!(repo.get(&a.id).await.expect("get a"), Some(a));
        assert_eq!(repo.get(&b.id).await.expect("get b"), Some(b));
        assert_eq!(repo.get(&fresh.id).await.expect("get c"), None);
        let leftovers: Vec<_> = std::fs::read_dir(repo.environments_dir())
            .expect("read dir")
            .filter_map(Result::ok)
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_delete() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = repository(&dir);
        let env = Environment::new("dev");
        repo.save(&env).await.expect("save");

        repo.delete(&env.id).await.expect("delete");

        assert_eq!(repo.get(&env.id).await.expect("get"), None);
        assert!(matches!(
            repo.delete(&env.id).await,
            Err(EnvironmentError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_unsafe_id_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = repository(&dir);
        let mut env = Environment::new("dev");
        env.id = "../escape".to_string();

        assert!(matches!(
            repo.save(&env).await,
            Err(EnvironmentError::Invalid(_))
        ));
        assert!(matches!(
            repo.get("../escape").await,
            Err(EnvironmentError::Invalid(_))
        ));
    }
}
