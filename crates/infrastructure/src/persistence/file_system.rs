//! Real file system implementation.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use httpulse_application::ports::{FileSystem, FileSystemError};
use tokio::fs;

/// File system implementation over `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFileSystem;

impl TokioFileSystem {
    /// Creates a new `TokioFileSystem`.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn classify(path: &Path, error: std::io::Error) -> FileSystemError {
    match error.kind() {
        ErrorKind::NotFound => FileSystemError::NotFound(path.to_path_buf()),
        ErrorKind::PermissionDenied => FileSystemError::PermissionDenied(path.to_path_buf()),
        _ => FileSystemError::Io(error),
    }
}

impl FileSystem for TokioFileSystem {
    async fn read_file(&self, path: &Path) -> Result<Vec<u8>, FileSystemError> {
        fs::read(path).await.map_err(|e| classify(path, e))
    }

    async fn write_file(&self, path: &Path, contents: &[u8]) -> Result<(), FileSystemError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, contents).await.map_err(|e| classify(path, e))
    }

    async fn create_dir_all(&self, path: &Path) -> Result<(), FileSystemError> {
        fs::create_dir_all(path).await.map_err(|e| classify(path, e))
    }

    async fn exists(&self, path: &Path) -> bool {
        fs::metadata(path).await.is_ok()
    }

    async fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>, FileSystemError> {
        let mut entries = Vec::new();
        let mut dir = fs::read_dir(path).await.map_err(|e| classify(path, e))?;

        while let Some(entry) = dir.next_entry().await? {
            entries.push(entry.path());
        }

        entries.sort();
        Ok(entries)
    }

    async fn remove_file(&self, path: &Path) -> Result<(), FileSystemError> {
        fs::remove_file(path).await.map_err(|e| classify(path, e))
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<(), FileSystemError> {
        fs::rename(from, to).await.map_err(|e| classify(from, e))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_write_creates_parents_and_reads_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fs = TokioFileSystem::new();
        let path = dir.path().join("nested/a.json");

        fs.write_file(&path, b"{}").await.expect("write");

        assert!(fs.exists(&path).await);
        assert_eq!(fs.read_file(&path).await.expect("read"), b"{}");
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fs = TokioFileSystem::new();
        let path = dir.path().join("missing.json");

        let result = fs.read_file(&path).await;

        assert!(matches!(result, Err(FileSystemError::NotFound(p)) if p == path));
        assert!(!fs.exists(&path).await);
    }

    #[tokio::test]
    async fn test_read_dir_is_sorted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fs = TokioFileSystem::new();
        for name in ["b.json", "a.json", "c.json"] {
            fs.write_file(&dir.path().join(name), b"").await.expect("write");
        }

        let entries = fs.read_dir(dir.path()).await.expect("read_dir");

        let names: Vec<_> = entries
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.json", "b.json", "c.json"]);
    }

    #[tokio::test]
    async fn test_rename_replaces_destination() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fs = TokioFileSystem::new();
        let from = dir.path().join("a.tmp");
        let to = dir.path().join("a.json");
        fs.write_file(&to, b"old").await.expect("write");
        fs.write_file(&from, b"new").await.expect("write");

        fs.rename(&from, &to).await.expect("rename");

        assert!(!fs.exists(&from).await);
        assert_eq!(fs.read_file(&to).await.expect("read"), b"new");
        fs.remove_file(&to).await.expect("remove");
        assert!(!fs.exists(&to).await);
    }
}
