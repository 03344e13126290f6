//! Directory-backed storage.

use crate::core::{QuarantineError, QuarantineResult};
use crate::quarantine::storage::{ObjectInfo, ObjectReader, StorageBackend};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Stores each object as one file in a directory.
///
/// # Directory Structure
///
/// ```text
/// quarantine/
/// ├── {name}                  # compressed object
/// └── .{name}.{uuid}.partial  # in-flight write, renamed into place
/// ```
///
/// Names are single path components and may not start with a dot, so no
/// name can escape the directory or collide with an in-flight write.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    /// Opens a directory as a backend, creating it if it doesn't exist.
    pub fn new(root: impl Into<PathBuf>) -> QuarantineResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| QuarantineError::StoreFailed {
            reason: format!("failed to create {}: {}", root.display(), e),
        })?;
        Ok(Self { root })
    }

    /// Returns the backing directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps an object name to its file, rejecting unsafe names.
    fn object_path(&self, name: &str) -> QuarantineResult<PathBuf> {
        let invalid = |reason: &str| QuarantineError::InvalidName {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        if name.is_empty() {
            return Err(invalid("name is empty"));
        }
        if name.starts_with('.') {
            return Err(invalid("name may not start with '.'"));
        }
        if name.contains(['/', '\\', '\0']) {
            return Err(invalid("name may not contain path separators"));
        }
        Ok(self.root.join(name))
    }
}

fn map_not_found(name: &str, err: std::io::Error) -> QuarantineError {
    if err.kind() == ErrorKind::NotFound {
        QuarantineError::NotFound {
            name: name.to_string(),
        }
    } else {
        QuarantineError::RetrieveFailed {
            reason: format!("{name}: {err}"),
        }
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    async fn lookup(&self, name: &str) -> QuarantineResult<ObjectInfo> {
        let path = self.object_path(name)?;
        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| map_not_found(name, e))?;

        if !metadata.is_file() {
            return Err(QuarantineError::NotFound {
                name: name.to_string(),
            });
        }

        Ok(ObjectInfo {
            name: name.to_string(),
            size: metadata.len(),
            modified: metadata.modified().ok().map(DateTime::<Utc>::from),
        })
    }

    async fn open(&self, name: &str) -> QuarantineResult<ObjectReader> {
        let path = self.object_path(name)?;
        let file = tokio::fs::File::open(&path)
            .await
            .map_err(|e| map_not_found(name, e))?;
        Ok(Box::new(file))
    }

    async fn put(&self, name: &str, data: Vec<u8>, size: u64) -> QuarantineResult<ObjectInfo> {
        let path = self.object_path(name)?;
        if data.len() as u64 != size {
            return Err(QuarantineError::StoreFailed {
                reason: format!("{name}: expected {size} bytes, got {}", data.len()),
            });
        }

        let partial = self
            .root
            .join(format!(".{}.{}.partial", name, uuid::Uuid::new_v4()));
        if let Err(e) = tokio::fs::write(&partial, &data).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(QuarantineError::StoreFailed {
                reason: format!("{name}: {e}"),
            });
        }
        if let Err(e) = tokio::fs::rename(&partial, &path).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(QuarantineError::StoreFailed {
                reason: format!("{name}: {e}"),
            });
        }

        Ok(ObjectInfo {
            name: name.to_string(),
            size,
            modified: Some(Utc::now()),
        })
    }

    async fn list(&self) -> QuarantineResult<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with('.') {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_put_open_lookup() {
        let dir = TempDir::new().unwrap();
        let backend = LocalBackend::new(dir.path()).unwrap();

        let info = backend.put("abc123", b"payload".to_vec(), 7).await.unwrap();
        assert_eq!(info.size, 7);

        let info = backend.lookup("abc123").await.unwrap();
        assert_eq!(info.size, 7);
        assert!(info.modified.is_some());

        let mut reader = backend.open("abc123").await.unwrap();
        let mut contents = Vec::new();
        reader.read_to_end(&mut contents).await.unwrap();
        assert_eq!(contents, b"payload");
    }

    #[tokio::test]
    async fn test_missing_object_is_not_found() {
        let dir = TempDir::new().unwrap();
        let backend = LocalBackend::new(dir.path()).unwrap();

        assert!(backend.lookup("missing").await.unwrap_err().is_not_found());
        assert!(backend.open("missing").await.err().unwrap().is_not_found());
    }

    #[tokio::test]
    async fn test_rejects_escaping_names() {
        let dir = TempDir::new().unwrap();
        let backend = LocalBackend::new(dir.path().join("zone")).unwrap();

        for name in ["", "..", "../secret", "a/b", ".hidden", "a\\b"] {
            let err = backend.put(name, Vec::new(), 0).await.unwrap_err();
            assert!(
                matches!(err, QuarantineError::InvalidName { .. }),
                "{name:?} was accepted"
            );
        }
    }

    #[tokio::test]
    async fn test_put_checks_length() {
        let dir = TempDir::new().unwrap();
        let backend = LocalBackend::new(dir.path()).unwrap();

        let err = backend.put("abc", b"four".to_vec(), 5).await.unwrap_err();
        assert!(matches!(err, QuarantineError::StoreFailed { .. }));
        assert!(backend.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_skips_directories_and_partials() {
        let dir = TempDir::new().unwrap();
        let backend = LocalBackend::new(dir.path()).unwrap();

        backend.put("b", vec![1], 1).await.unwrap();
        backend.put("a", vec![2], 1).await.unwrap();
        std::fs::create_dir(dir.path().join("subdir")).unwrap();
        std::fs::write(dir.path().join(".c.partial"), b"x").unwrap();

        assert_eq!(backend.list().await.unwrap(), vec!["a", "b"]);
    }
}
