//! Backing stores for quarantined objects.
//!
//! The quarantine only needs byte-stream reads and whole-object writes by
//! name; [`StorageBackend`] is that contract. Two implementations ship
//! with the crate:
//!
//! - [`LocalBackend`] - a directory on disk
//! - [`MemoryBackend`] - an in-process map, for tests and embedding

mod local;
mod memory;

pub use local::LocalBackend;
pub use memory::MemoryBackend;

use crate::core::{QuarantineResult, ScanError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt::Debug;
use std::sync::Arc;
use tokio::io::AsyncRead;

/// A readable stream over a stored object.
pub type ObjectReader = Box<dyn AsyncRead + Send + Unpin>;

/// What the backend knows about a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    /// Object name.
    pub name: String,
    /// Stored size in bytes.
    pub size: u64,
    /// Last modification time, if the backend tracks it.
    pub modified: Option<DateTime<Utc>>,
}

/// Named byte storage used by the quarantine.
///
/// Implementations must support concurrent operations on distinct
/// names. Concurrent writers to the same name are not coordinated.
#[async_trait]
pub trait StorageBackend: Send + Sync + Debug {
    /// Looks up an object without opening it.
    ///
    /// Fails with `NotFound` if no object has this name.
    async fn lookup(&self, name: &str) -> QuarantineResult<ObjectInfo>;

    /// Opens an object for reading.
    ///
    /// Fails with `NotFound` if no object has this name.
    async fn open(&self, name: &str) -> QuarantineResult<ObjectReader>;

    /// Stores `data` as an object of exactly `size` bytes, replacing any
    /// existing object with this name.
    async fn put(&self, name: &str, data: Vec<u8>, size: u64) -> QuarantineResult<ObjectInfo>;

    /// Returns the names of all stored objects, sorted.
    async fn list(&self) -> QuarantineResult<Vec<String>>;
}

/// A shared backend handle.
pub type ArcBackend = Arc<dyn StorageBackend>;

/// Returns `true` if `location` is a store-qualified `remote:path`
/// reference rather than a plain filesystem path.
///
/// Both named remotes (`swift:bucket/dir`) and on-the-fly backends
/// (`:s3:bucket`) count as remote.
pub fn is_remote_reference(location: &str) -> bool {
    if let Some(rest) = location.strip_prefix(':') {
        return rest.contains(':');
    }

    let Some((remote, _)) = location.split_once(':') else {
        return false;
    };

    // "C:\quarantine" is a drive letter, not a remote.
    if cfg!(windows) && remote.len() == 1 {
        return false;
    }

    !remote.is_empty()
        && remote
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ' '))
}

/// Opens the backend for a configured quarantine location.
///
/// Plain paths get a [`LocalBackend`], created if missing. Remote
/// references are rejected: no remote backend is compiled in.
pub fn open_backend(location: &str) -> Result<ArcBackend, ScanError> {
    if location.is_empty() {
        return Err(ScanError::configuration("quarantine path not set"));
    }
    if is_remote_reference(location) {
        return Err(ScanError::configuration(format!(
            "no storage backend available for remote location '{location}'"
        )));
    }
    let backend = LocalBackend::new(location)?;
    Ok(Arc::new(backend))
}
