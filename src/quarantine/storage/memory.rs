//! In-memory storage.

use crate::core::{QuarantineError, QuarantineResult};
use crate::quarantine::storage::{ObjectInfo, ObjectReader, StorageBackend};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{PoisonError, RwLock};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    modified: DateTime<Utc>,
}

/// Keeps objects in a map.
///
/// Useful for tests, and for hosts that hand files to the scanner
/// without touching disk.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts raw (already encoded) bytes under `name`.
    pub fn insert_raw(&self, name: impl Into<String>, data: Vec<u8>) {
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                name.into(),
                StoredObject {
                    data,
                    modified: Utc::now(),
                },
            );
    }

    /// Returns the raw stored bytes for `name`.
    pub fn raw(&self, name: &str) -> Option<Vec<u8>> {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map(|o| o.data.clone())
    }

    fn get(&self, name: &str) -> QuarantineResult<StoredObject> {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| QuarantineError::NotFound {
                name: name.to_string(),
            })
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn lookup(&self, name: &str) -> QuarantineResult<ObjectInfo> {
        let object = self.get(name)?;
        Ok(ObjectInfo {
            name: name.to_string(),
            size: object.data.len() as u64,
            modified: Some(object.modified),
        })
    }

    async fn open(&self, name: &str) -> QuarantineResult<ObjectReader> {
        let object = self.get(name)?;
        Ok(Box::new(Cursor::new(object.data)))
    }

    async fn put(&self, name: &str, data: Vec<u8>, size: u64) -> QuarantineResult<ObjectInfo> {
        if data.len() as u64 != size {
            return Err(QuarantineError::StoreFailed {
                reason: format!("{name}: expected {size} bytes, got {}", data.len()),
            });
        }
        self.insert_raw(name, data);
        self.lookup(name).await
    }

    async fn list(&self) -> QuarantineResult<Vec<String>> {
        let mut names: Vec<String> = self
            .objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        Ok(names)
    }
}
