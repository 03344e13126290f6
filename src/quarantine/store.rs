//! The quarantine zone: compressed, named objects in a backing store.

use crate::audit::{AuditEvent, AuditSink, TracingAuditSink};
use crate::core::{QuarantineError, QuarantineResult};
use crate::quarantine::codec::DecompressingReader;
use crate::quarantine::config::{QuarantineConfig, QuarantineKind};
use crate::quarantine::storage::{ArcBackend, ObjectReader};

use std::sync::Arc;

/// A decompressed stream over a quarantined file.
pub type QuarantineReader = DecompressingReader<ObjectReader>;

/// Reads and writes files in the configured quarantine zone.
///
/// Every object is compressed with the configured scheme on the way in
/// and decompressed transparently on the way out.
///
/// # Example
///
/// ```rust,ignore
/// use quarantine_scan::quarantine::{MemoryBackend, Quarantine, QuarantineConfig};
/// use std::sync::Arc;
///
/// let config = QuarantineConfig::new("memory", "zip");
/// let quarantine = Quarantine::new(config, Arc::new(MemoryBackend::new()))?;
/// quarantine.write("abc123", b"suspicious bytes").await?;
/// assert!(quarantine.exists("abc123").await);
/// ```
#[derive(Debug, Clone)]
pub struct Quarantine {
    config: QuarantineConfig,
    kind: QuarantineKind,
    backend: ArcBackend,
    audit: Arc<dyn AuditSink>,
}

impl Quarantine {
    /// Creates a quarantine over `backend`.
    ///
    /// Fails with `UnsupportedKind` if the configured scheme is not
    /// recognised.
    pub fn new(config: QuarantineConfig, backend: ArcBackend) -> QuarantineResult<Self> {
        let kind = config.kind.parse()?;
        Ok(Self {
            config,
            kind,
            backend,
            audit: Arc::new(TracingAuditSink::new()),
        })
    }

    /// Sets the audit sink.
    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Returns the configured quarantine location.
    pub fn location(&self) -> &str {
        &self.config.path
    }

    /// Returns the compression scheme in use.
    pub fn kind(&self) -> QuarantineKind {
        self.kind
    }

    /// Opens a quarantined file for reading, decompressed.
    ///
    /// Fails with `NotFound` if the file is absent.
    pub async fn open_file(&self, name: &str) -> QuarantineResult<QuarantineReader> {
        let raw = self.backend.open(name).await?;
        Ok(self.kind.decoder(raw))
    }

    /// Compresses `contents` and stores them under `name`.
    pub async fn write(&self, name: &str, contents: &[u8]) -> QuarantineResult<()> {
        let encoded = self
            .kind
            .encode(contents)
            .map_err(|e| QuarantineError::StoreFailed {
                reason: format!("failed to compress {name}: {e}"),
            })?;
        let stored_size = encoded.len() as u64;

        self.backend.put(name, encoded, stored_size).await?;

        self.audit.record(AuditEvent::QuarantineWritten {
            name: name.to_string(),
            size: contents.len() as u64,
            stored_size,
        });
        Ok(())
    }

    /// Returns `true` if a file with this name is stored.
    ///
    /// Lookup errors other than "not found" also yield `false`; they are
    /// reported to the audit sink.
    pub async fn exists(&self, name: &str) -> bool {
        match self.backend.lookup(name).await {
            Ok(_) => true,
            Err(e) if e.is_not_found() => false,
            Err(e) => {
                self.audit.record(AuditEvent::LookupFailed {
                    name: name.to_string(),
                    error: e.to_string(),
                });
                false
            }
        }
    }

    /// Returns the names of all quarantined files.
    pub async fn list(&self) -> QuarantineResult<Vec<String>> {
        self.backend.list().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditSink;
    use crate::quarantine::storage::{LocalBackend, MemoryBackend, ObjectInfo, StorageBackend};
    use async_trait::async_trait;
    use tokio::io::AsyncReadExt;

    /// A backend whose every operation fails with a backend error.
    #[derive(Debug)]
    struct BrokenBackend;

    #[async_trait]
    impl StorageBackend for BrokenBackend {
        async fn lookup(&self, _name: &str) -> QuarantineResult<ObjectInfo> {
            Err(QuarantineError::RetrieveFailed {
                reason: "backend offline".into(),
            })
        }

        async fn open(&self, _name: &str) -> QuarantineResult<ObjectReader> {
            Err(QuarantineError::RetrieveFailed {
                reason: "backend offline".into(),
            })
        }

        async fn put(&self, _name: &str, _data: Vec<u8>, _size: u64) -> QuarantineResult<ObjectInfo> {
            Err(QuarantineError::StoreFailed {
                reason: "backend offline".into(),
            })
        }

        async fn list(&self) -> QuarantineResult<Vec<String>> {
            Ok(Vec::new())
        }
    }

    fn memory_quarantine() -> (Quarantine, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let quarantine =
            Quarantine::new(QuarantineConfig::new("memory", "zip"), backend.clone()).unwrap();
        (quarantine, backend)
    }

    async fn read_back(quarantine: &Quarantine, name: &str) -> Vec<u8> {
        let mut reader = quarantine.open_file(name).await.unwrap();
        let mut contents = Vec::new();
        reader.read_to_end(&mut contents).await.unwrap();
        contents
    }

    #[test]
    fn test_unsupported_kind_fails_construction() {
        let err = Quarantine::new(
            QuarantineConfig::new("memory", "lzma"),
            Arc::new(MemoryBackend::new()),
        )
        .unwrap_err();
        assert!(matches!(err, QuarantineError::UnsupportedKind { ref kind } if kind == "lzma"));
    }

    #[tokio::test]
    async fn test_write_then_open_roundtrip() {
        let (quarantine, backend) = memory_quarantine();
        let data = b"X5O!P%@AP[4\\PZX54(P^)7CC)7}$EICAR-STANDARD-ANTIVIRUS-TEST-FILE!$H+H*";

        quarantine.write("eicar", data).await.unwrap();

        let stored = backend.raw("eicar").unwrap();
        assert_ne!(stored.as_slice(), data.as_slice());
        assert_eq!(read_back(&quarantine, "eicar").await, data);
    }

    #[tokio::test]
    async fn test_roundtrip_empty_and_large() {
        let (quarantine, _) = memory_quarantine();

        quarantine.write("empty", &[]).await.unwrap();
        assert!(read_back(&quarantine, "empty").await.is_empty());

        let large: Vec<u8> = (0..3 * 1024 * 1024u32)
            .map(|i| (i.wrapping_mul(2_654_435_761) >> 13) as u8)
            .collect();
        quarantine.write("large", &large).await.unwrap();
        assert_eq!(read_back(&quarantine, "large").await, large);
    }

    #[tokio::test]
    async fn test_write_is_listed_and_exists() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(LocalBackend::new(dir.path()).unwrap());
        let config = QuarantineConfig::new(dir.path().to_str().unwrap(), "zip");
        let sink = Arc::new(MemoryAuditSink::new());
        let quarantine = Quarantine::new(config, backend)
            .unwrap()
            .with_audit_sink(sink.clone());

        assert!(!quarantine.exists("abc").await);
        quarantine.write("abc", b"contents").await.unwrap();
        assert!(quarantine.exists("abc").await);
        assert_eq!(quarantine.list().await.unwrap(), vec!["abc"]);
        assert_eq!(quarantine.location(), dir.path().to_str().unwrap());
        assert_eq!(sink.event_types(), vec!["quarantine_written"]);
    }

    #[tokio::test]
    async fn test_open_missing_is_not_found() {
        let (quarantine, _) = memory_quarantine();
        let err = quarantine.open_file("missing").await.err().unwrap();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_exists_hides_backend_errors() {
        let sink = Arc::new(MemoryAuditSink::new());
        let quarantine = Quarantine::new(
            QuarantineConfig::new("broken", "zip"),
            Arc::new(BrokenBackend),
        )
        .unwrap()
        .with_audit_sink(sink.clone());

        assert!(!quarantine.exists("anything").await);
        assert_eq!(sink.event_types(), vec!["lookup_failed"]);

        let err = quarantine.write("anything", b"x").await.unwrap_err();
        assert!(matches!(err, QuarantineError::StoreFailed { .. }));
    }
}
