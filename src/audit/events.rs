//! Audit event types and sinks.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Debug;
use std::sync::{Mutex, PoisonError};
use uuid::Uuid;

/// A structured event emitted by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// A scan request was accepted.
    ScanStarted {
        /// Correlation ID for this scan.
        scan_id: Uuid,
        /// Quarantine object being scanned.
        filename: String,
        /// When the scan started.
        timestamp: DateTime<Utc>,
    },

    /// The quarantined file was copied to local disk.
    FileStaged {
        /// Correlation ID for this scan.
        scan_id: Uuid,
        /// Local path of the staged copy.
        path: String,
        /// Decompressed size in bytes.
        size: u64,
        /// BLAKE3 digest of the staged bytes.
        blake3: String,
    },

    /// The scan finished and produced a verdict.
    ScanCompleted {
        /// Correlation ID for this scan.
        scan_id: Uuid,
        /// Quarantine object that was scanned.
        filename: String,
        /// Number of infected findings.
        positives: u32,
        /// Name of the reported threat, if any.
        threat: Option<String>,
        /// Wall-clock duration of the scan.
        duration_ms: u64,
    },

    /// The scan failed.
    ScanFailed {
        /// Correlation ID for this scan.
        scan_id: Uuid,
        /// Quarantine object that was scanned.
        filename: String,
        /// Rendered error.
        error: String,
        /// Wall-clock duration of the scan.
        duration_ms: u64,
    },

    /// A staged file could not be removed.
    CleanupFailed {
        /// Correlation ID for this scan.
        scan_id: Uuid,
        /// Path that was left behind.
        path: String,
        /// Rendered error.
        error: String,
    },

    /// A file was compressed and written to the quarantine zone.
    QuarantineWritten {
        /// Object name.
        name: String,
        /// Uncompressed size in bytes.
        size: u64,
        /// Stored (compressed) size in bytes.
        stored_size: u64,
    },

    /// A quarantine lookup failed for a reason other than "not found".
    LookupFailed {
        /// Object name.
        name: String,
        /// Rendered error.
        error: String,
    },
}

impl AuditEvent {
    /// Returns the event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ScanStarted { .. } => "scan_started",
            Self::FileStaged { .. } => "file_staged",
            Self::ScanCompleted { .. } => "scan_completed",
            Self::ScanFailed { .. } => "scan_failed",
            Self::CleanupFailed { .. } => "cleanup_failed",
            Self::QuarantineWritten { .. } => "quarantine_written",
            Self::LookupFailed { .. } => "lookup_failed",
        }
    }

    /// Returns the scan correlation ID, for scan events.
    pub fn scan_id(&self) -> Option<Uuid> {
        match self {
            Self::ScanStarted { scan_id, .. }
            | Self::FileStaged { scan_id, .. }
            | Self::ScanCompleted { scan_id, .. }
            | Self::ScanFailed { scan_id, .. }
            | Self::CleanupFailed { scan_id, .. } => Some(*scan_id),
            _ => None,
        }
    }
}

/// Receives audit events from pipeline components.
///
/// Components hold an `Arc<dyn AuditSink>` handed to them at
/// construction and never log through global state themselves.
pub trait AuditSink: Send + Sync + Debug {
    /// Records one event.
    fn record(&self, event: AuditEvent);
}

/// Forwards events to `tracing` on the `quarantine_scan::audit` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl TracingAuditSink {
    /// Creates a new tracing sink.
    pub fn new() -> Self {
        Self
    }
}

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) {
        let event_type = event.event_type();
        match event {
            AuditEvent::ScanStarted {
                scan_id,
                filename,
                timestamp,
            } => tracing::info!(
                target: "quarantine_scan::audit",
                event_type,
                scan_id = %scan_id,
                filename = %filename,
                timestamp = %timestamp.to_rfc3339(),
                "Scan started"
            ),
            AuditEvent::FileStaged {
                scan_id,
                path,
                size,
                blake3,
            } => tracing::debug!(
                target: "quarantine_scan::audit",
                event_type,
                scan_id = %scan_id,
                path = %path,
                size,
                file_hash_blake3 = %blake3,
                "File staged"
            ),
            AuditEvent::ScanCompleted {
                scan_id,
                filename,
                positives,
                threat,
                duration_ms,
            } => tracing::info!(
                target: "quarantine_scan::audit",
                event_type,
                scan_id = %scan_id,
                filename = %filename,
                positives,
                threat = ?threat,
                duration_ms,
                "Scan completed"
            ),
            AuditEvent::ScanFailed {
                scan_id,
                filename,
                error,
                duration_ms,
            } => tracing::warn!(
                target: "quarantine_scan::audit",
                event_type,
                scan_id = %scan_id,
                filename = %filename,
                error = %error,
                duration_ms,
                "Scan failed"
            ),
            AuditEvent::CleanupFailed {
                scan_id,
                path,
                error,
            } => tracing::error!(
                target: "quarantine_scan::audit",
                event_type,
                scan_id = %scan_id,
                path = %path,
                error = %error,
                "Staged file cleanup failed"
            ),
            AuditEvent::QuarantineWritten {
                name,
                size,
                stored_size,
            } => tracing::info!(
                target: "quarantine_scan::audit",
                event_type,
                name = %name,
                size,
                stored_size,
                "File quarantined"
            ),
            AuditEvent::LookupFailed { name, error } => tracing::warn!(
                target: "quarantine_scan::audit",
                event_type,
                name = %name,
                error = %error,
                "Quarantine lookup failed"
            ),
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded events, oldest first.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the recorded event type names, oldest first.
    pub fn event_types(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(AuditEvent::event_type)
            .collect()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: AuditEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
