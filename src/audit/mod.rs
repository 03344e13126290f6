//! Structured audit trail.
//!
//! Pipeline components report what they do as [`AuditEvent`]s to an
//! injected [`AuditSink`]. The default [`TracingAuditSink`] emits them
//! through `tracing`, so any subscriber (JSON, syslog bridge,
//! OpenTelemetry) can capture them; [`MemoryAuditSink`] keeps them for
//! inspection in tests.

mod events;

pub use events::{AuditEvent, AuditSink, MemoryAuditSink, TracingAuditSink};
