//! Error types for the quarantine scan pipeline.
//!
//! This module provides structured, typed errors for all failure scenarios.
//! The library never panics or exits the process; all errors are returned
//! as `Result` values and the caller decides what is fatal.

use crate::core::types::ExitError;

use std::time::Duration;
use thiserror::Error;

/// The main error type for scan operations.
#[derive(Debug, Error)]
pub enum ScanError {
    /// A required configuration value is missing or invalid.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// The requested file is not present in the quarantine zone.
    #[error("file not found in quarantine: {name}")]
    FileNotFound {
        /// Name that was looked up.
        name: String,
    },

    /// The quarantine backend or codec failed.
    #[error(transparent)]
    Quarantine(QuarantineError),

    /// A local I/O error occurred while staging the file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The scan program could not be started.
    #[error("engine '{engine}' is unavailable: {reason}")]
    EngineUnavailable {
        /// Name of the engine.
        engine: String,
        /// Human-readable reason for unavailability.
        reason: String,
    },

    /// The scan program ran but exited with a real failure.
    #[error("engine '{engine}' failed: {exit}")]
    ProcessFailure {
        /// Name of the engine.
        engine: String,
        /// How the process ended.
        exit: ExitError,
    },

    /// The scan program did not finish before the deadline.
    #[error("scan timed out after {elapsed:?} on engine '{engine}'")]
    Timeout {
        /// Name of the engine that timed out.
        engine: String,
        /// How long the process ran before it was terminated.
        elapsed: Duration,
    },

    /// The scan was cancelled by the caller.
    #[error("scan was cancelled")]
    Cancelled,
}

impl ScanError {
    /// Returns `true` if the error happened before the scan program ran.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            Self::FileNotFound { .. } | Self::Quarantine(_) | Self::Io(_)
        )
    }

    /// Returns the engine name if this error is associated with one.
    pub fn engine(&self) -> Option<&str> {
        match self {
            Self::EngineUnavailable { engine, .. }
            | Self::ProcessFailure { engine, .. }
            | Self::Timeout { engine, .. } => Some(engine),
            _ => None,
        }
    }

    /// Creates a `Configuration` error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates an `EngineUnavailable` error.
    pub fn engine_unavailable(engine: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EngineUnavailable {
            engine: engine.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `Timeout` error.
    pub fn timeout(engine: impl Into<String>, elapsed: Duration) -> Self {
        Self::Timeout {
            engine: engine.into(),
            elapsed,
        }
    }
}

impl From<QuarantineError> for ScanError {
    fn from(err: QuarantineError) -> Self {
        match err {
            QuarantineError::NotFound { name } => Self::FileNotFound { name },
            QuarantineError::UnsupportedKind { kind } => Self::Configuration {
                message: format!("unsupported quarantine type '{kind}'"),
            },
            other => Self::Quarantine(other),
        }
    }
}

/// Error type for quarantine operations.
#[derive(Debug, Error)]
pub enum QuarantineError {
    /// No object with this name exists in the backing store.
    #[error("quarantine object not found: {name}")]
    NotFound {
        /// The name that was looked up.
        name: String,
    },

    /// The object name cannot be used with this backend.
    #[error("invalid quarantine object name '{name}': {reason}")]
    InvalidName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The configured compression scheme is not recognised.
    #[error("unsupported quarantine type '{kind}'")]
    UnsupportedKind {
        /// The configured scheme identifier.
        kind: String,
    },

    /// Failed to store an object.
    #[error("failed to store file in quarantine: {reason}")]
    StoreFailed {
        /// Reason for the failure.
        reason: String,
    },

    /// Failed to retrieve an object.
    #[error("failed to retrieve file from quarantine: {reason}")]
    RetrieveFailed {
        /// Reason for the failure.
        reason: String,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl QuarantineError {
    /// Returns `true` if this is a `NotFound` error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// A specialized `Result` type for quarantine operations.
pub type QuarantineResult<T> = Result<T, QuarantineError>;
