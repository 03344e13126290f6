//! Scan result structures.
//!
//! `ScanResult` is the envelope shared by every scanner plugin. A failed
//! scan still carries one: `ScanFailure` pairs the error with whatever
//! the engine managed to report before things went wrong.

use crate::core::error::ScanError;
use crate::core::types::{ScanType, VirusScanOutcome};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The result of scanning one file.
///
/// Serializes as `{"time": .., "type": "VirusScan", "details": {..}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    /// When the scan began.
    #[serde(rename = "time")]
    pub timestamp: DateTime<Utc>,

    /// The family of scan performed.
    #[serde(rename = "type")]
    pub scan_type: ScanType,

    /// Type-specific scan details.
    pub details: VirusScanOutcome,
}

impl ScanResult {
    /// Creates a virus scan result stamped with the current time.
    pub fn new(details: VirusScanOutcome) -> Self {
        Self {
            timestamp: Utc::now(),
            scan_type: ScanType::VirusScan,
            details,
        }
    }

    /// Creates a zero-valued result, used when no engine output exists.
    pub fn empty() -> Self {
        Self::new(VirusScanOutcome::default())
    }

    /// Returns the number of infected findings.
    pub fn positives(&self) -> u32 {
        self.details.positives
    }

    /// Returns `true` if the engine reported at least one threat.
    pub fn is_infected(&self) -> bool {
        self.details.is_infected()
    }

    /// Looks up an engine-reported context value.
    pub fn context(&self, label: &str) -> Option<&str> {
        self.details.context.get(label).map(String::as_str)
    }

    /// Serializes the result to the JSON transport form.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// A failed scan together with its partial result.
///
/// The error decides control flow; `partial` is always populated and
/// safe to inspect. It holds the parsed engine output when the engine
/// ran, and a zero-valued result otherwise.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct ScanFailure {
    /// What went wrong.
    #[source]
    pub error: ScanError,

    /// Whatever could be parsed before the failure.
    pub partial: ScanResult,
}

impl ScanFailure {
    /// Pairs an error with a partial result.
    pub fn new(error: ScanError, partial: ScanResult) -> Self {
        Self { error, partial }
    }

    /// Splits the failure into its error and partial result.
    pub fn into_parts(self) -> (ScanError, ScanResult) {
        (self.error, self.partial)
    }
}

impl From<ScanError> for ScanFailure {
    fn from(error: ScanError) -> Self {
        Self::new(error, ScanResult::empty())
    }
}
