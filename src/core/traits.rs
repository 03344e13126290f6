//! Core traits for the pipeline.
//!
//! This module defines the `Scanner` trait shared by scanner plugins and
//! the two engine-specific seams of the external-program scanner: how
//! to read the engine's output and how to read its exit status.

use crate::core::error::ScanError;
use crate::core::result::{ScanFailure, ScanResult};
use crate::core::types::ScanRequest;
use crate::core::types::ExitError;

use async_trait::async_trait;
use std::fmt::Debug;

/// The contract every scanner plugin fulfils.
///
/// # Implementation Notes
///
/// - Implementations must be `Send + Sync`; the host runs each request on
///   its own task.
/// - A scan that fails still produces a result: see [`ScanFailure`].
/// - Implementations should never panic.
#[async_trait]
pub trait Scanner: Send + Sync + Debug {
    /// Returns the name of this scanner engine.
    fn name(&self) -> &str;

    /// Scans the quarantined file named by `request`.
    ///
    /// # Errors
    ///
    /// - `FileNotFound` - The file is not in the quarantine zone.
    /// - `Quarantine` / `Io` - Fetching or staging the file failed.
    /// - `EngineUnavailable` - The scan program could not be started.
    /// - `ProcessFailure` - The scan program failed.
    /// - `Timeout` - The scan program exceeded its deadline.
    async fn scan(&self, request: &ScanRequest) -> Result<ScanResult, ScanFailure>;

    /// Performs a lightweight check that the engine can be used.
    async fn health_check(&self) -> Result<(), ScanError>;
}

/// Turns raw engine output into a structured result.
///
/// Parsing is total: engines do not promise a stable text format, so
/// malformed input yields an empty result instead of an error.
pub trait OutputParser: Send + Sync + Debug {
    /// Parses combined stdout/stderr of one engine run.
    fn parse(&self, output: &[u8]) -> ScanResult;
}

/// Decides whether an unsuccessful process exit is a real failure.
///
/// Most engines signal "threat found" with a non-zero exit status, which
/// must not be confused with the engine failing to run.
pub trait ExitVerifier: Send + Sync + Debug {
    /// Returns `None` if the exit is acceptable, or the error to report.
    fn verify(&self, exit: Option<ExitError>) -> Option<ExitError>;
}
