//! Core types and traits for the pipeline.
//!
//! - [`types`] - Scan request, scan type tag, virus scan outcome, exit errors
//! - [`result`] - The result envelope and `ScanFailure`
//! - [`traits`] - The `Scanner`, `OutputParser` and `ExitVerifier` seams
//! - [`error`] - Structured error types

pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{QuarantineError, QuarantineResult, ScanError};
pub use result::{ScanFailure, ScanResult};
pub use traits::{ExitVerifier, OutputParser, Scanner};
pub use types::{ExitError, ScanRequest, ScanType, VirusScanOutcome, FOUND_KEY};
