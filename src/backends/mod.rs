//! Engine-specific output parsers and exit verifiers.
//!
//! The scan pipeline in [`crate::scanner`] is engine-agnostic; a backend
//! supplies the two pieces that differ between engines:
//!
//! - an [`OutputParser`](crate::core::OutputParser) for its text output
//! - an [`ExitVerifier`](crate::core::ExitVerifier) for its exit codes
//!
//! ## Available Backends
//!
//! - [`clamav`] - `clamscan` (requires the `clamav` feature)
//!
//! ## Adding an Engine
//!
//! ```rust,ignore
//! use quarantine_scan::core::{OutputParser, ScanResult, VirusScanOutcome};
//!
//! #[derive(Debug)]
//! pub struct MyParser;
//!
//! impl OutputParser for MyParser {
//!     fn parse(&self, output: &[u8]) -> ScanResult {
//!         // Read the engine's report
//!         todo!()
//!     }
//! }
//! ```
//!
//! Engines without a special "found" exit code can use
//! [`NoOpVerifier`](crate::scanner::NoOpVerifier).

#[cfg(feature = "clamav")]
pub mod clamav;

#[cfg(feature = "clamav")]
pub use clamav::ClamScanParser;
