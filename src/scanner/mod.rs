//! Running an external scan program against quarantined files.
//!
//! - [`ExternalScanner`] - the scan pipeline
//! - [`ScannerConfig`] - which program to run, and where to stage files
//! - [`StatusVerifier`] / [`NoOpVerifier`] - exit status interpretation

mod config;
mod orchestrator;
mod process;
mod staging;
pub mod verifier;

pub use config::ScannerConfig;
pub use orchestrator::ExternalScanner;
pub use verifier::{ExitError, NoOpVerifier, StatusVerifier};
