//! # Quarantine Scan
//!
//! Scan files held in a quarantine zone with an external antivirus
//! engine, and report structured verdicts.
//!
//! ## Overview
//!
//! A scan takes the name of a quarantined file and:
//!
//! - reads it from the quarantine zone, decompressing on the fly
//! - stages a copy in a local directory
//! - runs the scan program on the copy under a deadline
//! - tells "threat found" exit codes apart from real failures
//! - parses the engine's text output into a [`ScanResult`]
//! - removes the staged copy, whatever happened
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use quarantine_scan::{PluginConfig, ScanPlugin, ScanRequest, Scanner};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PluginConfig::load(Some("scan.toml".as_ref()))?;
//!     let plugin = ScanPlugin::from_config(config)?;
//!
//!     plugin.quarantine().write("abc123", b"file content").await?;
//!
//!     match plugin.scanner().scan(&ScanRequest::new("abc123")).await {
//!         Ok(result) => println!("{}", result.to_json()?),
//!         Err(failure) => eprintln!("scan failed: {}", failure.error),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `default` - `clamav` and `cli`
//! - `clamav` - `clamscan` output parsing and exit codes, and [`ScanPlugin`]
//! - `cli` - the `quarantine-scan` binary
//!
//! ## Architecture
//!
//! - **Core**: Request and result types, traits, and error handling
//! - **Backends**: Engine-specific output parsers and exit verifiers
//! - **Scanner**: The fetch, stage, run, parse pipeline
//! - **Quarantine**: Compressed named storage for quarantined files
//! - **Audit**: Structured events for every scan and quarantine write
//! - **Config**: Layered loading from file and environment

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod audit;
pub mod backends;
pub mod config;
pub mod core;
#[cfg(feature = "clamav")]
pub mod plugin;
pub mod quarantine;
pub mod scanner;

// Re-export commonly used types at the crate root
pub use crate::config::PluginConfig;
pub use crate::core::{
    ExitVerifier, OutputParser, QuarantineError, ScanError, ScanFailure, ScanRequest, ScanResult,
    Scanner, VirusScanOutcome,
};
#[cfg(feature = "clamav")]
pub use crate::plugin::ScanPlugin;
pub use crate::quarantine::{Quarantine, QuarantineConfig};
pub use crate::scanner::{ExternalScanner, ScannerConfig};

/// Prelude module for convenient imports.
///
/// ```rust
/// use quarantine_scan::prelude::*;
/// ```
pub mod prelude {
    pub use crate::audit::{AuditEvent, AuditSink};
    pub use crate::config::PluginConfig;
    pub use crate::core::{
        ExitVerifier, OutputParser, ScanError, ScanFailure, ScanRequest, ScanResult, Scanner,
        VirusScanOutcome,
    };
    #[cfg(feature = "clamav")]
    pub use crate::plugin::ScanPlugin;
    pub use crate::quarantine::{Quarantine, QuarantineConfig, StorageBackend};
    pub use crate::scanner::{ExternalScanner, ScannerConfig};
}
