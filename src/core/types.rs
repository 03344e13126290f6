//! Core types used throughout the pipeline.
//!
//! This module defines the scan request, the scan type tag shared with
//! other scanner families, the virus scan outcome carried in a result
//! envelope, and how a scan program exited.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::process::ExitStatus;

/// Context label under which a detected threat is recorded.
pub const FOUND_KEY: &str = "FOUND";

/// Identifies a file in the quarantine zone to be scanned.
///
/// The filename is the object's key in the quarantine store. A request
/// is immutable once issued.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanRequest {
    filename: String,
}

impl ScanRequest {
    /// Creates a request for the named quarantine object.
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
        }
    }

    /// Returns the quarantine object name.
    pub fn filename(&self) -> &str {
        &self.filename
    }
}

impl fmt::Display for ScanRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.filename)
    }
}

/// The family of scan that produced a result.
///
/// Scanner plugins share one result envelope; this tag tells consumers
/// how to read the `details` payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScanType {
    /// An antivirus engine scan.
    #[default]
    VirusScan,
}

impl ScanType {
    /// Returns the wire name of the tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VirusScan => "VirusScan",
        }
    }
}

impl fmt::Display for ScanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Details of a virus scan.
///
/// `context` holds whatever label/value pairs the engine reported, plus a
/// `FOUND` entry naming the detected threat. No fixed schema is enforced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirusScanOutcome {
    /// Number of infected findings.
    pub positives: u32,

    /// Number of scans attempted.
    pub total_scans: u32,

    /// Engine-specific diagnostic context.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl VirusScanOutcome {
    /// Returns `true` if the engine reported at least one threat.
    pub fn is_infected(&self) -> bool {
        self.positives > 0
    }

    /// Returns the name of the reported threat, if any.
    pub fn threat(&self) -> Option<&str> {
        self.context.get(FOUND_KEY).map(String::as_str)
    }
}

/// How a scan program ended unsuccessfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitError {
    /// The program exited with a non-zero status code.
    Code(i32),
    /// The program was terminated by a signal.
    Signal(i32),
    /// The program ended without a status code or signal.
    Unknown,
}

impl ExitError {
    /// Classifies an exit status. Returns `None` for a successful exit.
    pub fn from_status(status: ExitStatus) -> Option<Self> {
        if status.success() {
            return None;
        }
        if let Some(code) = status.code() {
            return Some(Self::Code(code));
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return Some(Self::Signal(signal));
            }
        }
        Some(Self::Unknown)
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(code) => write!(f, "exit status {code}"),
            Self::Signal(signal) => write!(f, "terminated by signal {signal}"),
            Self::Unknown => f.write_str("exited unsuccessfully"),
        }
    }
}

impl std::error::Error for ExitError {}
