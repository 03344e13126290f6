//! Quarantine zone configuration.

use crate::core::ScanError;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Compression schemes understood by the quarantine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuarantineKind {
    /// A single gzip stream per object.
    ///
    /// Configured as `"zip"`; despite the name no archive is produced.
    Zip,
}

impl QuarantineKind {
    /// Returns the configuration identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Zip => "zip",
        }
    }
}

impl fmt::Display for QuarantineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuarantineKind {
    type Err = crate::core::QuarantineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "zip" => Ok(Self::Zip),
            other => Err(crate::core::QuarantineError::UnsupportedKind {
                kind: other.to_string(),
            }),
        }
    }
}

/// Where quarantined files live and how they are compressed.
///
/// Both fields are required and default to empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuarantineConfig {
    /// Storage location, a directory or a `remote:path` reference.
    pub path: String,

    /// Compression scheme identifier.
    #[serde(rename = "type")]
    pub kind: String,
}

impl QuarantineConfig {
    /// Creates a configuration from its parts.
    pub fn new(path: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: kind.into(),
        }
    }

    /// Sets the storage location.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Sets the compression scheme identifier.
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    /// Checks that every required field is set.
    ///
    /// An unrecognised scheme is reported when the quarantine is built.
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.path.is_empty() {
            return Err(ScanError::configuration("quarantine path not set"));
        }
        if self.kind.is_empty() {
            return Err(ScanError::configuration("quarantine type not set"));
        }
        Ok(())
    }
}
