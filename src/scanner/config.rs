//! External scan program configuration.

use crate::core::ScanError;
use crate::quarantine::is_remote_reference;

use serde::{Deserialize, Deserializer, Serialize};
use serde_with::serde_as;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How to run the scan program, and where to stage files for it.
///
/// Every field is required; the defaults are empty and fail
/// [`validate`](Self::validate).
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Executable name, e.g. `clamscan`.
    pub program_name: String,

    /// Directory containing the executable.
    pub program_path: PathBuf,

    /// Arguments placed before the staged file path.
    ///
    /// Accepts a list, or a single whitespace-separated string as set
    /// from the environment.
    #[serde(deserialize_with = "deserialize_args")]
    pub program_args: Vec<String>,

    /// Local directory where files are staged for scanning.
    pub local_quarantine_zone: String,

    /// How long the scan program may run.
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub scan_timeout: Duration,
}

fn deserialize_args<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Args {
        List(Vec<String>),
        Line(String),
    }

    Ok(match Args::deserialize(deserializer)? {
        Args::List(args) => args,
        Args::Line(line) => line.split_whitespace().map(str::to_string).collect(),
    })
}

impl ScannerConfig {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the executable name and directory.
    pub fn with_program(mut self, path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        self.program_path = path.into();
        self.program_name = name.into();
        self
    }

    /// Sets the arguments passed before the staged file path.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.program_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the local staging directory.
    pub fn with_local_quarantine_zone(mut self, zone: impl Into<String>) -> Self {
        self.local_quarantine_zone = zone.into();
        self
    }

    /// Sets the scan timeout.
    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }

    /// Returns the full path of the executable.
    pub fn executable(&self) -> PathBuf {
        self.program_path.join(&self.program_name)
    }

    /// Returns the staging directory.
    pub fn staging_dir(&self) -> &Path {
        Path::new(&self.local_quarantine_zone)
    }

    /// Checks every required field.
    ///
    /// Creates the staging directory when it is a plain path; a
    /// `remote:path` reference is left alone.
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.program_name.is_empty() {
            return Err(ScanError::configuration("program name is empty"));
        }
        if self.program_path.as_os_str().is_empty() {
            return Err(ScanError::configuration("program path is empty"));
        }
        if self.local_quarantine_zone.is_empty() {
            return Err(ScanError::configuration("local quarantine zone is empty"));
        }
        if self.scan_timeout.is_zero() {
            return Err(ScanError::configuration("scan timeout is 0"));
        }

        if !is_remote_reference(&self.local_quarantine_zone) {
            std::fs::create_dir_all(&self.local_quarantine_zone).map_err(|e| {
                ScanError::configuration(format!(
                    "failed to create local quarantine zone {}: {}",
                    self.local_quarantine_zone, e
                ))
            })?;
        }
        Ok(())
    }
}
