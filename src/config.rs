//! Plugin configuration and layered loading.
//!
//! Values are merged from, lowest precedence first:
//!
//! 1. built-in defaults, all empty
//! 2. an optional TOML file
//! 3. `MAL_`-prefixed environment variables
//!
//! ```toml
//! [avscan]
//! program_name = "clamscan"
//! program_path = "/usr/bin"
//! program_args = ["--no-summary"]
//! local_quarantine_zone = "/var/lib/quarantine-scan/staging"
//! scan_timeout = 300
//!
//! [quarantine]
//! path = "/var/lib/quarantine-scan/zone"
//! type = "zip"
//! ```
//!
//! The first `_` after the prefix separates the section from the key, so
//! `MAL_AVSCAN_SCAN_TIMEOUT=60` sets `avscan.scan_timeout` and
//! `MAL_QUARANTINE_TYPE=zip` sets `quarantine.type`.

use crate::core::ScanError;
use crate::quarantine::QuarantineConfig;
use crate::scanner::ScannerConfig;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Prefix of every environment variable read by [`PluginConfig::load`].
pub const ENV_PREFIX: &str = "MAL_";

/// Everything needed to build the scan plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    /// The external scan program.
    pub avscan: ScannerConfig,

    /// The quarantine zone files are read from.
    pub quarantine: QuarantineConfig,
}

impl PluginConfig {
    /// Returns the provider stack used by [`PluginConfig::load`].
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(
            Env::prefixed(ENV_PREFIX).map(|key| key.as_str().replacen('_', ".", 1).into()),
        )
    }

    /// Loads the configuration from defaults, `path` and the environment.
    ///
    /// The result is not validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ScanError> {
        Self::figment(path)
            .extract()
            .map_err(|e| ScanError::configuration(e.to_string()))
    }

    /// Validates both sections.
    pub fn validate(&self) -> Result<(), ScanError> {
        self.avscan.validate()?;
        self.quarantine.validate()
    }
}
