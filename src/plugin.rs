//! Wiring the pipeline from configuration.

use crate::audit::{AuditSink, TracingAuditSink};
use crate::config::PluginConfig;
use crate::core::ScanError;
use crate::quarantine::{open_backend, Quarantine};
use crate::scanner::ExternalScanner;

use std::sync::Arc;

/// A ready-to-use ClamAV scanner and the quarantine it reads from.
///
/// # Example
///
/// ```rust,ignore
/// use quarantine_scan::{PluginConfig, ScanPlugin, ScanRequest, Scanner};
///
/// let plugin = ScanPlugin::from_config(PluginConfig::load(None)?)?;
/// let result = plugin.scanner().scan(&ScanRequest::new("abc123")).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ScanPlugin {
    config: PluginConfig,
    quarantine: Arc<Quarantine>,
    scanner: ExternalScanner,
}

impl ScanPlugin {
    /// Validates `config` and builds the pipeline, auditing through
    /// `tracing`.
    pub fn from_config(config: PluginConfig) -> Result<Self, ScanError> {
        Self::with_audit_sink(config, Arc::new(TracingAuditSink::new()))
    }

    /// Validates `config` and builds the pipeline around `audit`.
    ///
    /// # Errors
    ///
    /// `Configuration` if a field is missing, the quarantine type is not
    /// recognised, or the quarantine path is a remote reference.
    pub fn with_audit_sink(
        config: PluginConfig,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self, ScanError> {
        config.validate()?;

        let backend = open_backend(&config.quarantine.path)?;
        let quarantine = Arc::new(
            Quarantine::new(config.quarantine.clone(), backend)?.with_audit_sink(Arc::clone(&audit)),
        );
        let scanner = ExternalScanner::clamav(config.avscan.clone(), Arc::clone(&quarantine))
            .with_audit_sink(audit);

        tracing::debug!(
            program = %config.avscan.executable().display(),
            quarantine = %config.quarantine.path,
            "scan plugin configured"
        );

        Ok(Self {
            config,
            quarantine,
            scanner,
        })
    }

    /// Returns the configuration the plugin was built from.
    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    /// Returns the quarantine zone.
    pub fn quarantine(&self) -> &Quarantine {
        &self.quarantine
    }

    /// Returns the scanner.
    pub fn scanner(&self) -> &ExternalScanner {
        &self.scanner
    }
}
