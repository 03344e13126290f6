//! The scan pipeline: fetch, stage, run, interpret, clean up.

use crate::audit::{AuditEvent, AuditSink, TracingAuditSink};
use crate::core::{
    ExitVerifier, OutputParser, ScanError, ScanFailure, ScanRequest, ScanResult, Scanner,
};
use crate::quarantine::Quarantine;
use crate::scanner::config::ScannerConfig;
use crate::scanner::process::{self, Termination};
use crate::scanner::staging::{self, StagedFile};
use crate::core::ExitError;

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Scans quarantined files by running an external program on a local
/// copy.
///
/// Each scan:
///
/// 1. opens the file from the quarantine (decompressed)
/// 2. copies it to a uniquely named file in the staging directory
/// 3. runs `<program_path>/<program_name> <program_args...> <staged file>`
///    under the configured timeout
/// 4. asks the [`ExitVerifier`] whether a non-zero exit is a real failure
/// 5. hands the combined output to the [`OutputParser`]
/// 6. removes the staged copy
///
/// The staged copy is removed on every path, including failures and
/// cancellation.
///
/// # Example
///
/// ```rust,ignore
/// use quarantine_scan::{ExternalScanner, ScanRequest, Scanner};
///
/// let scanner = ExternalScanner::clamav(config, quarantine);
/// match scanner.scan(&ScanRequest::new("abc123")).await {
///     Ok(result) => println!("{} positives", result.positives()),
///     Err(failure) => eprintln!("{} (partial: {:?})", failure.error, failure.partial),
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ExternalScanner {
    config: ScannerConfig,
    quarantine: Arc<Quarantine>,
    parser: Arc<dyn OutputParser>,
    verifier: Arc<dyn ExitVerifier>,
    audit: Arc<dyn AuditSink>,
}

impl ExternalScanner {
    /// Creates a scanner from its parts.
    ///
    /// The configuration is expected to be validated already.
    pub fn new(
        config: ScannerConfig,
        quarantine: Arc<Quarantine>,
        parser: Arc<dyn OutputParser>,
        verifier: Arc<dyn ExitVerifier>,
    ) -> Self {
        Self {
            config,
            quarantine,
            parser,
            verifier,
            audit: Arc::new(TracingAuditSink::new()),
        }
    }

    /// Creates a scanner that reads `clamscan` output and exit codes.
    #[cfg(feature = "clamav")]
    pub fn clamav(config: ScannerConfig, quarantine: Arc<Quarantine>) -> Self {
        use crate::backends::clamav;

        Self::new(
            config,
            quarantine,
            Arc::new(clamav::ClamScanParser::new()),
            Arc::new(clamav::verifier()),
        )
    }

    /// Sets the audit sink.
    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Returns the scanner configuration.
    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Returns the quarantine this scanner reads from.
    pub fn quarantine(&self) -> &Arc<Quarantine> {
        &self.quarantine
    }

    /// Scans `request`, giving up as soon as `cancel` fires.
    ///
    /// A cancelled scan kills the program if it is running, removes the
    /// staged copy and fails with [`ScanError::Cancelled`].
    pub async fn scan_with_cancellation(
        &self,
        request: &ScanRequest,
        cancel: &CancellationToken,
    ) -> Result<ScanResult, ScanFailure> {
        let scan_id = Uuid::new_v4();
        let started = Instant::now();
        self.audit.record(AuditEvent::ScanStarted {
            scan_id,
            filename: request.filename().to_string(),
            timestamp: Utc::now(),
        });

        let outcome = match self.fetch(scan_id, request, cancel).await {
            Ok(staged) => {
                let outcome = self.execute(&staged, cancel).await;
                self.cleanup(scan_id, staged);
                outcome
            }
            Err(e) => Err(e.into()),
        };

        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let event = match &outcome {
            Ok(result) => AuditEvent::ScanCompleted {
                scan_id,
                filename: request.filename().to_string(),
                positives: result.positives(),
                threat: result.details.threat().map(str::to_string),
                duration_ms,
            },
            Err(failure) => AuditEvent::ScanFailed {
                scan_id,
                filename: request.filename().to_string(),
                error: failure.error.to_string(),
                duration_ms,
            },
        };
        self.audit.record(event);

        outcome
    }

    /// Copies the quarantined file to the staging directory.
    async fn fetch(
        &self,
        scan_id: Uuid,
        request: &ScanRequest,
        cancel: &CancellationToken,
    ) -> Result<StagedFile, ScanError> {
        let name = request.filename();
        let copy = async {
            let mut source = self.quarantine.open_file(name).await?;
            let staged = staging::stage(self.config.staging_dir(), name, &mut source).await?;
            Ok::<_, ScanError>(staged)
        };

        let staged = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ScanError::Cancelled),
            staged = copy => staged?,
        };

        self.audit.record(AuditEvent::FileStaged {
            scan_id,
            path: staged.path().display().to_string(),
            size: staged.size(),
            blake3: staged.digest().to_hex().to_string(),
        });
        Ok(staged)
    }

    /// Runs the program against the staged copy and interprets the run.
    async fn execute(
        &self,
        staged: &StagedFile,
        cancel: &CancellationToken,
    ) -> Result<ScanResult, ScanFailure> {
        if cancel.is_cancelled() {
            return Err(ScanError::Cancelled.into());
        }

        let engine = self.name();
        let running = process::spawn(
            &self.config.executable(),
            &self.config.program_args,
            staged.path(),
        )
        .map_err(|e| ScanError::engine_unavailable(engine, e.to_string()))?;

        let finished = running
            .wait(self.config.scan_timeout, cancel)
            .await
            .map_err(ScanError::from)?;
        let parsed = self.parser.parse(&finished.output);

        let error = match finished.termination {
            Termination::TimedOut => Some(ScanError::timeout(engine, finished.elapsed)),
            Termination::Cancelled => Some(ScanError::Cancelled),
            Termination::Exited(status) => self
                .verifier
                .verify(ExitError::from_status(status))
                .map(|exit| ScanError::ProcessFailure {
                    engine: engine.to_string(),
                    exit,
                }),
        };
        match error {
            Some(error) => Err(ScanFailure::new(error, parsed)),
            None => Ok(parsed),
        }
    }

    fn cleanup(&self, scan_id: Uuid, staged: StagedFile) {
        let path = staged.path().display().to_string();
        if let Err(e) = staged.remove() {
            self.audit.record(AuditEvent::CleanupFailed {
                scan_id,
                path,
                error: e.to_string(),
            });
        }
    }
}

#[async_trait]
impl Scanner for ExternalScanner {
    fn name(&self) -> &str {
        &self.config.program_name
    }

    async fn scan(&self, request: &ScanRequest) -> Result<ScanResult, ScanFailure> {
        self.scan_with_cancellation(request, &CancellationToken::new())
            .await
    }

    async fn health_check(&self) -> Result<(), ScanError> {
        let executable = self.config.executable();
        let metadata = tokio::fs::metadata(&executable).await.map_err(|e| {
            ScanError::engine_unavailable(self.name(), format!("{}: {}", executable.display(), e))
        })?;
        if !metadata.is_file() {
            return Err(ScanError::engine_unavailable(
                self.name(),
                format!("{} is not a file", executable.display()),
            ));
        }

        let staging = self.config.staging_dir();
        if !tokio::fs::metadata(staging)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            return Err(ScanError::configuration(format!(
                "local quarantine zone {} is not a directory",
                staging.display()
            )));
        }
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditSink;
    use crate::core::VirusScanOutcome;
    use crate::quarantine::{MemoryBackend, QuarantineConfig};
    use crate::scanner::verifier::{NoOpVerifier, StatusVerifier};
    use std::collections::HashMap;
    use std::path::Path;
    use std::time::Duration;

    /// Records the raw output it was given.
    #[derive(Debug)]
    struct EchoParser;

    impl OutputParser for EchoParser {
        fn parse(&self, output: &[u8]) -> ScanResult {
            let mut context = HashMap::new();
            context.insert(
                "output".to_string(),
                String::from_utf8_lossy(output).into_owned(),
            );
            ScanResult::new(VirusScanOutcome {
                positives: 0,
                total_scans: 1,
                context,
            })
        }
    }

    struct Fixture {
        scanner: ExternalScanner,
        audit: Arc<MemoryAuditSink>,
        staging: tempfile::TempDir,
    }

    async fn fixture(script: &str, verifier: Arc<dyn ExitVerifier>) -> Fixture {
        let staging = tempfile::tempdir().unwrap();
        let quarantine = Quarantine::new(
            QuarantineConfig::new("memory", "zip"),
            Arc::new(MemoryBackend::new()),
        )
        .unwrap();
        quarantine.write("sample", b"sample bytes").await.unwrap();

        let config = ScannerConfig::new()
            .with_program("/bin", "sh")
            .with_args(["-c", script, "sh"])
            .with_local_quarantine_zone(staging.path().to_str().unwrap())
            .with_scan_timeout(Duration::from_secs(10));
        let audit = Arc::new(MemoryAuditSink::new());
        let scanner = ExternalScanner::new(config, Arc::new(quarantine), Arc::new(EchoParser), verifier)
            .with_audit_sink(audit.clone());

        Fixture {
            scanner,
            audit,
            staging,
        }
    }

    fn staged_files(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn test_program_sees_staged_copy() {
        let f = fixture("cat \"$1\"", Arc::new(NoOpVerifier)).await;

        let result = f.scanner.scan(&ScanRequest::new("sample")).await.unwrap();
        assert_eq!(result.context("output"), Some("sample bytes"));
        assert_eq!(staged_files(f.staging.path()), 0);
        assert_eq!(
            f.audit.event_types(),
            vec!["scan_started", "file_staged", "scan_completed"]
        );
    }

    #[tokio::test]
    async fn test_staged_digest_is_audited() {
        let f = fixture("true", Arc::new(NoOpVerifier)).await;
        f.scanner.scan(&ScanRequest::new("sample")).await.unwrap();

        let staged = f
            .audit
            .events()
            .into_iter()
            .find_map(|e| match e {
                AuditEvent::FileStaged { size, blake3, .. } => Some((size, blake3)),
                _ => None,
            })
            .unwrap();
        assert_eq!(staged.0, 12);
        assert_eq!(staged.1, blake3::hash(b"sample bytes").to_hex().to_string());
    }

    #[tokio::test]
    async fn test_verifier_decides_exit_codes() {
        let f = fixture("echo hit; exit 1", Arc::new(StatusVerifier::new(1))).await;
        let result = f.scanner.scan(&ScanRequest::new("sample")).await.unwrap();
        assert_eq!(result.context("output"), Some("hit\n"));

        let f = fixture("echo broken; exit 1", Arc::new(NoOpVerifier)).await;
        let failure = f.scanner.scan(&ScanRequest::new("sample")).await.unwrap_err();
        assert!(matches!(
            failure.error,
            ScanError::ProcessFailure { exit: ExitError::Code(1), .. }
        ));
        assert_eq!(failure.partial.context("output"), Some("broken\n"));
    }

    #[tokio::test]
    async fn test_missing_file_creates_nothing() {
        let f = fixture("true", Arc::new(NoOpVerifier)).await;

        let failure = f.scanner.scan(&ScanRequest::new("absent")).await.unwrap_err();
        assert!(matches!(failure.error, ScanError::FileNotFound { ref name } if name == "absent"));
        assert_eq!(failure.partial.details, VirusScanOutcome::default());
        assert_eq!(staged_files(f.staging.path()), 0);
        assert_eq!(f.audit.event_types(), vec!["scan_started", "scan_failed"]);
    }

    #[tokio::test]
    async fn test_unstartable_program_is_unavailable() {
        let mut f = fixture("true", Arc::new(NoOpVerifier)).await;
        f.scanner.config = f
            .scanner
            .config
            .clone()
            .with_program("/nonexistent", "clamscan");

        let failure = f.scanner.scan(&ScanRequest::new("sample")).await.unwrap_err();
        assert!(matches!(failure.error, ScanError::EngineUnavailable { .. }));
        assert_eq!(failure.partial.details, VirusScanOutcome::default());
        assert_eq!(staged_files(f.staging.path()), 0);
        assert!(f.scanner.health_check().await.is_err());
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let f = fixture("true", Arc::new(NoOpVerifier)).await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let failure = f
            .scanner
            .scan_with_cancellation(&ScanRequest::new("sample"), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(failure.error, ScanError::Cancelled));
        assert_eq!(staged_files(f.staging.path()), 0);
    }

    #[tokio::test]
    async fn test_health_check() {
        let f = fixture("true", Arc::new(NoOpVerifier)).await;
        f.scanner.health_check().await.unwrap();
        assert_eq!(f.scanner.name(), "sh");
    }
}
