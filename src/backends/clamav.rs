//! ClamAV engine support.
//!
//! This module knows how to read the output of `clamscan`, and which of
//! its exit codes means "threat found". Wire it into an
//! [`ExternalScanner`](crate::scanner::ExternalScanner) with
//! [`ExternalScanner::clamav`](crate::scanner::ExternalScanner::clamav).
//!
//! # Output format
//!
//! ```text
//! /quarantine_zone/f91fd05: Eicar-Test-Signature FOUND
//!
//! ----------- SCAN SUMMARY -----------
//! Known viruses: 8698302
//! Engine version: 0.103.8
//! Scanned files: 1
//! Infected files: 1
//! Time: 15.779 sec (0 m 15 s)
//! ```
//!
//! Per-file lines end in `FOUND` or `OK`; the summary is a list of
//! `label: value` lines.

use crate::core::{OutputParser, ScanResult, VirusScanOutcome, FOUND_KEY};
use crate::scanner::verifier::StatusVerifier;

/// Exit code `clamscan` uses for "scan completed, virus found".
pub const FOUND_EXIT_CODE: i32 = 1;

/// Marker on a per-file line reporting a detection.
const FOUND_MARKER: &str = "FOUND";

/// Marker on a per-file line reporting a clean file.
const CLEAN_MARKER: &str = "OK";

/// Separates a label from its value.
///
/// Requiring the trailing space keeps timestamps (`14:31:32`) and ratios
/// (`0.00:1`) from being read as separators.
const LABEL_DELIMITER: &str = ": ";

/// Parser for `clamscan` output.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClamScanParser;

impl ClamScanParser {
    /// Creates a new parser.
    pub fn new() -> Self {
        Self
    }
}

impl OutputParser for ClamScanParser {
    fn parse(&self, output: &[u8]) -> ScanResult {
        let mut outcome = VirusScanOutcome {
            positives: 0,
            total_scans: 1,
            ..Default::default()
        };

        let text = String::from_utf8_lossy(output);
        for line in text.split('\n') {
            let Some((label, value)) = split_pair(line) else {
                continue;
            };

            if value.contains(FOUND_MARKER) {
                outcome.positives += 1;
                outcome
                    .context
                    .insert(FOUND_KEY.to_string(), strip_marker(value).trim().to_string());
                continue;
            }

            if value.contains(CLEAN_MARKER) {
                continue;
            }

            outcome
                .context
                .insert(label.trim().to_string(), value.trim().to_string());
        }

        ScanResult::new(outcome)
    }
}

/// Splits a line into exactly one `(label, value)` pair.
fn split_pair(line: &str) -> Option<(&str, &str)> {
    let mut parts = line.split(LABEL_DELIMITER);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(label), Some(value), None) => Some((label, value)),
        _ => None,
    }
}

/// Removes the last `FOUND` marker from a value.
fn strip_marker(value: &str) -> String {
    match value.rfind(FOUND_MARKER) {
        Some(at) => format!("{}{}", &value[..at], &value[at + FOUND_MARKER.len()..]),
        None => value.to_string(),
    }
}

/// Returns the exit verifier for `clamscan`.
pub fn verifier() -> StatusVerifier {
    StatusVerifier::new(FOUND_EXIT_CODE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ExitVerifier, ScanType};
    use crate::core::ExitError;

    const INFECTED_OUTPUT: &str = "\
LibClamAV Warning: Cannot dlopen libclamunrar_iface: file not found - unrar support unavailable
/quarantine_zone/f91fd0505c91af2156892429a0746b93dd3e9322784cc6c947a99ba4629662573: Eicar-Test-Signature FOUND
clamav_1            | 2018/09/27 14:31:32 [INFO]
----------- SCAN SUMMARY -----------
Known viruses: 6661373
Engine version: 0.100.1
Scanned directories: 0
Scanned files: 1
Infected files: 1
Data scanned: 0.00 MB
Data read: 0.00 MB (ratio 0.00:1)
Time: 15.779 sec (0 m 15 s)";

    const CLEAN_OUTPUT: &str = "\
/quarantine_zone/2c0ca0f9922e478ba853d93b5826529bd05af33a062037702: OK
 ----------- SCAN SUMMARY -----------
 Known viruses: 6661373
 Engine version: 0.100.1
 Scanned directories: 0
 Scanned files: 1
 Infected files: 0
 Data scanned: 0.00 MB
 Data read: 100.00 MB (ratio 0.00:1)
 Time: 15.756 sec (0 m 15 s)";

    fn parse(output: &str) -> ScanResult {
        ClamScanParser::new().parse(output.as_bytes())
    }

    #[test]
    fn test_parse_infected_summary() {
        let result = parse(INFECTED_OUTPUT);

        assert_eq!(result.scan_type, ScanType::VirusScan);
        assert_eq!(result.details.positives, 1);
        assert_eq!(result.details.total_scans, 1);

        let expected = [
            ("FOUND", "Eicar-Test-Signature"),
            ("Known viruses", "6661373"),
            ("Engine version", "0.100.1"),
            ("Scanned directories", "0"),
            ("Scanned files", "1"),
            ("Infected files", "1"),
            ("Data scanned", "0.00 MB"),
            ("Data read", "0.00 MB (ratio 0.00:1)"),
            ("Time", "15.779 sec (0 m 15 s)"),
        ];
        assert_eq!(result.details.context.len(), expected.len());
        for (label, value) in expected {
            assert_eq!(result.context(label), Some(value), "label {label}");
        }
    }

    #[test]
    fn test_parse_clean_summary() {
        let result = parse(CLEAN_OUTPUT);

        assert_eq!(result.details.positives, 0);
        assert_eq!(result.details.total_scans, 1);
        assert_eq!(result.context("FOUND"), None);
        assert_eq!(result.context("Infected files"), Some("0"));
        assert_eq!(result.context("Data read"), Some("100.00 MB (ratio 0.00:1)"));
        assert_eq!(result.details.context.len(), 8);
    }

    #[test]
    fn test_single_found_line() {
        let result = parse("/path/file: Eicar-Test-Signature FOUND");
        assert_eq!(result.details.positives, 1);
        assert_eq!(result.context("FOUND"), Some("Eicar-Test-Signature"));
        assert_eq!(result.details.context.len(), 1);
    }

    #[test]
    fn test_single_ok_line() {
        let result = parse("/path/file: OK");
        assert_eq!(result.details.positives, 0);
        assert!(result.details.context.is_empty());
    }

    #[test]
    fn test_multiple_found_lines_count_all_keep_last() {
        let result = parse("/a: Win.Test.One FOUND\n/b: Win.Test.Two FOUND\n/c: OK\n");
        assert_eq!(result.details.positives, 2);
        assert_eq!(result.context("FOUND"), Some("Win.Test.Two"));
        assert_eq!(result.details.context.len(), 1);
    }

    #[test]
    fn test_last_label_wins() {
        let result = parse("Time: 1 sec\nTime: 2 sec");
        assert_eq!(result.context("Time"), Some("2 sec"));
    }

    #[test]
    fn test_crlf_line_endings() {
        let result = parse("/path/file: Eicar-Test-Signature FOUND\r\nKnown viruses: 42\r\n");
        assert_eq!(result.context("FOUND"), Some("Eicar-Test-Signature"));
        assert_eq!(result.context("Known viruses"), Some("42"));
    }

    #[test]
    fn test_empty_output() {
        let result = parse("");
        assert_eq!(result.details.positives, 0);
        assert_eq!(result.details.total_scans, 1);
        assert!(result.details.context.is_empty());
    }

    #[test]
    fn test_binary_output_never_fails() {
        let garbage: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        let result = ClamScanParser::new().parse(&garbage);
        assert_eq!(result.details.positives, 0);
        assert_eq!(result.details.total_scans, 1);

        let result = ClamScanParser::new().parse(&[0xff, 0xfe, b':', b' ', 0x80]);
        assert_eq!(result.details.total_scans, 1);
    }

    #[test]
    fn test_verifier_uses_clamscan_exit_code() {
        let verifier = verifier();
        assert_eq!(verifier.verify(Some(ExitError::Code(1))), None);
        assert_eq!(
            verifier.verify(Some(ExitError::Code(2))),
            Some(ExitError::Code(2))
        );
    }
}
