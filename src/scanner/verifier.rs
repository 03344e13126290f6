//! Exit status interpretation.

use crate::core::traits::ExitVerifier;

pub use crate::core::types::ExitError;

/// Accepts one designated exit code as "scan completed, threats found".
///
/// Every other unsuccessful exit is passed through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusVerifier {
    found_code: i32,
}

impl StatusVerifier {
    /// Creates a verifier treating `found_code` as a positive scan.
    pub fn new(found_code: i32) -> Self {
        Self { found_code }
    }
}

impl ExitVerifier for StatusVerifier {
    fn verify(&self, exit: Option<ExitError>) -> Option<ExitError> {
        match exit {
            Some(ExitError::Code(code)) if code == self.found_code => None,
            other => other,
        }
    }
}

/// Passes every exit error through unchanged.
///
/// For engines whose exit codes carry no "found" meaning.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpVerifier;

impl NoOpVerifier {
    /// Creates a new no-op verifier.
    pub fn new() -> Self {
        Self
    }
}

impl ExitVerifier for NoOpVerifier {
    fn verify(&self, exit: Option<ExitError>) -> Option<ExitError> {
        exit
    }
}
