//! Error types for Mesosphere operations.

use thiserror::Error;

/// Result type alias using Mesosphere's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during Mesosphere operations.
///
/// Every variant is returned to the immediate caller as-is. Nothing in the
/// library retries, logs, or substitutes a default value on error.
#[derive(Debug, Error)]
pub enum Error {
    /// Caller misuse detected before any network call: a missing argument,
    /// mismatched column lengths, or conflicting query inputs.
    #[error("contract violation: {0}")]
    ContractViolation(String),

    /// The embedding provider failed to turn text into vectors.
    #[error("embedding provider error: {0}")]
    Provider(String),

    /// Network failure or a non-success status from the remote engine.
    ///
    /// `status` is `0` when no HTTP response was received and `408` on timeout.
    #[error("transport error (status {status}): {message}")]
    Transport { status: u16, message: String },

    /// The API key was missing or rejected.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The referenced collection does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A collection or item with the same identity already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// A filter expression could not be parsed.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// The remote engine answered with a body that breaks the protocol.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Vector dimension differs from the collection's dimension.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

impl Error {
    /// Shorthand for [`Error::ContractViolation`].
    pub fn contract<S: Into<String>>(message: S) -> Self {
        Error::ContractViolation(message.into())
    }

    /// Shorthand for [`Error::Provider`].
    pub fn provider<S: Into<String>>(message: S) -> Self {
        Error::Provider(message.into())
    }

    /// Shorthand for [`Error::Transport`].
    pub fn transport<S: Into<String>>(status: u16, message: S) -> Self {
        Error::Transport {
            status,
            message: message.into(),
        }
    }

    /// Returns true for [`Error::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Returns true for [`Error::ContractViolation`].
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Error::ContractViolation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::DimensionMismatch {
            expected: 384,
            got: 512,
        };
        assert_eq!(err.to_string(), "dimension mismatch: expected 384, got 512");

        let err = Error::transport(503, "service unavailable");
        assert_eq!(
            err.to_string(),
            "transport error (status 503): service unavailable"
        );
    }

    #[test]
    fn test_error_predicates() {
        assert!(Error::NotFound("docs".into()).is_not_found());
        assert!(!Error::transport(404, "gone").is_not_found());
        assert!(Error::contract("ids must not be empty").is_contract_violation());
    }
}
