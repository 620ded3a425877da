//! Error types for tfacc

use crate::result::FailureKind;

/// Error type for tfacc operations
#[derive(Debug, thiserror::Error)]
pub enum TfaccError {
    #[error("Configuration fixture not found: {0}")]
    ConfigNotFound(String),

    #[error("Transport error during {operation}: {message}")]
    Transport { operation: String, message: String },

    #[error("{operation} of '{logical_name}' timed out after {timeout_ms}ms")]
    Timeout {
        operation: String,
        logical_name: String,
        timeout_ms: u64,
    },

    #[error("Pre-check failed: {0}")]
    PreCheckFailed(String),

    #[error("Invalid scenario: {0}")]
    InvalidScenario(String),

    #[error("Scenario already registered: {0}")]
    DuplicateScenario(String),

    #[error("Import failed: {0}")]
    ImportFailed(String),

    #[error("Scenario run cancelled")]
    Cancelled,

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("{0}")]
    Custom(String),
}

/// Result type alias for tfacc operations
pub type Result<T> = std::result::Result<T, TfaccError>;

impl TfaccError {
    pub fn transport(operation: impl Into<String>, message: impl Into<String>) -> Self {
        TfaccError::Transport {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Maps an error onto the failure kind reported for a scenario.
    pub fn kind(&self) -> FailureKind {
        match self {
            TfaccError::ConfigNotFound(_) => FailureKind::ConfigNotFound,
            TfaccError::PreCheckFailed(_) => FailureKind::PreCheckFailure,
            TfaccError::InvalidScenario(_) | TfaccError::DuplicateScenario(_) => {
                FailureKind::InvalidScenario
            }
            TfaccError::ImportFailed(_) => FailureKind::AssertionFailure,
            TfaccError::Cancelled => FailureKind::Cancelled,
            TfaccError::Transport { .. }
            | TfaccError::Timeout { .. }
            | TfaccError::EncodingError(_)
            | TfaccError::Custom(_) => FailureKind::TransportError,
        }
    }

    /// Re-labels collaborator errors as transport errors for `operation`.
    ///
    /// Errors that already carry a more specific kind pass through untouched.
    pub fn into_transport(self, operation: &str) -> Self {
        match self {
            TfaccError::Custom(message) | TfaccError::EncodingError(message) => {
                TfaccError::transport(operation, message)
            }
            other => other,
        }
    }
}

impl From<String> for TfaccError {
    fn from(s: String) -> Self {
        TfaccError::Custom(s)
    }
}

impl From<&str> for TfaccError {
    fn from(s: &str) -> Self {
        TfaccError::Custom(s.to_string())
    }
}

impl From<serde_json::Error> for TfaccError {
    fn from(e: serde_json::Error) -> Self {
        TfaccError::EncodingError(e.to_string())
    }
}
