//! Custom error types for envelope-kyc
//!
//! Errors surface from the storage backends, configuration loading and the
//! verification submission. The progress store and the field codec swallow
//! them at their boundary, so most of these never reach the wizard screens.

use thiserror::Error;

/// The main error type for envelope-kyc operations
#[derive(Error, Debug)]
pub enum KycError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Key-value backend errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// The backend refused a write because it is full
    #[error("Storage quota exceeded: need {needed} bytes, {available} available")]
    Quota { needed: usize, available: usize },

    /// Encryption errors
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Field validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// The external verification service rejected or failed the submission
    #[error("Submission error: {0}")]
    Submission(String),
}

impl KycError {
    /// Check if this is a quota error
    pub fn is_quota(&self) -> bool {
        matches!(self, Self::Quota { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<std::io::Error> for KycError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for KycError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for envelope-kyc operations
pub type KycResult<T> = Result<T, KycError>;
