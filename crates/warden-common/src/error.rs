//! Error types for Warden.

use thiserror::Error;

/// Top-level error type for Warden operations.
#[derive(Debug, Error)]
pub enum WardenError {
    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A configuration value failed validation
    #[error("Invalid configuration for {field}: {reason}")]
    InvalidConfig {
        /// Offending field
        field: String,
        /// Why the value was rejected
        reason: String,
    },
}

impl WardenError {
    /// Shorthand for an [`WardenError::InvalidConfig`] error.
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for Warden operations.
pub type WardenResult<T> = Result<T, WardenError>;
