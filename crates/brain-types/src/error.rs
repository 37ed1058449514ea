//! Error types for the Second Brain system.

use thiserror::Error;

/// Unified error type for configuration and record handling.
#[derive(Debug, Error)]
pub enum BrainError {
    /// Configuration error (fatal at startup)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid input error
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<config::ConfigError> for BrainError {
    fn from(err: config::ConfigError) -> Self {
        BrainError::Config(err.to_string())
    }
}
