//! Common error types shared across Rowhouse crates.

use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, CommonError>;

/// Errors shared by every Rowhouse component
#[derive(Error, Debug)]
pub enum CommonError {
    /// File system operations failed
    #[error("File operation failed: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("Failed to process JSON data: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failed to parse input data
    #[error("Failed to parse {data_type}: {reason}")]
    Parse { data_type: String, reason: String },

    /// Configuration is missing or invalid
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CommonError {
    /// Create a parse error
    pub fn parse(data_type: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            data_type: data_type.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
