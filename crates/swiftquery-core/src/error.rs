//! Error types for SwiftQuery backends

use thiserror::Error;

/// Core error type reported by query backends
#[derive(Error, Debug)]
pub enum SwiftQueryError {
    #[error("Query error: {0}")]
    Query(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl SwiftQueryError {
    /// Message suitable for showing to the user as-is.
    ///
    /// Query errors carry the backend's own text, which is surfaced verbatim
    /// rather than wrapped in the variant prefix.
    pub fn user_message(&self) -> String {
        match self {
            Self::Query(message) | Self::Backend(message) | Self::Other(message) => {
                message.clone()
            }
            other => other.to_string(),
        }
    }

    /// Check if this error represents a cooperative cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Result type alias for backend operations
pub type Result<T> = std::result::Result<T, SwiftQueryError>;
