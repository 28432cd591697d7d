//! Error types for OpenRelay

use thiserror::Error;

/// Result type alias using OpenRelay's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for OpenRelay
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Referenced skill is not registered
    #[error("Skill not found: {0}")]
    SkillNotFound(String),

    /// Referenced task does not exist
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    /// Caller-supplied task ID collides with an existing task
    #[error("Task already exists: {0}")]
    TaskExists(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Remote agent returned a JSON-RPC error
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Timeout error
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Http(_) | Error::Timeout(_))
    }

    /// Check if error is a client error (caller's fault)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidInput(_)
                | Error::SkillNotFound(_)
                | Error::TaskNotFound(_)
                | Error::TaskExists(_)
        )
    }
}
