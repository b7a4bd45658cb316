//! Error types for the HTTP model.

use thiserror::Error;

/// Result type for HTTP model operations.
pub type HttpResult<T> = Result<T, HttpError>;

/// Errors that can occur while converting HTTP messages.
#[derive(Debug, Error)]
pub enum HttpError {
    /// JSON encoding or decoding failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The body cannot be interpreted as requested.
    #[error("invalid body: {0}")]
    InvalidBody(String),
}

impl HttpError {
    /// Creates an invalid body error.
    pub fn invalid_body(message: impl Into<String>) -> Self {
        Self::InvalidBody(message.into())
    }
}
