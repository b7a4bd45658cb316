//! Error types for the sync engine.

use offkit_http::{HttpError, HttpRequest, HttpResponse};
use offkit_store::StoreError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// A replay pass is already running.
    #[error("a sync pass is already in progress")]
    AlreadySyncing,

    /// The transport reports no connectivity.
    #[error("network is offline")]
    Offline,

    /// The pass was cancelled.
    #[error("sync cancelled")]
    Cancelled,

    /// A replayed request failed in transport or with status >= 400.
    #[error("request {request_id} ({} {}) failed: {message}", .request.method, .request.url)]
    RequestFailed {
        /// Sync log id of the request.
        request_id: String,
        /// The request as dispatched.
        request: Box<HttpRequest>,
        /// The response, when one was received.
        response: Option<Box<HttpResponse>>,
        /// Failure description.
        message: String,
    },

    /// The reachability pre-check failed or timed out.
    #[error("pre-check for request {request_id} ({url}) failed: {message}")]
    PreflightFailed {
        /// Sync log id of the request.
        request_id: String,
        /// Probed URL.
        url: String,
        /// Failure description.
        message: String,
    },

    /// A listener failed or returned a decision invalid for the event.
    #[error("listener error: {0}")]
    Listener(String),

    /// A URL pattern did not compile.
    #[error("invalid pattern {pattern:?}: {message}")]
    InvalidPattern {
        /// The pattern.
        pattern: String,
        /// Compiler message.
        message: String,
    },

    /// A sync log entry does not have the expected layout.
    #[error("corrupt sync log entry {request_id}: {message}")]
    CorruptEntry {
        /// Entry key.
        request_id: String,
        /// What was wrong.
        message: String,
    },

    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// Store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Message conversion error.
    #[error("http model error: {0}")]
    Http(#[from] HttpError),

    /// JSON error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SyncError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Creates a listener error.
    pub fn listener(message: impl Into<String>) -> Self {
        Self::Listener(message.into())
    }

    /// Creates an invalid pattern error.
    pub fn invalid_pattern(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    /// Creates a corrupt entry error.
    pub fn corrupt_entry(request_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CorruptEntry {
            request_id: request_id.into(),
            message: message.into(),
        }
    }

    /// Returns true if this error can be retried by the caller.
    ///
    /// The engine itself never retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { retryable, .. } => *retryable,
            SyncError::Offline | SyncError::PreflightFailed { .. } => true,
            SyncError::RequestFailed { response, .. } => {
                response.as_ref().map_or(true, |r| r.status >= 500)
            }
            _ => false,
        }
    }

    /// Returns true for cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SyncError::Cancelled)
    }

    /// Returns the sync log id of the request the error concerns, if any.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            SyncError::RequestFailed { request_id, .. }
            | SyncError::PreflightFailed { request_id, .. }
            | SyncError::CorruptEntry { request_id, .. } => Some(request_id),
            _ => None,
        }
    }
}
