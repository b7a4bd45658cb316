//! Error types for cache and shredding operations.

use offkit_http::HttpError;
use offkit_store::StoreError;
use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Result type for shredding operations.
pub type ShredResult<T> = Result<T, ShredError>;

/// Errors raised while shredding or reassembling response bodies.
#[derive(Debug, Error)]
pub enum ShredError {
    /// A store operation failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A message could not be converted.
    #[error("http model error: {0}")]
    Http(#[from] HttpError),

    /// JSON encoding or decoding failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A shredder or unshredder rejected its input.
    #[error("json processor error: {0}")]
    Processor(String),
}

impl ShredError {
    /// Creates a processor error.
    pub fn processor(message: impl Into<String>) -> Self {
        Self::Processor(message.into())
    }
}

/// Errors that can occur in cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// A store operation failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A message could not be converted.
    #[error("http model error: {0}")]
    Http(#[from] HttpError),

    /// Shredding or reassembly failed.
    #[error("shredding error: {0}")]
    Shred(#[from] ShredError),

    /// JSON encoding or decoding failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A stored cache entry does not have the expected layout.
    #[error("corrupt cache entry {key:?}: {message}")]
    CorruptEntry {
        /// Entry key.
        key: String,
        /// What was wrong.
        message: String,
    },
}

impl CacheError {
    /// Creates a corrupt entry error.
    pub fn corrupt_entry(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CorruptEntry {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Returns true if the error originated in the store.
    pub fn is_store_error(&self) -> bool {
        matches!(self, CacheError::Store(_) | CacheError::Shred(ShredError::Store(_)))
    }

    /// Returns true for corrupt entries.
    pub fn is_corrupt_entry(&self) -> bool {
        matches!(self, CacheError::CorruptEntry { .. })
    }
}
