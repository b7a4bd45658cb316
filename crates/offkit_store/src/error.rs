//! Error types for store operations.

use offkit_selector::SelectorError;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The expected version tag did not match the stored record.
    #[error("version conflict on key {key:?} in store {store}: expected {expected:?}, found {actual:?}")]
    Conflict {
        /// Store name.
        store: String,
        /// Record key.
        key: String,
        /// Version tag the caller expected.
        expected: Option<String>,
        /// Version tag actually stored.
        actual: Option<String>,
    },

    /// An explicit by-key operation addressed a missing key.
    #[error("key {key:?} not found in store {store}")]
    NotFound {
        /// Store name.
        store: String,
        /// Record key.
        key: String,
    },

    /// The find expression could not be compiled.
    #[error("invalid query: {0}")]
    Query(#[from] SelectorError),

    /// A record could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backend failed.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Creates a not-found error.
    pub fn not_found(store: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            store: store.into(),
            key: key.into(),
        }
    }

    /// Creates a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    /// Returns true for version conflicts.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }

    /// Returns true for missing keys.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifiers() {
        assert!(StoreError::not_found("items", "1").is_not_found());
        assert!(!StoreError::backend("disk full").is_conflict());

        let err = StoreError::Conflict {
            store: "items".into(),
            key: "1".into(),
            expected: Some("3".into()),
            actual: Some("4".into()),
        };
        assert!(err.is_conflict());
        assert!(err.to_string().contains("items"));
    }

    #[test]
    fn selector_errors_convert() {
        let err: StoreError = SelectorError::UnknownOperator("$near".into()).into();
        assert!(matches!(err, StoreError::Query(_)));
    }
}
