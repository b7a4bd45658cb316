//! Persistence store trait definition.

use crate::error::{StoreError, StoreResult};
use crate::record::{FindExpression, StoredRecord};
use async_trait::async_trait;
use serde_json::Value;

/// A named key-value store holding [`StoredRecord`]s.
///
/// The production implementation is external to OffKit (an embedded
/// document database with secondary indexes). OffKit only relies on the
/// operations below.
///
/// # Invariants
///
/// - Keys are unique per store
/// - `upsert` with an expected version tag fails with
///   [`StoreError::Conflict`] when the stored tag differs
/// - By-key lookups report absence as `None`/`false`, never as an error
/// - Implementations must be `Send + Sync`
#[async_trait]
pub trait PersistenceStore: Send + Sync {
    /// Returns the store name.
    fn name(&self) -> &str;

    /// Returns the store version, if versioned.
    fn version(&self) -> Option<&str> {
        None
    }

    /// Inserts or replaces the record under `key`.
    ///
    /// Returns the previous value, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if `expected_version_tag` is given
    /// and does not match the stored record's tag.
    async fn upsert(
        &self,
        key: &str,
        metadata: Value,
        value: Value,
        expected_version_tag: Option<&str>,
    ) -> StoreResult<Option<Value>>;

    /// Inserts or replaces many records in one batch.
    async fn upsert_all(&self, records: Vec<StoredRecord>) -> StoreResult<()>;

    /// Returns the records matching `expression`.
    async fn find(&self, expression: &FindExpression) -> StoreResult<Vec<Value>>;

    /// Returns the value stored under `key`.
    async fn find_by_key(&self, key: &str) -> StoreResult<Option<Value>>;

    /// Removes the record under `key`; returns whether it existed.
    async fn remove_by_key(&self, key: &str) -> StoreResult<bool>;

    /// Deletes the records matching `selector`, or every record when `None`.
    async fn delete(&self, selector: Option<&Value>) -> StoreResult<()>;

    /// Returns every key, in store order.
    async fn keys(&self) -> StoreResult<Vec<String>>;

    /// Moves the record under `current_key` to `new_key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if `current_key` is absent.
    async fn update_key(&self, current_key: &str, new_key: &str) -> StoreResult<()>;

    /// Returns the value stored under `key`, failing when it is absent.
    async fn require_by_key(&self, key: &str) -> StoreResult<Value> {
        self.find_by_key(key)
            .await?
            .ok_or_else(|| StoreError::not_found(self.name(), key))
    }
}
