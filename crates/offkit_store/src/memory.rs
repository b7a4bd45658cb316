//! In-memory persistence store.

use crate::error::{StoreError, StoreResult};
use crate::manager::{StoreFactory, StoreOptions};
use crate::record::{FindExpression, StoredRecord};
use crate::store::PersistenceStore;
use async_trait::async_trait;
use offkit_selector::{assemble_object, sort_rows, Selector};
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// An in-memory persistence store.
///
/// Records are kept in insertion order; replacing a record keeps its
/// position. Queries run through the selector engine with a full scan.
///
/// This store is suitable for:
/// - Unit and integration tests
/// - Ephemeral caches that don't need persistence
///
/// # Example
///
/// ```rust
/// use offkit_store::{InMemoryStore, PersistenceStore};
/// use serde_json::json;
///
/// # async fn demo() -> offkit_store::StoreResult<()> {
/// let store = InMemoryStore::new("items");
/// store.upsert("a", json!({}), json!(1), None).await?;
/// assert_eq!(store.keys().await?, vec!["a".to_string()]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct InMemoryStore {
    name: String,
    version: Option<String>,
    records: RwLock<Vec<StoredRecord>>,
    next_tag: AtomicU64,
}

impl InMemoryStore {
    /// Creates a new empty store.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_version(name, None)
    }

    /// Creates a new empty store with a version.
    pub fn with_version(name: impl Into<String>, version: Option<String>) -> Self {
        Self {
            name: name.into(),
            version,
            records: RwLock::new(Vec::new()),
            next_tag: AtomicU64::new(1),
        }
    }

    /// Returns a copy of the full record under `key`, including its
    /// version tag.
    pub fn record(&self, key: &str) -> Option<StoredRecord> {
        self.records.read().iter().find(|r| r.key == key).cloned()
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn issue_tag(&self) -> String {
        self.next_tag.fetch_add(1, Ordering::SeqCst).to_string()
    }

    fn put(&self, records: &mut Vec<StoredRecord>, mut record: StoredRecord) -> Option<Value> {
        record.version_tag = Some(self.issue_tag());
        match records.iter_mut().find(|r| r.key == record.key) {
            Some(existing) => Some(std::mem::replace(existing, record).value),
            None => {
                records.push(record);
                None
            }
        }
    }
}

#[async_trait]
impl PersistenceStore for InMemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    async fn upsert(
        &self,
        key: &str,
        metadata: Value,
        value: Value,
        expected_version_tag: Option<&str>,
    ) -> StoreResult<Option<Value>> {
        let mut records = self.records.write();

        if let Some(expected) = expected_version_tag {
            let actual = records
                .iter()
                .find(|r| r.key == key)
                .and_then(|r| r.version_tag.clone());
            if actual.as_deref() != Some(expected) {
                return Err(StoreError::Conflict {
                    store: self.name.clone(),
                    key: key.to_string(),
                    expected: Some(expected.to_string()),
                    actual,
                });
            }
        }

        Ok(self.put(&mut records, StoredRecord::new(key, metadata, value)))
    }

    async fn upsert_all(&self, batch: Vec<StoredRecord>) -> StoreResult<()> {
        let mut records = self.records.write();
        for record in batch {
            self.put(&mut records, record);
        }
        Ok(())
    }

    async fn find(&self, expression: &FindExpression) -> StoreResult<Vec<Value>> {
        let selector = expression
            .selector
            .as_ref()
            .map(Selector::parse)
            .transpose()?;

        let mut documents: Vec<Value> = self
            .records
            .read()
            .iter()
            .map(StoredRecord::document)
            .filter(|doc| selector.as_ref().map_or(true, |s| s.matches(doc)))
            .collect();

        sort_rows(&mut documents, &expression.sort);

        Ok(documents
            .into_iter()
            .map(|doc| match (&expression.fields, doc) {
                (Some(fields), doc) => assemble_object(&doc, fields),
                (None, Value::Object(mut map)) => map.remove("value").unwrap_or(Value::Null),
                (None, other) => other,
            })
            .collect())
    }

    async fn find_by_key(&self, key: &str) -> StoreResult<Option<Value>> {
        Ok(self
            .records
            .read()
            .iter()
            .find(|r| r.key == key)
            .map(|r| r.value.clone()))
    }

    async fn remove_by_key(&self, key: &str) -> StoreResult<bool> {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|r| r.key != key);
        Ok(records.len() != before)
    }

    async fn delete(&self, selector: Option<&Value>) -> StoreResult<()> {
        match selector {
            None => self.records.write().clear(),
            Some(selector) => {
                let selector = Selector::parse(selector)?;
                self.records
                    .write()
                    .retain(|r| !selector.matches(&r.document()));
            }
        }
        Ok(())
    }

    async fn keys(&self) -> StoreResult<Vec<String>> {
        Ok(self.records.read().iter().map(|r| r.key.clone()).collect())
    }

    async fn update_key(&self, current_key: &str, new_key: &str) -> StoreResult<()> {
        let mut records = self.records.write();
        if current_key != new_key && records.iter().any(|r| r.key == new_key) {
            return Err(StoreError::Conflict {
                store: self.name.clone(),
                key: new_key.to_string(),
                expected: None,
                actual: records
                    .iter()
                    .find(|r| r.key == new_key)
                    .and_then(|r| r.version_tag.clone()),
            });
        }
        let record = records
            .iter_mut()
            .find(|r| r.key == current_key)
            .ok_or_else(|| StoreError::not_found(&self.name, current_key))?;
        record.key = new_key.to_string();
        Ok(())
    }
}

/// A [`StoreFactory`] producing [`InMemoryStore`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct InMemoryStoreFactory;

#[async_trait]
impl StoreFactory for InMemoryStoreFactory {
    async fn create_store(
        &self,
        name: &str,
        options: &StoreOptions,
    ) -> StoreResult<Arc<dyn PersistenceStore>> {
        Ok(Arc::new(InMemoryStore::with_version(
            name,
            options.version.clone(),
        )))
    }
}
