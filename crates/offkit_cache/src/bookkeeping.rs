//! Persisted list of the auxiliary stores a cache has shredded into.

use crate::error::CacheResult;
use offkit_store::PersistenceStore;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::Arc;

/// The set of shredded store names recorded for one cache.
///
/// Stored as a JSON array under `shreddedStores:<cache name>` in the
/// bookkeeping store. A missing document reads as empty.
pub struct ShreddedStoreBook {
    store: Arc<dyn PersistenceStore>,
    key: String,
}

impl ShreddedStoreBook {
    /// Creates the book for `cache_name` inside `store`.
    pub fn new(store: Arc<dyn PersistenceStore>, cache_name: &str) -> Self {
        Self {
            store,
            key: format!("shreddedStores:{cache_name}"),
        }
    }

    /// Returns the recorded store names, sorted.
    pub async fn load(&self) -> CacheResult<BTreeSet<String>> {
        let names = match self.store.find_by_key(&self.key).await? {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => BTreeSet::new(),
        };
        Ok(names)
    }

    /// Adds `names` to the set; writes only when something is new.
    pub async fn record<'a, I>(&self, names: I) -> CacheResult<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut current = self.load().await?;
        let before = current.len();
        current.extend(names.into_iter().map(str::to_string));
        if current.len() != before {
            self.store
                .upsert(&self.key, json!({}), json!(current), None)
                .await?;
        }
        Ok(())
    }

    /// Forgets every recorded name.
    pub async fn clear(&self) -> CacheResult<()> {
        self.store.remove_by_key(&self.key).await?;
        Ok(())
    }
}

impl std::fmt::Debug for ShreddedStoreBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShreddedStoreBook")
            .field("store", &self.store.name())
            .field("key", &self.key)
            .finish()
    }
}
