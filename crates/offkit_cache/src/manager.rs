//! Named cache management.

use crate::cache::{CacheContext, OfflineCache};
use crate::error::CacheResult;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Opens, enumerates and deletes named caches.
///
/// Opening the same name twice returns the same [`OfflineCache`].
#[derive(Debug)]
pub struct CacheManager {
    context: Arc<CacheContext>,
    caches: RwLock<HashMap<String, Arc<OfflineCache>>>,
}

impl CacheManager {
    /// Creates a manager over `context`.
    pub fn new(context: Arc<CacheContext>) -> Self {
        Self {
            context,
            caches: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the shared cache context.
    pub fn context(&self) -> &Arc<CacheContext> {
        &self.context
    }

    /// Opens the cache named `name`.
    pub async fn open(&self, name: &str) -> CacheResult<Arc<OfflineCache>> {
        let existing = self.caches.read().get(name).cloned();
        if let Some(cache) = existing {
            return Ok(cache);
        }
        let opened = Arc::new(OfflineCache::open(Arc::clone(&self.context), name).await?);
        // Another caller may have opened it while we were awaiting.
        let cache = Arc::clone(
            self.caches
                .write()
                .entry(name.to_string())
                .or_insert(opened),
        );
        Ok(cache)
    }

    /// Returns true if a cache named `name` is open.
    pub fn has(&self, name: &str) -> bool {
        self.caches.read().contains_key(name)
    }

    /// Clears the cache named `name`, deletes its store and forgets it.
    ///
    /// Returns false if no such cache is open and no store of that name
    /// exists.
    pub async fn delete(&self, name: &str) -> CacheResult<bool> {
        let removed = self.caches.write().remove(name);
        let cache = match removed {
            Some(cache) => cache,
            None if self.context.stores().has_store(name) => {
                Arc::new(OfflineCache::open(Arc::clone(&self.context), name).await?)
            }
            None => return Ok(false),
        };
        cache.clear().await?;
        self.context.stores().delete_store(name).await?;
        info!(cache = name, "deleted cache");
        Ok(true)
    }

    /// Returns the names of the open caches, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut names: Vec<String> = self.caches.read().keys().cloned().collect();
        names.sort();
        names
    }
}
