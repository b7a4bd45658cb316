//! Named store management.

use crate::error::StoreResult;
use crate::feed::{StoreEvent, StoreFeed};
use crate::memory::InMemoryStoreFactory;
use crate::store::PersistenceStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use tracing::{debug, info};

/// Options used when opening a store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreOptions {
    /// Store version; stores with different versions are distinct.
    pub version: Option<String>,
    /// Fields the backend should index, as dotted record paths.
    pub index: Vec<String>,
}

impl StoreOptions {
    /// Creates default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Adds an indexed field.
    pub fn with_index(mut self, field: impl Into<String>) -> Self {
        self.index.push(field.into());
        self
    }
}

/// Creates stores for a specific backend.
///
/// Implement this trait to plug a production storage engine into OffKit.
#[async_trait]
pub trait StoreFactory: Send + Sync {
    /// Creates (or attaches to) the store named `name`.
    async fn create_store(
        &self,
        name: &str,
        options: &StoreOptions,
    ) -> StoreResult<Arc<dyn PersistenceStore>>;
}

/// Opens, caches and deletes named stores.
///
/// The manager is an explicit context object owned by the host application
/// and shared by the cache and sync components. Opening the same name twice
/// returns the same store instance.
pub struct StoreManager {
    factory: Arc<dyn StoreFactory>,
    stores: RwLock<HashMap<String, Arc<dyn PersistenceStore>>>,
    feed: StoreFeed,
}

impl StoreManager {
    /// Creates a manager backed by `factory`.
    pub fn new(factory: Arc<dyn StoreFactory>) -> Self {
        Self {
            factory,
            stores: RwLock::new(HashMap::new()),
            feed: StoreFeed::new(),
        }
    }

    /// Creates a manager backed by in-memory stores.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStoreFactory))
    }

    /// Opens the store named `name` with default options.
    pub async fn open_store(&self, name: &str) -> StoreResult<Arc<dyn PersistenceStore>> {
        self.open_store_with(name, &StoreOptions::default()).await
    }

    /// Opens the store named `name`.
    pub async fn open_store_with(
        &self,
        name: &str,
        options: &StoreOptions,
    ) -> StoreResult<Arc<dyn PersistenceStore>> {
        let slot = Self::slot(name, options.version.as_deref());
        let existing = self.stores.read().get(&slot).cloned();
        if let Some(store) = existing {
            return Ok(store);
        }

        let created = self.factory.create_store(name, options).await?;

        let (store, fresh) = {
            let mut stores = self.stores.write();
            match stores.get(&slot) {
                // Another caller opened it while we were creating.
                Some(existing) => (Arc::clone(existing), false),
                None => {
                    stores.insert(slot, Arc::clone(&created));
                    (created, true)
                }
            }
        };

        if fresh {
            debug!(store = name, "opened store");
            self.feed.emit(StoreEvent::Opened(name.to_string()));
        }
        Ok(store)
    }

    /// Returns true if a store named `name` (any version) is open.
    pub fn has_store(&self, name: &str) -> bool {
        self.stores
            .read()
            .keys()
            .any(|slot| Self::slot_name(slot) == name)
    }

    /// Deletes every record of the store named `name` (all open versions)
    /// and forgets it.
    ///
    /// Stores that are not open are opened first so that persisted data is
    /// removed as well.
    pub async fn delete_store(&self, name: &str) -> StoreResult<()> {
        let mut targets: Vec<Arc<dyn PersistenceStore>> = {
            let mut stores = self.stores.write();
            let slots: Vec<String> = stores
                .keys()
                .filter(|slot| Self::slot_name(slot) == name)
                .cloned()
                .collect();
            slots.iter().filter_map(|slot| stores.remove(slot)).collect()
        };

        if targets.is_empty() {
            targets.push(
                self.factory
                    .create_store(name, &StoreOptions::default())
                    .await?,
            );
        }

        for store in targets {
            store.delete(None).await?;
        }

        info!(store = name, "deleted store");
        self.feed.emit(StoreEvent::Destroyed(name.to_string()));
        Ok(())
    }

    /// Subscribes to store lifecycle events.
    pub fn subscribe(&self) -> Receiver<StoreEvent> {
        self.feed.subscribe()
    }

    fn slot(name: &str, version: Option<&str>) -> String {
        match version {
            Some(v) => format!("{name}\u{0}{v}"),
            None => name.to_string(),
        }
    }

    fn slot_name(slot: &str) -> &str {
        slot.split('\u{0}').next().unwrap_or(slot)
    }
}

impl std::fmt::Debug for StoreManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreManager")
            .field("stores", &self.stores.read().keys().collect::<Vec<_>>())
            .finish()
    }
}
