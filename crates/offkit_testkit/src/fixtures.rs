//! Test fixtures and stack helpers.
//!
//! Provides an in-memory stack (stores, caches, replay engine) wired the way
//! an application would wire it, plus request/response builders.

use offkit_cache::{
    CacheContext, CacheManager, EndpointGuard, EndpointOptions, JsonProcessor, OfflineCache,
    ShreddingRegistry, SimpleJsonShredder, SimpleJsonUnshredder,
};
use offkit_http::{HttpRequest, HttpResponse};
use offkit_store::StoreManager;
use offkit_sync::{ManualClock, MockTransport, SyncConfig, SyncManager};
use serde_json::{json, Value};
use std::sync::Arc;

/// Clock reading every [`TestStack`] starts at.
pub const START_MILLIS: u64 = 1_000;

/// An in-memory stack sharing one [`StoreManager`].
pub struct TestStack {
    /// The store manager.
    pub stores: Arc<StoreManager>,
    /// The shredding registry.
    pub shredding: Arc<ShreddingRegistry>,
    /// The cache manager.
    pub caches: CacheManager,
    /// The transport the replay engine sends through.
    pub transport: Arc<MockTransport>,
    /// The clock request ids come from.
    pub clock: Arc<ManualClock>,
    /// The replay engine.
    pub sync: SyncManager,
}

impl TestStack {
    /// Creates a stack with the default sync configuration.
    pub fn new() -> Self {
        Self::with_sync_config(SyncConfig::default())
    }

    /// Creates a stack with a custom sync configuration.
    pub fn with_sync_config(config: SyncConfig) -> Self {
        let stores = Arc::new(StoreManager::in_memory());
        let shredding = Arc::new(ShreddingRegistry::new());
        let context = Arc::new(CacheContext::new(Arc::clone(&stores), Arc::clone(&shredding)));
        let transport = Arc::new(MockTransport::new());
        let clock = Arc::new(ManualClock::new(START_MILLIS));
        let sync = SyncManager::with_clock(
            config,
            Arc::clone(&stores),
            transport.clone(),
            clock.clone(),
        );
        Self {
            stores,
            shredding,
            caches: CacheManager::new(context),
            transport,
            clock,
            sync,
        }
    }

    /// Opens (or reuses) the cache `name`.
    pub async fn cache(&self, name: &str) -> Arc<OfflineCache> {
        self.caches.open(name).await.expect("Failed to open cache")
    }

    /// Registers a [`SimpleJsonShredder`] writing to `store` for `request`.
    ///
    /// The registration lasts as long as the returned guard.
    pub fn shred_into(&self, request: &mut HttpRequest, store: &str) -> EndpointGuard {
        let processor = JsonProcessor::new(
            Arc::new(SimpleJsonShredder::new(store)),
            Arc::new(SimpleJsonUnshredder),
        );
        self.shredding.register(
            request,
            EndpointOptions::new().with_json_processor(processor),
        )
    }

    /// Appends `request` to the sync log with the clock at `at`.
    pub async fn queue_at(&self, at: u64, request: &HttpRequest) -> String {
        self.clock.set(at);
        self.sync
            .log()
            .insert_request(request, None)
            .await
            .expect("Failed to queue request")
    }

    /// Returns the value stored under `key` in `store`.
    pub async fn row(&self, store: &str, key: &str) -> Option<Value> {
        self.stores
            .open_store(store)
            .await
            .expect("Failed to open store")
            .find_by_key(key)
            .await
            .expect("Failed to read row")
    }
}

impl Default for TestStack {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a `200 OK` response with a JSON body.
pub fn json_response(body: &Value) -> HttpResponse {
    HttpResponse::ok()
        .with_header("Content-Type", "application/json")
        .with_json(body)
}

/// Builds `count` item documents `{id, name, price}` with ids `1..=count`.
pub fn items_payload(count: usize) -> Value {
    Value::Array(
        (1..=count)
            .map(|id| json!({"id": id, "name": format!("item-{id}"), "price": id * 10}))
            .collect(),
    )
}
