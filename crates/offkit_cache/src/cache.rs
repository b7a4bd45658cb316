//! The offline request/response cache.

use crate::bookkeeping::ShreddedStoreBook;
use crate::config::CacheConfig;
use crate::error::{CacheError, CacheResult};
use crate::key::{cache_key, matched_cache_keys};
use crate::shredding::{
    attach_body_abstract, body_abstract_of, construct_request_response_cache_data,
    delete_shredded_data, fill_response_body_with_shredded_data, now_millis, shred_response,
    BodyAbstractEntry, ShreddingRegistry, SimpleJsonUnshredder,
};
use crate::vary::vary_matches;
use offkit_http::{HttpRequest, HttpResponse};
use offkit_store::{FindExpression, PersistenceStore, StoreManager, UndoRedoData};
use parking_lot::RwLock;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// Options for matching requests against cached entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchOptions {
    /// Compare URLs without their query string.
    pub ignore_search: bool,
    /// Match regardless of request method.
    pub ignore_method: bool,
    /// Skip the `Vary` header check.
    pub ignore_vary: bool,
}

impl MatchOptions {
    /// Creates options with every flag off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `ignore_search`.
    pub fn ignore_search(mut self, value: bool) -> Self {
        self.ignore_search = value;
        self
    }

    /// Sets `ignore_method`.
    pub fn ignore_method(mut self, value: bool) -> Self {
        self.ignore_method = value;
        self
    }

    /// Sets `ignore_vary`.
    pub fn ignore_vary(mut self, value: bool) -> Self {
        self.ignore_vary = value;
        self
    }
}

/// Result of [`OfflineCache::put`].
#[derive(Debug, Clone, PartialEq)]
pub struct CachePutResult {
    /// Key the entry was stored under.
    pub key: String,
    /// Undo/redo data for rows written by shredding; empty when the
    /// response was stored whole.
    pub undo_redo_data: Vec<UndoRedoData>,
}

/// Shared collaborators of every cache: the store manager, the endpoint
/// options registry and the cache configuration.
#[derive(Debug)]
pub struct CacheContext {
    stores: Arc<StoreManager>,
    shredding: Arc<ShreddingRegistry>,
    config: CacheConfig,
}

impl CacheContext {
    /// Creates a context with the default configuration.
    pub fn new(stores: Arc<StoreManager>, shredding: Arc<ShreddingRegistry>) -> Self {
        Self {
            stores,
            shredding,
            config: CacheConfig::default(),
        }
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the store manager.
    pub fn stores(&self) -> &Arc<StoreManager> {
        &self.stores
    }

    /// Returns the endpoint options registry.
    pub fn shredding(&self) -> &Arc<ShreddingRegistry> {
        &self.shredding
    }

    /// Returns the configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}

struct CachedEntry {
    key: String,
    request: HttpRequest,
    response: HttpResponse,
    body_abstract: Option<Vec<BodyAbstractEntry>>,
}

impl CachedEntry {
    fn decode(key: String, value: &Value) -> CacheResult<Self> {
        let request_data = value
            .get("requestData")
            .ok_or_else(|| CacheError::corrupt_entry(&key, "missing requestData"))?;
        let response_data = value
            .get("responseData")
            .ok_or_else(|| CacheError::corrupt_entry(&key, "missing responseData"))?;
        Ok(Self {
            request: HttpRequest::from_json(request_data)?,
            response: HttpResponse::from_json(response_data)?,
            body_abstract: body_abstract_of(response_data)?,
            key,
        })
    }
}

/// A named request/response cache over a persistence store.
///
/// Entries are keyed `url$METHOD$vary` (see [`cache_key`]). Lookups first
/// resolve candidates from an in-memory index of keys, loaded from the
/// store on first use, and fall back to a metadata query when no key
/// matches. Candidates then pass a `Vary` check against their stored
/// request.
pub struct OfflineCache {
    name: String,
    context: Arc<CacheContext>,
    store: Arc<dyn PersistenceStore>,
    book: ShreddedStoreBook,
    key_index: RwLock<Option<Vec<String>>>,
}

impl OfflineCache {
    /// Opens the cache named `name`, backed by the store of the same name.
    pub async fn open(context: Arc<CacheContext>, name: &str) -> CacheResult<Self> {
        let store = context.stores().open_store(name).await?;
        let bookkeeping = context
            .stores()
            .open_store(&context.config().bookkeeping_store)
            .await?;
        Ok(Self {
            name: name.to_string(),
            book: ShreddedStoreBook::new(bookkeeping, name),
            context,
            store,
            key_index: RwLock::new(None),
        })
    }

    /// Returns the cache name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stores `response` for `request`.
    ///
    /// If endpoint options with a JSON processor are registered for the
    /// request, the body is shredded into auxiliary stores and the entry
    /// keeps a body abstract instead.
    pub async fn put(
        &self,
        request: &HttpRequest,
        response: &HttpResponse,
    ) -> CacheResult<CachePutResult> {
        let key = cache_key(request, response);
        let processor = self
            .context
            .shredding()
            .options_for(request)
            .and_then(|options| options.json_processor.clone());

        let mut value = construct_request_response_cache_data(request, response, processor.as_ref())?;
        let mut undo_redo_data = Vec::new();
        if let Some(processor) = &processor {
            let outcome =
                shred_response(self.context.stores(), processor.shredder.as_ref(), response).await?;
            attach_body_abstract(&mut value, &outcome.body_abstract)?;
            self.book
                .record(outcome.body_abstract.iter().map(|entry| entry.name.as_str()))
                .await?;
            undo_redo_data = outcome.undo_redo_data;
        }

        let now = now_millis();
        let metadata = json!({
            "url": request.url,
            "method": request.method,
            "baseUrl": request.base_url(),
            "created": now,
            "lastupdated": now,
        });
        self.store.upsert(&key, metadata, value, None).await?;
        self.remember_key(&key);
        debug!(cache = %self.name, key = %key, shredded = processor.is_some(), "cached response");

        Ok(CachePutResult {
            key,
            undo_redo_data,
        })
    }

    /// Returns the first cached response matching `request`.
    pub async fn match_request(
        &self,
        request: &HttpRequest,
        options: MatchOptions,
    ) -> CacheResult<Option<HttpResponse>> {
        let entry = self.candidates(Some(request), options).await?.into_iter().next();
        match entry {
            Some(entry) => Ok(Some(self.materialize(entry, Some(request)).await?)),
            None => Ok(None),
        }
    }

    /// Returns every cached response matching `request`, or every cached
    /// response when `request` is `None`.
    pub async fn match_all(
        &self,
        request: Option<&HttpRequest>,
        options: MatchOptions,
    ) -> CacheResult<Vec<HttpResponse>> {
        let entries = self.candidates(request, options).await?;
        let mut responses = Vec::with_capacity(entries.len());
        for entry in entries {
            responses.push(self.materialize(entry, request).await?);
        }
        Ok(responses)
    }

    /// Returns true if some cached response matches `request`.
    pub async fn has_match(&self, request: &HttpRequest, options: MatchOptions) -> CacheResult<bool> {
        Ok(!self.candidates(Some(request), options).await?.is_empty())
    }

    /// Deletes every entry matching `request`, including its shredded rows.
    ///
    /// Returns whether anything was deleted.
    pub async fn delete(&self, request: &HttpRequest, options: MatchOptions) -> CacheResult<bool> {
        let mut deleted = false;
        for entry in self.candidates(Some(request), options).await? {
            if let Some(body_abstract) = &entry.body_abstract {
                delete_shredded_data(self.context.stores(), body_abstract).await?;
            }
            if self.store.remove_by_key(&entry.key).await? {
                deleted = true;
            }
            self.forget_key(&entry.key);
            debug!(cache = %self.name, key = %entry.key, "deleted cache entry");
        }
        Ok(deleted)
    }

    /// Returns the requests of matching entries, or of every entry when
    /// `request` is `None`.
    pub async fn keys(
        &self,
        request: Option<&HttpRequest>,
        options: MatchOptions,
    ) -> CacheResult<Vec<HttpRequest>> {
        Ok(self
            .candidates(request, options)
            .await?
            .into_iter()
            .map(|entry| entry.request)
            .collect())
    }

    /// Deletes every entry and every auxiliary store this cache shredded
    /// into.
    pub async fn clear(&self) -> CacheResult<()> {
        let shredded_stores = self.book.load().await?;
        self.store.delete(None).await?;
        for name in &shredded_stores {
            self.context.stores().delete_store(name).await?;
        }
        self.book.clear().await?;
        *self.key_index.write() = Some(Vec::new());
        info!(cache = %self.name, shredded_stores = shredded_stores.len(), "cleared cache");
        Ok(())
    }

    async fn index_keys(&self) -> CacheResult<Vec<String>> {
        let cached = self.key_index.read().clone();
        if let Some(keys) = cached {
            return Ok(keys);
        }
        let keys = self.store.keys().await?;
        *self.key_index.write() = Some(keys.clone());
        Ok(keys)
    }

    fn remember_key(&self, key: &str) {
        if let Some(keys) = self.key_index.write().as_mut() {
            if !keys.iter().any(|k| k == key) {
                keys.push(key.to_string());
            }
        }
    }

    fn forget_key(&self, key: &str) {
        if let Some(keys) = self.key_index.write().as_mut() {
            keys.retain(|k| k != key);
        }
    }

    async fn load_entries(&self, keys: &[&str]) -> CacheResult<Vec<CachedEntry>> {
        let mut entries = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(value) = self.store.find_by_key(key).await? {
                entries.push(CachedEntry::decode(key.to_string(), &value)?);
            }
        }
        Ok(entries)
    }

    async fn query_entries(
        &self,
        request: &HttpRequest,
        options: MatchOptions,
    ) -> CacheResult<Vec<CachedEntry>> {
        let mut selector = Map::new();
        if options.ignore_search {
            selector.insert("metadata.baseUrl".into(), json!(request.base_url()));
        } else {
            selector.insert("metadata.url".into(), json!(request.url));
        }
        if !options.ignore_method {
            selector.insert("metadata.method".into(), json!(request.method));
        }
        let rows = self
            .store
            .find(
                &FindExpression::new()
                    .with_selector(Value::Object(selector))
                    .with_fields(["key", "value"]),
            )
            .await?;
        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            if let (Some(key), Some(value)) = (row.get("key").and_then(Value::as_str), row.get("value")) {
                entries.push(CachedEntry::decode(key.to_string(), value)?);
            }
        }
        Ok(entries)
    }

    async fn candidates(
        &self,
        request: Option<&HttpRequest>,
        options: MatchOptions,
    ) -> CacheResult<Vec<CachedEntry>> {
        let keys = self.index_keys().await?;
        let Some(request) = request else {
            let all: Vec<&str> = keys.iter().map(String::as_str).collect();
            return self.load_entries(&all).await;
        };

        let matched = matched_cache_keys(&keys, request, &options);
        let entries = if matched.is_empty() {
            self.query_entries(request, options).await?
        } else {
            self.load_entries(&matched).await?
        };
        Ok(entries
            .into_iter()
            .filter(|entry| {
                vary_matches(&entry.request, &entry.response, request, options.ignore_vary)
            })
            .collect())
    }

    async fn materialize(
        &self,
        entry: CachedEntry,
        request: Option<&HttpRequest>,
    ) -> CacheResult<HttpResponse> {
        let mut response = entry.response;
        if let Some(body_abstract) = &entry.body_abstract {
            let processor = request
                .and_then(|r| self.context.shredding().options_for(r))
                .and_then(|options| options.json_processor.clone());
            let stores = self.context.stores();
            match processor {
                Some(processor) => {
                    fill_response_body_with_shredded_data(
                        stores,
                        processor.unshredder.as_ref(),
                        body_abstract,
                        &mut response,
                    )
                    .await?
                }
                None => {
                    fill_response_body_with_shredded_data(
                        stores,
                        &SimpleJsonUnshredder,
                        body_abstract,
                        &mut response,
                    )
                    .await?
                }
            }
        }
        Ok(response)
    }
}

impl std::fmt::Debug for OfflineCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineCache")
            .field("name", &self.name)
            .field("indexed_keys", &self.key_index.read().as_ref().map(Vec::len))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shredding::{EndpointOptions, JsonProcessor, SimpleJsonShredder};

    async fn open() -> (Arc<CacheContext>, OfflineCache) {
        let context = Arc::new(CacheContext::new(
            Arc::new(StoreManager::in_memory()),
            Arc::new(ShreddingRegistry::new()),
        ));
        let cache = OfflineCache::open(Arc::clone(&context), "api").await.unwrap();
        (context, cache)
    }

    fn items_response() -> HttpResponse {
        HttpResponse::ok().with_json(&serde_json::json!([{"id": 1}]))
    }

    #[tokio::test]
    async fn put_then_match() {
        let (_, cache) = open().await;
        let request = HttpRequest::get("https://api.test/items?page=1");
        let put = cache.put(&request, &items_response()).await.unwrap();
        assert_eq!(put.key, "https://api.test/items?page=1$GET$");
        assert!(put.undo_redo_data.is_empty());

        let found = cache.match_request(&request, MatchOptions::new()).await.unwrap();
        assert_eq!(found, Some(items_response()));

        let other_page = HttpRequest::get("https://api.test/items?page=2");
        assert!(!cache.has_match(&other_page, MatchOptions::new()).await.unwrap());
        assert!(cache
            .has_match(&other_page, MatchOptions::new().ignore_search(true))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn method_must_match_unless_ignored() {
        let (_, cache) = open().await;
        cache
            .put(&HttpRequest::get("https://api.test/items"), &items_response())
            .await
            .unwrap();
        let head = HttpRequest::new("HEAD", "https://api.test/items");
        assert!(!cache.has_match(&head, MatchOptions::new()).await.unwrap());
        assert!(cache
            .has_match(&head, MatchOptions::new().ignore_method(true))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn same_key_replaces_entry() {
        let (_, cache) = open().await;
        let request = HttpRequest::get("https://api.test/items");
        cache.put(&request, &items_response()).await.unwrap();
        cache.put(&request, &HttpResponse::new(204)).await.unwrap();
        let all = cache.match_all(None, MatchOptions::new()).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, 204);
    }

    #[tokio::test]
    async fn index_is_loaded_from_store() {
        let (context, cache) = open().await;
        let request = HttpRequest::get("https://api.test/items");
        cache.put(&request, &items_response()).await.unwrap();

        let reopened = OfflineCache::open(context, "api").await.unwrap();
        assert!(reopened.has_match(&request, MatchOptions::new()).await.unwrap());
        assert_eq!(reopened.keys(None, MatchOptions::new()).await.unwrap(), vec![request]);
    }

    #[tokio::test]
    async fn unparseable_keys_fall_back_to_metadata_query() {
        let (_, cache) = open().await;
        let request = HttpRequest::get("https://api.test/items");
        let value = construct_request_response_cache_data(&request, &items_response(), None).unwrap();
        cache
            .store
            .upsert(
                "opaque-key",
                json!({"url": request.url, "method": "GET", "baseUrl": request.base_url()}),
                value,
                None,
            )
            .await
            .unwrap();
        assert!(cache.has_match(&request, MatchOptions::new()).await.unwrap());
        assert!(cache.delete(&request, MatchOptions::new()).await.unwrap());
        assert!(!cache.has_match(&request, MatchOptions::new()).await.unwrap());
    }

    #[tokio::test]
    async fn shredded_put_match_and_delete() {
        let (context, cache) = open().await;
        let processor = JsonProcessor::new(
            Arc::new(SimpleJsonShredder::new("items")),
            Arc::new(SimpleJsonUnshredder),
        );
        let mut request = HttpRequest::get("https://api.test/items");
        let guard = context.shredding().register(
            &mut request,
            EndpointOptions::new().with_json_processor(processor),
        );

        let response = HttpResponse::ok().with_json(&json!([{"id": 1, "name": "Widget"}]));
        let put = cache.put(&request, &response).await.unwrap();
        assert_eq!(put.undo_redo_data.len(), 1);
        drop(guard);

        let stored = cache.store.find_by_key(&put.key).await.unwrap().unwrap();
        assert!(stored["responseData"].get("body").is_none());

        // Local row edits are visible through the cache.
        let items = context.stores().open_store("items").await.unwrap();
        items
            .upsert("1", json!({}), json!({"id": 1, "name": "Widget v2"}), None)
            .await
            .unwrap();
        let found = cache
            .match_request(&HttpRequest::get("https://api.test/items"), MatchOptions::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.body.to_json().unwrap(), json!([{"id": 1, "name": "Widget v2"}]));

        assert!(cache
            .delete(&HttpRequest::get("https://api.test/items"), MatchOptions::new())
            .await
            .unwrap());
        assert!(items.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn clear_removes_entries_and_shredded_stores() {
        let (context, cache) = open().await;
        let processor = JsonProcessor::new(
            Arc::new(SimpleJsonShredder::new("items")),
            Arc::new(SimpleJsonUnshredder),
        );
        let mut request = HttpRequest::get("https://api.test/items");
        let _guard = context.shredding().register(
            &mut request,
            EndpointOptions::new().with_json_processor(processor),
        );
        cache.put(&request, &items_response()).await.unwrap();
        assert!(context.stores().has_store("items"));

        cache.clear().await.unwrap();
        assert!(!context.stores().has_store("items"));
        assert!(cache.match_all(None, MatchOptions::new()).await.unwrap().is_empty());
        assert!(cache.book.load().await.unwrap().is_empty());
    }
}
