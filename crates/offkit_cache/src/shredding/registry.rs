//! Endpoint options registry.

use super::processor::EndpointOptions;
use offkit_http::HttpRequest;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Endpoint options keyed by a per-request endpoint key.
///
/// Options are registered before a round trip and looked up by the cache
/// when the response is stored or matched. The registry is an explicit
/// context object shared through [`CacheContext`](crate::CacheContext).
#[derive(Debug, Default)]
pub struct ShreddingRegistry {
    endpoints: RwLock<HashMap<String, Arc<EndpointOptions>>>,
}

impl ShreddingRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `options` under a fresh endpoint key and stamps that key
    /// on `request`.
    ///
    /// The options stay registered until the returned guard is dropped.
    pub fn register(
        self: &Arc<Self>,
        request: &mut HttpRequest,
        options: EndpointOptions,
    ) -> EndpointGuard {
        let key = Uuid::new_v4().to_string();
        self.endpoints.write().insert(key.clone(), Arc::new(options));
        request.set_endpoint_key(Some(key.clone()));
        debug!(endpoint = %key, url = %request.url, "registered endpoint options");
        EndpointGuard {
            registry: Arc::clone(self),
            key,
        }
    }

    /// Returns the options registered under `key`.
    pub fn get(&self, key: &str) -> Option<Arc<EndpointOptions>> {
        self.endpoints.read().get(key).cloned()
    }

    /// Returns the options for the endpoint key stamped on `request`.
    pub fn options_for(&self, request: &HttpRequest) -> Option<Arc<EndpointOptions>> {
        request.endpoint_key().and_then(|key| self.get(key))
    }

    /// Returns the number of registered endpoints.
    pub fn len(&self) -> usize {
        self.endpoints.read().len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.endpoints.read().is_empty()
    }

    fn unregister(&self, key: &str) {
        self.endpoints.write().remove(key);
    }
}

/// Keeps endpoint options registered; unregisters them on drop.
#[derive(Debug)]
#[must_use = "endpoint options are unregistered when the guard is dropped"]
pub struct EndpointGuard {
    registry: Arc<ShreddingRegistry>,
    key: String,
}

impl EndpointGuard {
    /// Returns the endpoint key.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for EndpointGuard {
    fn drop(&mut self) {
        self.registry.unregister(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_stamps_and_unregisters() {
        let registry = Arc::new(ShreddingRegistry::new());
        let mut request = HttpRequest::get("https://api.test/items");

        let guard = registry.register(&mut request, EndpointOptions::new());
        assert_eq!(request.endpoint_key(), Some(guard.key()));
        assert!(registry.options_for(&request).is_some());
        assert_eq!(registry.len(), 1);

        drop(guard);
        assert!(registry.options_for(&request).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn keys_are_per_request() {
        let registry = Arc::new(ShreddingRegistry::new());
        let mut a = HttpRequest::get("https://api.test/a");
        let mut b = HttpRequest::get("https://api.test/a");
        let _ga = registry.register(&mut a, EndpointOptions::new());
        let _gb = registry.register(&mut b, EndpointOptions::new());
        assert_ne!(a.endpoint_key(), b.endpoint_key());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn unstamped_request_has_no_options() {
        let registry = ShreddingRegistry::new();
        assert!(registry.options_for(&HttpRequest::get("/")).is_none());
    }
}
