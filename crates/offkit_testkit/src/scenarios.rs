//! Cross-crate scenario helpers.
//!
//! An offline write caches the optimistic response (shredding it into local
//! stores) and queues the request in the sync log together with the
//! undo/redo data of that local effect.

use crate::fixtures::{json_response, TestStack};
use offkit_cache::{CacheError, CacheResult, OfflineCache};
use offkit_http::{HttpRequest, HttpResponse};
use offkit_sync::SyncError;
use serde_json::json;
use thiserror::Error;

/// The result of [`offline_write`].
#[derive(Debug, Clone)]
pub struct OfflineWrite {
    /// Cache key of the optimistic response.
    pub cache_key: String,
    /// Sync log id of the queued request.
    pub request_id: String,
}

/// Errors of a scenario step.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// The cache step failed.
    #[error("cache step failed: {0}")]
    Cache(#[from] CacheError),
    /// The sync log step failed.
    #[error("sync step failed: {0}")]
    Sync(#[from] SyncError),
}

/// Caches `optimistic` for `request` and queues `request` for replay at the
/// current clock reading.
///
/// Shredding happens only if an endpoint is registered for `request` (see
/// [`TestStack::shred_into`]).
pub async fn offline_write(
    stack: &TestStack,
    cache: &OfflineCache,
    request: &HttpRequest,
    optimistic: &HttpResponse,
) -> Result<OfflineWrite, ScenarioError> {
    let put = cache.put(request, optimistic).await?;
    let undo_redo_data = (!put.undo_redo_data.is_empty()).then_some(put.undo_redo_data.as_slice());
    let request_id = stack.sync.log().insert_request(request, undo_redo_data).await?;
    Ok(OfflineWrite {
        cache_key: put.key,
        request_id,
    })
}

/// Caches `count` GET responses `https://api.test/items/{n}` in `cache`.
pub async fn populate_cache(cache: &OfflineCache, count: usize) -> CacheResult<()> {
    for n in 1..=count {
        let request = HttpRequest::get(format!("https://api.test/items/{n}"));
        cache.put(&request, &json_response(&json!({"id": n}))).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::items_payload;
    use offkit_cache::MatchOptions;

    #[tokio::test]
    async fn offline_write_records_undo_data() {
        let stack = TestStack::new();
        let cache = stack.cache("api").await;
        let mut request = HttpRequest::new("PUT", "https://api.test/items");
        let _guard = stack.shred_into(&mut request, "items");

        let write = offline_write(&stack, &cache, &request, &json_response(&items_payload(1)))
            .await
            .unwrap();
        let data = stack.sync.log().undo_redo_data(&write.request_id).await.unwrap();
        assert_eq!(data.map(|d| d.len()), Some(1));
        assert!(write.cache_key.starts_with("https://api.test/items$PUT$"));
    }

    #[tokio::test]
    async fn populate_cache_adds_entries() {
        let stack = TestStack::new();
        let cache = stack.cache("api").await;
        populate_cache(&cache, 3).await.unwrap();
        let keys = cache.keys(None, MatchOptions::new()).await.unwrap();
        assert_eq!(keys.len(), 3);
    }
}
