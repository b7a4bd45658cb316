//! The durable queue of pending requests.

use crate::clock::{Clock, RequestIdGenerator};
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use offkit_http::HttpRequest;
use offkit_store::{
    FindExpression, PersistenceStore, RowOperation, StoreError, StoreManager, StoredRecord,
    UndoRedoData,
};
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use tracing::debug;

/// Which way undo/redo data is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Undo,
    Redo,
}

/// The sync log: pending requests keyed by creation time, plus the
/// undo/redo data of their local side effects.
///
/// Log records are `{requestId, request}` with metadata
/// `{url, method, created}`. The undo/redo store holds, under the same key,
/// a JSON array of [`UndoRedoData`].
pub struct SyncLog {
    stores: Arc<StoreManager>,
    log_store: String,
    undo_store: String,
    ids: RequestIdGenerator,
    seeded: AtomicBool,
}

impl SyncLog {
    /// Creates a sync log over the stores named in `config`.
    pub fn new(stores: Arc<StoreManager>, config: &SyncConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            stores,
            log_store: config.sync_log_store.clone(),
            undo_store: config.undo_redo_store.clone(),
            ids: RequestIdGenerator::new(clock),
            seeded: AtomicBool::new(false),
        }
    }

    /// Returns the sync log store name.
    pub fn log_store_name(&self) -> &str {
        &self.log_store
    }

    /// Returns the undo/redo store name.
    pub fn undo_store_name(&self) -> &str {
        &self.undo_store
    }

    async fn log(&self) -> SyncResult<Arc<dyn PersistenceStore>> {
        Ok(self.stores.open_store(&self.log_store).await?)
    }

    async fn undo(&self) -> SyncResult<Arc<dyn PersistenceStore>> {
        Ok(self.stores.open_store(&self.undo_store).await?)
    }

    /// Feeds every numeric key already persisted in the log and undo/redo
    /// stores to the id generator, once per instance.
    async fn seed_ids(
        &self,
        log: &dyn PersistenceStore,
        undo: &dyn PersistenceStore,
    ) -> SyncResult<()> {
        if self.seeded.load(AtomicOrdering::Acquire) {
            return Ok(());
        }
        let mut keys = log.keys().await?;
        keys.extend(undo.keys().await?);
        if let Some(max) = keys.iter().filter_map(|k| k.parse::<u64>().ok()).max() {
            self.ids.observe(max);
        }
        self.seeded.store(true, AtomicOrdering::Release);
        Ok(())
    }

    /// Returns an id held by no record of either store.
    async fn reserve_id(
        &self,
        log: &dyn PersistenceStore,
        undo: &dyn PersistenceStore,
    ) -> SyncResult<String> {
        self.seed_ids(log, undo).await?;
        loop {
            let id = self.ids.next_id();
            if log.find_by_key(&id).await?.is_none() && undo.find_by_key(&id).await?.is_none() {
                return Ok(id);
            }
            debug!(request_id = %id, "request id already taken");
        }
    }

    /// Appends `request` to the log and returns its request id.
    ///
    /// The id never reuses a key present in the log or undo/redo store,
    /// even one written by another log instance over the same stores.
    /// When `undo_redo_data` is given it is stored under the same id.
    pub async fn insert_request(
        &self,
        request: &HttpRequest,
        undo_redo_data: Option<&[UndoRedoData]>,
    ) -> SyncResult<String> {
        let log = self.log().await?;
        let undo = self.undo().await?;
        let request_id = self.reserve_id(log.as_ref(), undo.as_ref()).await?;
        let metadata = json!({
            "url": request.url,
            "method": request.method,
            "created": request_id,
        });
        let value = json!({
            "requestId": request_id,
            "request": request.to_json()?,
        });
        log.upsert(&request_id, metadata, value, None).await?;

        if let Some(data) = undo_redo_data {
            undo.upsert(&request_id, json!({}), serde_json::to_value(data)?, None)
                .await?;
        }
        debug!(request_id = %request_id, method = %request.method, url = %request.url, "queued request");
        Ok(request_id)
    }

    /// Removes the request stored under `request_id`.
    ///
    /// Undo/redo data is removed with it, except for `GET`/`HEAD` requests.
    /// Returns the removed request, or `None` if there was none.
    pub async fn remove_request(&self, request_id: &str) -> SyncResult<Option<HttpRequest>> {
        let log = self.log().await?;
        let Some(value) = log.find_by_key(request_id).await? else {
            return Ok(None);
        };
        let request = decode_request(request_id, &value)?;
        log.remove_by_key(request_id).await?;
        if !request.is_read_only() {
            self.undo().await?.remove_by_key(request_id).await?;
        }
        debug!(request_id, "removed request from sync log");
        Ok(Some(request))
    }

    /// Replaces the request stored under `request_id`, keeping its position.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if there is no such request.
    pub async fn update_request(&self, request_id: &str, request: &HttpRequest) -> SyncResult<()> {
        let log = self.log().await?;
        if log.find_by_key(request_id).await?.is_none() {
            return Err(StoreError::not_found(&self.log_store, request_id).into());
        }
        let metadata = json!({
            "url": request.url,
            "method": request.method,
            "created": request_id,
        });
        let value = json!({
            "requestId": request_id,
            "request": request.to_json()?,
        });
        log.upsert(request_id, metadata, value, None).await?;
        Ok(())
    }

    /// Returns every pending request in creation order.
    pub async fn get_sync_log(&self) -> SyncResult<Vec<SyncLogEntry>> {
        let rows = self
            .log()
            .await?
            .find(&FindExpression::new().with_fields(["key", "value"]))
            .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            let Some(request_id) = row.get("key").and_then(Value::as_str) else {
                continue;
            };
            let value = row.get("value").unwrap_or(&Value::Null);
            entries.push(SyncLogEntry {
                request_id: request_id.to_string(),
                request: decode_request(request_id, value)?,
                stores: Arc::clone(&self.stores),
                undo_store: self.undo_store.clone(),
            });
        }
        entries.sort_by(|a, b| compare_ids(&a.request_id, &b.request_id));
        Ok(entries)
    }

    /// Returns the undo/redo data stored for `request_id`.
    pub async fn undo_redo_data(&self, request_id: &str) -> SyncResult<Option<Vec<UndoRedoData>>> {
        load_undo_redo_data(&self.stores, &self.undo_store, request_id).await
    }

    /// Returns the number of pending requests.
    pub async fn len(&self) -> SyncResult<usize> {
        Ok(self.log().await?.keys().await?.len())
    }

    /// Returns true if nothing is pending.
    pub async fn is_empty(&self) -> SyncResult<bool> {
        Ok(self.len().await? == 0)
    }
}

impl std::fmt::Debug for SyncLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncLog")
            .field("log_store", &self.log_store)
            .field("undo_store", &self.undo_store)
            .field("ids", &self.ids)
            .finish()
    }
}

/// A pending request, able to undo or redo its local side effects.
#[derive(Debug, Clone)]
pub struct SyncLogEntry {
    request_id: String,
    request: HttpRequest,
    stores: Arc<StoreManager>,
    undo_store: String,
}

impl SyncLogEntry {
    /// Returns the request id.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Returns the pending request.
    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    /// Rolls back the local side effects recorded for this request.
    ///
    /// Returns false when no undo/redo data was recorded.
    pub async fn undo(&self) -> SyncResult<bool> {
        self.apply(Direction::Undo).await
    }

    /// Reapplies the local side effects recorded for this request.
    ///
    /// Returns false when no undo/redo data was recorded.
    pub async fn redo(&self) -> SyncResult<bool> {
        self.apply(Direction::Redo).await
    }

    async fn apply(&self, direction: Direction) -> SyncResult<bool> {
        let Some(data) =
            load_undo_redo_data(&self.stores, &self.undo_store, &self.request_id).await?
        else {
            return Ok(false);
        };
        let mut ordered: Vec<&UndoRedoData> = data.iter().collect();
        if direction == Direction::Undo {
            ordered.reverse();
        }
        for item in ordered {
            apply_undo_redo(&self.stores, item, direction).await?;
        }
        debug!(request_id = %self.request_id, ?direction, stores = data.len(), "applied undo/redo data");
        Ok(true)
    }
}

async fn load_undo_redo_data(
    stores: &StoreManager,
    undo_store: &str,
    request_id: &str,
) -> SyncResult<Option<Vec<UndoRedoData>>> {
    let store = stores.open_store(undo_store).await?;
    match store.find_by_key(request_id).await? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

async fn apply_undo_redo(
    stores: &StoreManager,
    data: &UndoRedoData,
    direction: Direction,
) -> SyncResult<()> {
    let store = stores.open_store(&data.store_name).await?;
    let mut upserts = Vec::new();
    for row in &data.undo_redo_data {
        let target = match (data.operation, direction) {
            (_, Direction::Undo) => row.undo.as_ref(),
            (RowOperation::Upsert, Direction::Redo) => row.redo.as_ref(),
            (RowOperation::Remove, Direction::Redo) => None,
        };
        match target {
            Some(value) => upserts.push(StoredRecord::new(row.key.clone(), json!({}), value.clone())),
            None => {
                store.remove_by_key(&row.key).await?;
            }
        }
    }
    if !upserts.is_empty() {
        store.upsert_all(upserts).await?;
    }
    Ok(())
}

fn decode_request(request_id: &str, value: &Value) -> SyncResult<HttpRequest> {
    let request = value
        .get("request")
        .ok_or_else(|| SyncError::corrupt_entry(request_id, "missing request"))?;
    Ok(HttpRequest::from_json(request)?)
}

/// Orders request ids numerically, falling back to text order.
fn compare_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use offkit_store::UndoRedoRow;

    fn setup(now: u64) -> (Arc<StoreManager>, Arc<ManualClock>, SyncLog) {
        let stores = Arc::new(StoreManager::in_memory());
        let clock = Arc::new(ManualClock::new(now));
        let log = SyncLog::new(Arc::clone(&stores), &SyncConfig::default(), clock.clone());
        (stores, clock, log)
    }

    #[tokio::test]
    async fn insert_and_list_in_creation_order() {
        let (_, clock, log) = setup(900);
        let first = log.insert_request(&HttpRequest::get("https://api.test/a"), None).await.unwrap();
        clock.set(1000);
        let second = log
            .insert_request(&HttpRequest::new("POST", "https://api.test/b"), None)
            .await
            .unwrap();
        assert_eq!((first.as_str(), second.as_str()), ("900", "1000"));

        let entries = log.get_sync_log().await.unwrap();
        let ids: Vec<&str> = entries.iter().map(SyncLogEntry::request_id).collect();
        assert_eq!(ids, vec!["900", "1000"]);
        assert_eq!(entries[1].request().method, "POST");
    }

    #[tokio::test]
    async fn same_millisecond_inserts_do_not_collide() {
        let (_, _, log) = setup(5);
        let a = log.insert_request(&HttpRequest::get("/a"), None).await.unwrap();
        let b = log.insert_request(&HttpRequest::get("/b"), None).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(log.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn reopened_log_never_overwrites_pending_requests() {
        let (stores, clock, first) = setup(100);
        for url in ["/a", "/b", "/c"] {
            first.insert_request(&HttpRequest::new("POST", url), None).await.unwrap();
        }

        clock.set(101);
        let reopened = SyncLog::new(Arc::clone(&stores), &SyncConfig::default(), clock.clone());
        let id = reopened.insert_request(&HttpRequest::new("POST", "/d"), None).await.unwrap();
        assert_eq!(id, "103");

        let urls: Vec<String> = reopened
            .get_sync_log()
            .await
            .unwrap()
            .iter()
            .map(|e| e.request().url.clone())
            .collect();
        assert_eq!(urls, vec!["/a", "/b", "/c", "/d"]);
    }

    #[tokio::test]
    async fn logs_sharing_stores_skip_taken_ids() {
        let (stores, clock, first) = setup(100);
        let second = SyncLog::new(Arc::clone(&stores), &SyncConfig::default(), clock.clone());
        // Seed the second log while the store is still empty.
        let b = second.insert_request(&HttpRequest::new("POST", "/b"), None).await.unwrap();
        let a = first.insert_request(&HttpRequest::new("POST", "/a"), None).await.unwrap();
        let c = second.insert_request(&HttpRequest::new("POST", "/c"), None).await.unwrap();

        assert_eq!((b.as_str(), a.as_str(), c.as_str()), ("100", "101", "102"));
        assert_eq!(first.len().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn stale_undo_data_is_not_inherited() {
        let (stores, clock, first) = setup(100);
        let data = [UndoRedoData::upsert("items", vec![UndoRedoRow::new("1", None, Some(json!(1)))])];
        let read = first
            .insert_request(&HttpRequest::get("https://api.test/items"), Some(&data))
            .await
            .unwrap();
        first.remove_request(&read).await.unwrap();
        assert!(first.undo_redo_data(&read).await.unwrap().is_some());

        clock.set(100);
        let reopened = SyncLog::new(Arc::clone(&stores), &SyncConfig::default(), clock.clone());
        let id = reopened.insert_request(&HttpRequest::new("POST", "/x"), None).await.unwrap();
        assert_ne!(id, read);
        assert_eq!(reopened.undo_redo_data(&id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn remove_keeps_undo_data_of_reads() {
        let (stores, _, log) = setup(10);
        let data = [UndoRedoData::upsert("items", vec![UndoRedoRow::new("1", None, Some(json!(1)))])];
        let read = log
            .insert_request(&HttpRequest::get("https://api.test/items"), Some(&data))
            .await
            .unwrap();
        let write = log
            .insert_request(&HttpRequest::new("PUT", "https://api.test/items/1"), Some(&data))
            .await
            .unwrap();

        assert!(log.remove_request(&read).await.unwrap().is_some());
        assert!(log.remove_request(&write).await.unwrap().is_some());
        assert!(log.remove_request(&write).await.unwrap().is_none());

        let undo = stores.open_store("redoUndoLog").await.unwrap();
        assert_eq!(undo.keys().await.unwrap(), vec![read]);
        assert!(log.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn update_keeps_position() {
        let (_, clock, log) = setup(1);
        let first = log.insert_request(&HttpRequest::new("POST", "/a"), None).await.unwrap();
        clock.set(2);
        log.insert_request(&HttpRequest::new("POST", "/b"), None).await.unwrap();

        let replacement = HttpRequest::new("PUT", "/a2");
        log.update_request(&first, &replacement).await.unwrap();
        let entries = log.get_sync_log().await.unwrap();
        assert_eq!(entries[0].request(), &replacement);

        let err = log.update_request("999", &replacement).await.unwrap_err();
        assert!(matches!(err, SyncError::Store(e) if e.is_not_found()));
    }

    #[tokio::test]
    async fn undo_and_redo_upserts() {
        let (stores, _, log) = setup(1);
        let items = stores.open_store("items").await.unwrap();
        items.upsert("1", json!({}), json!({"v": 2}), None).await.unwrap();
        items.upsert("2", json!({}), json!({"v": 9}), None).await.unwrap();

        let data = [UndoRedoData::upsert(
            "items",
            vec![
                UndoRedoRow::new("1", Some(json!({"v": 1})), Some(json!({"v": 2}))),
                UndoRedoRow::new("2", None, Some(json!({"v": 9}))),
            ],
        )];
        log.insert_request(&HttpRequest::new("PUT", "/items"), Some(&data))
            .await
            .unwrap();
        let entry = log.get_sync_log().await.unwrap().remove(0);

        assert!(entry.undo().await.unwrap());
        assert_eq!(items.find_by_key("1").await.unwrap(), Some(json!({"v": 1})));
        assert_eq!(items.find_by_key("2").await.unwrap(), None);

        assert!(entry.redo().await.unwrap());
        assert_eq!(items.find_by_key("1").await.unwrap(), Some(json!({"v": 2})));
        assert_eq!(items.find_by_key("2").await.unwrap(), Some(json!({"v": 9})));
    }

    #[tokio::test]
    async fn undo_and_redo_removals() {
        let (stores, _, log) = setup(1);
        let items = stores.open_store("items").await.unwrap();
        let data = [UndoRedoData::remove(
            "items",
            vec![UndoRedoRow::new("1", Some(json!({"v": 1})), None)],
        )];
        log.insert_request(&HttpRequest::new("DELETE", "/items/1"), Some(&data))
            .await
            .unwrap();
        let entry = log.get_sync_log().await.unwrap().remove(0);

        entry.undo().await.unwrap();
        assert_eq!(items.find_by_key("1").await.unwrap(), Some(json!({"v": 1})));
        entry.redo().await.unwrap();
        assert_eq!(items.find_by_key("1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn undo_without_data_reports_false() {
        let (_, _, log) = setup(1);
        log.insert_request(&HttpRequest::new("POST", "/a"), None).await.unwrap();
        let entry = log.get_sync_log().await.unwrap().remove(0);
        assert!(!entry.undo().await.unwrap());
        assert!(!entry.redo().await.unwrap());
    }

    #[test]
    fn ids_sort_numerically() {
        let mut ids = vec!["100", "50", "x", "7"];
        ids.sort_by(|a, b| compare_ids(a, b));
        assert_eq!(ids, vec!["7", "50", "100", "x"]);
    }
}
