//! Moving response payloads between cache entries and auxiliary stores.

use super::processor::{BodyAbstractEntry, JsonProcessor, ShreddedData, Shredder, Unshredder};
use crate::error::{ShredError, ShredResult};
use futures::future::try_join_all;
use offkit_http::{HttpRequest, HttpResponse};
use offkit_store::{FindExpression, StoreManager, StoredRecord, UndoRedoData, UndoRedoRow};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Result of shredding one response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShredOutcome {
    /// Where the rows were written; stored in place of the body.
    pub body_abstract: Vec<BodyAbstractEntry>,
    /// Prior and new values of every written row.
    pub undo_redo_data: Vec<UndoRedoData>,
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Builds the `{requestData, responseData}` value of a cache entry.
///
/// The response body is kept only when no JSON processor handles the
/// endpoint; otherwise it is dropped in favour of a body abstract.
pub fn construct_request_response_cache_data(
    request: &HttpRequest,
    response: &HttpResponse,
    processor: Option<&JsonProcessor>,
) -> ShredResult<Value> {
    let request_data = request.to_json()?;
    let mut response_data = response.to_json()?;
    if processor.is_some() {
        if let Some(map) = response_data.as_object_mut() {
            map.remove("body");
        }
    }
    Ok(json!({
        "requestData": request_data,
        "responseData": response_data,
    }))
}

/// Stores `entries` as the serialized `bodyAbstract` of a cache value.
pub fn attach_body_abstract(cache_data: &mut Value, entries: &[BodyAbstractEntry]) -> ShredResult<()> {
    let serialized = serde_json::to_string(entries)?;
    let response_data = cache_data
        .get_mut("responseData")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| ShredError::processor("cache data has no responseData object"))?;
    response_data.insert("bodyAbstract".to_string(), Value::String(serialized));
    Ok(())
}

/// Reads the `bodyAbstract` of a stored `responseData` value, if any.
///
/// Accepts the serialized string form as well as a plain array.
pub fn body_abstract_of(response_data: &Value) -> ShredResult<Option<Vec<BodyAbstractEntry>>> {
    match response_data.get("bodyAbstract") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(serde_json::from_str(text)?)),
        Some(other) => Ok(Some(Vec::<BodyAbstractEntry>::deserialize(other)?)),
    }
}

/// Shreds `response` and upserts the resulting rows.
///
/// Rows are stored as `{key, metadata: {lastUpdated, resourceIdentifier},
/// value}`. Each store is written independently and the writes are awaited
/// together.
pub async fn shred_response(
    stores: &StoreManager,
    shredder: &dyn Shredder,
    response: &HttpResponse,
) -> ShredResult<ShredOutcome> {
    let shredded = shredder.shred(response)?;
    for data in &shredded {
        if data.keys.len() != data.data.len() {
            return Err(ShredError::processor(format!(
                "store {}: {} keys for {} rows",
                data.name,
                data.keys.len(),
                data.data.len()
            )));
        }
    }

    let undo_redo_data = try_join_all(shredded.iter().map(|data| write_rows(stores, data))).await?;
    debug!(
        url = %response.url,
        stores = shredded.len(),
        rows = shredded.iter().map(|d| d.keys.len()).sum::<usize>(),
        "shredded response"
    );

    Ok(ShredOutcome {
        body_abstract: shredded.iter().map(BodyAbstractEntry::from).collect(),
        undo_redo_data,
    })
}

async fn write_rows(stores: &StoreManager, data: &ShreddedData) -> ShredResult<UndoRedoData> {
    let store = stores.open_store(&data.name).await?;
    let metadata = json!({
        "lastUpdated": now_millis(),
        "resourceIdentifier": data.resource_identifier,
    });

    let mut rows = Vec::with_capacity(data.keys.len());
    let mut records = Vec::with_capacity(data.keys.len());
    for (key, value) in data.keys.iter().zip(&data.data) {
        let previous = store.find_by_key(key).await?;
        rows.push(UndoRedoRow::new(key.clone(), previous, Some(value.clone())));
        records.push(StoredRecord::new(key.clone(), metadata.clone(), value.clone()));
    }
    store.upsert_all(records).await?;
    Ok(UndoRedoData::upsert(&data.name, rows))
}

/// Reads the rows named by `body_abstract` and rebuilds the body of
/// `response` with `unshredder`.
///
/// Rows that no longer exist are skipped.
pub async fn fill_response_body_with_shredded_data(
    stores: &StoreManager,
    unshredder: &dyn Unshredder,
    body_abstract: &[BodyAbstractEntry],
    response: &mut HttpResponse,
) -> ShredResult<()> {
    let data = try_join_all(body_abstract.iter().map(|entry| read_rows(stores, entry))).await?;
    response.body = unshredder.unshred(&data, response)?;
    Ok(())
}

async fn read_rows(stores: &StoreManager, entry: &BodyAbstractEntry) -> ShredResult<ShreddedData> {
    let store = stores.open_store(&entry.name).await?;
    let (keys, data): (Vec<String>, Vec<Value>) = match entry.keys.as_slice() {
        [] => (Vec::new(), Vec::new()),
        [key] => match store.find_by_key(key).await? {
            Some(value) => (vec![key.clone()], vec![value]),
            None => (Vec::new(), Vec::new()),
        },
        keys => {
            let terms: Vec<Value> = keys.iter().map(|k| json!({"key": {"$eq": k}})).collect();
            let found = store
                .find(
                    &FindExpression::new()
                        .with_selector(json!({ "$or": terms }))
                        .with_fields(["key", "value"]),
                )
                .await?;
            let mut by_key: HashMap<String, Value> = found
                .into_iter()
                .filter_map(|doc| {
                    let key = doc.get("key")?.as_str()?.to_string();
                    Some((key, doc.get("value").cloned().unwrap_or(Value::Null)))
                })
                .collect();
            keys.iter()
                .filter_map(|k| by_key.remove(k).map(|value| (k.clone(), value)))
                .unzip()
        }
    };
    Ok(ShreddedData {
        name: entry.name.clone(),
        keys,
        data,
        resource_identifier: None,
        resource_type: entry.resource_type,
    })
}

/// Removes every row named by `body_abstract`; returns how many existed.
pub async fn delete_shredded_data(
    stores: &StoreManager,
    body_abstract: &[BodyAbstractEntry],
) -> ShredResult<usize> {
    let mut removed = 0;
    for entry in body_abstract {
        let store = stores.open_store(&entry.name).await?;
        for key in &entry.keys {
            if store.remove_by_key(key).await? {
                removed += 1;
            }
        }
    }
    debug!(rows = removed, "deleted shredded rows");
    Ok(removed)
}

/// Removes rows from a shredded store, returning `remove` undo/redo data
/// for the rows that existed.
pub async fn remove_shredded_rows(
    stores: &StoreManager,
    store_name: &str,
    keys: &[String],
) -> ShredResult<UndoRedoData> {
    let store = stores.open_store(store_name).await?;
    let mut rows = Vec::new();
    for key in keys {
        if let Some(previous) = store.find_by_key(key).await? {
            store.remove_by_key(key).await?;
            rows.push(UndoRedoRow::new(key.clone(), Some(previous), None));
        }
    }
    Ok(UndoRedoData::remove(store_name, rows))
}
