//! JSON processor contract: shredders and unshredders.

use crate::error::ShredResult;
use offkit_http::{Body, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Whether shredded rows represent one resource or a list of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    /// A single resource.
    Single,
    /// A collection of resources.
    Collection,
}

/// Rows destined for, or read back from, one auxiliary store.
#[derive(Debug, Clone, PartialEq)]
pub struct ShreddedData {
    /// Store name.
    pub name: String,
    /// Row keys, parallel to `data`.
    pub keys: Vec<String>,
    /// Row values.
    pub data: Vec<Value>,
    /// Version identifier of the resource (typically its `ETag`).
    pub resource_identifier: Option<String>,
    /// Resource shape.
    pub resource_type: ResourceType,
}

/// Entry of a cached response's `bodyAbstract`: where its rows live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyAbstractEntry {
    /// Store name.
    pub name: String,
    /// Row keys.
    pub keys: Vec<String>,
    /// Resource shape.
    pub resource_type: ResourceType,
}

impl From<&ShreddedData> for BodyAbstractEntry {
    fn from(data: &ShreddedData) -> Self {
        Self {
            name: data.name.clone(),
            keys: data.keys.clone(),
            resource_type: data.resource_type,
        }
    }
}

/// Splits a response payload into rows for auxiliary stores.
pub trait Shredder: Send + Sync {
    /// Shreds `response`. Implementations read the body themselves.
    fn shred(&self, response: &HttpResponse) -> ShredResult<Vec<ShreddedData>>;
}

/// Rebuilds a response body from rows read back from auxiliary stores.
pub trait Unshredder: Send + Sync {
    /// Rebuilds the body of `response` from `data`, given in the order of
    /// the cached `bodyAbstract`.
    fn unshred(&self, data: &[ShreddedData], response: &HttpResponse) -> ShredResult<Body>;
}

/// A shredder/unshredder pair.
#[derive(Clone)]
pub struct JsonProcessor {
    /// Shredder used when caching.
    pub shredder: Arc<dyn Shredder>,
    /// Unshredder used when matching.
    pub unshredder: Arc<dyn Unshredder>,
}

impl JsonProcessor {
    /// Creates a processor.
    pub fn new(shredder: Arc<dyn Shredder>, unshredder: Arc<dyn Unshredder>) -> Self {
        Self {
            shredder,
            unshredder,
        }
    }
}

impl fmt::Debug for JsonProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonProcessor").finish_non_exhaustive()
    }
}

/// Options attached to one endpoint round trip.
#[derive(Debug, Clone, Default)]
pub struct EndpointOptions {
    /// JSON processor; responses are shredded only when one is set.
    pub json_processor: Option<JsonProcessor>,
}

impl EndpointOptions {
    /// Creates options without a JSON processor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the JSON processor.
    pub fn with_json_processor(mut self, processor: JsonProcessor) -> Self {
        self.json_processor = Some(processor);
        self
    }
}
