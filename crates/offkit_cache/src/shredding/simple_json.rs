//! Built-in JSON processor for plain REST resources.

use super::processor::{ResourceType, ShreddedData, Shredder, Unshredder};
use crate::error::{ShredError, ShredResult};
use offkit_http::{base_url, Body, HttpResponse};
use serde_json::{Map, Value};

/// Shreds a JSON body into one store.
///
/// An array body becomes a `collection` with one row per element, keyed by
/// the element's id attribute. An object body becomes a `single` row keyed
/// by its id attribute, or by the response URL when it has none. The
/// resource identifier is the response `ETag`.
#[derive(Debug, Clone)]
pub struct SimpleJsonShredder {
    store_name: String,
    id_attribute: String,
}

impl SimpleJsonShredder {
    /// Creates a shredder writing to `store_name`, keyed by `"id"`.
    pub fn new(store_name: impl Into<String>) -> Self {
        Self {
            store_name: store_name.into(),
            id_attribute: "id".to_string(),
        }
    }

    /// Sets the attribute rows are keyed by.
    pub fn with_id_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.id_attribute = attribute.into();
        self
    }

    fn id_of(&self, item: &Value) -> Option<String> {
        match item.get(&self.id_attribute)? {
            Value::String(id) => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }
}

impl Shredder for SimpleJsonShredder {
    fn shred(&self, response: &HttpResponse) -> ShredResult<Vec<ShreddedData>> {
        let body = response.body.to_json()?;
        let resource_identifier = response.headers.get("etag");
        let (keys, data, resource_type) = match body {
            Value::Array(items) => {
                let keys = items
                    .iter()
                    .map(|item| {
                        self.id_of(item).ok_or_else(|| {
                            ShredError::processor(format!(
                                "collection element without {:?}",
                                self.id_attribute
                            ))
                        })
                    })
                    .collect::<ShredResult<Vec<_>>>()?;
                (keys, items, ResourceType::Collection)
            }
            object @ Value::Object(_) => {
                let key = match self.id_of(&object) {
                    Some(id) => id,
                    None if !response.url.is_empty() => base_url(&response.url).to_string(),
                    None => {
                        return Err(ShredError::processor(format!(
                            "resource without {:?} or url",
                            self.id_attribute
                        )))
                    }
                };
                (vec![key], vec![object], ResourceType::Single)
            }
            _ => return Err(ShredError::processor("body is neither an array nor an object")),
        };
        Ok(vec![ShreddedData {
            name: self.store_name.clone(),
            keys,
            data,
            resource_identifier,
            resource_type,
        }])
    }
}

/// Rebuilds bodies shredded by [`SimpleJsonShredder`].
///
/// A `collection` becomes an array of its rows and a `single` its only row.
/// When rows come from several stores the body is an object keyed by store
/// name.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleJsonUnshredder;

impl SimpleJsonUnshredder {
    fn shape(data: &ShreddedData) -> Value {
        match data.resource_type {
            ResourceType::Collection => Value::Array(data.data.clone()),
            ResourceType::Single => data.data.first().cloned().unwrap_or(Value::Null),
        }
    }
}

impl Unshredder for SimpleJsonUnshredder {
    fn unshred(&self, data: &[ShreddedData], _response: &HttpResponse) -> ShredResult<Body> {
        let body = match data {
            [] => return Ok(Body::Empty),
            [only] => Self::shape(only),
            many => Value::Object(
                many.iter()
                    .map(|d| (d.name.clone(), Self::shape(d)))
                    .collect::<Map<String, Value>>(),
            ),
        };
        Ok(Body::json(&body))
    }
}
