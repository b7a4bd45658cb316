//! Store records and find expressions.

use crate::error::StoreResult;
use offkit_selector::{SelectorError, SortCriterion};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A single record held by a persistence store.
///
/// `metadata` is free-form; OffKit conventionally stores `url`, `method`,
/// `baseUrl`, `created` and `lastupdated` there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    /// Unique key within the store.
    pub key: String,
    /// Free-form metadata.
    pub metadata: Value,
    /// The stored value.
    pub value: Value,
    /// Optimistic concurrency tag assigned by the store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_tag: Option<String>,
}

impl StoredRecord {
    /// Creates a record without a version tag.
    pub fn new(key: impl Into<String>, metadata: Value, value: Value) -> Self {
        Self {
            key: key.into(),
            metadata,
            value,
            version_tag: None,
        }
    }

    /// Returns the `{key, metadata, value}` document selectors and
    /// projections are evaluated against.
    pub fn document(&self) -> Value {
        json!({
            "key": self.key,
            "metadata": self.metadata,
            "value": self.value,
        })
    }
}

/// A query against a store: `{ selector, fields, sort }`.
///
/// Selectors address the record document, e.g. `"metadata.url"` or
/// `"value.name"`. Without `fields`, `find` returns record values; with
/// `fields`, it returns projections of the record document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindExpression {
    /// Selector; `None` matches every record.
    pub selector: Option<Value>,
    /// Dotted fields to project.
    pub fields: Option<Vec<String>>,
    /// Sort criteria applied before projection.
    pub sort: Vec<SortCriterion>,
}

impl FindExpression {
    /// Creates an expression matching every record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the selector.
    pub fn with_selector(mut self, selector: Value) -> Self {
        self.selector = Some(selector);
        self
    }

    /// Sets the projected fields.
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the sort criteria.
    pub fn with_sort(mut self, sort: Vec<SortCriterion>) -> Self {
        self.sort = sort;
        self
    }

    /// Parses the JSON form `{"selector": .., "fields": [..], "sort": [..]}`.
    pub fn from_json(expression: &Value) -> StoreResult<Self> {
        let selector = expression.get("selector").cloned();
        let fields = match expression.get("fields") {
            None | Some(Value::Null) => None,
            Some(Value::Array(items)) => Some(
                items
                    .iter()
                    .map(|f| {
                        f.as_str().map(str::to_string).ok_or_else(|| {
                            SelectorError::malformed("fields must be strings")
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Some(_) => return Err(SelectorError::malformed("fields must be an array").into()),
        };
        let sort = match expression.get("sort") {
            None | Some(Value::Null) => Vec::new(),
            Some(sort) => SortCriterion::parse_list(sort)?,
        };
        Ok(Self {
            selector,
            fields,
            sort,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_document_shape() {
        let record = StoredRecord::new("k", json!({"url": "/a"}), json!({"x": 1}));
        assert_eq!(
            record.document(),
            json!({"key": "k", "metadata": {"url": "/a"}, "value": {"x": 1}})
        );
    }

    #[test]
    fn record_serializes_camel_case() {
        let mut record = StoredRecord::new("k", json!({}), json!(null));
        record.version_tag = Some("7".into());
        let encoded = serde_json::to_value(&record).unwrap();
        assert_eq!(encoded["versionTag"], json!("7"));
    }

    #[test]
    fn find_expression_from_json() {
        let expr = FindExpression::from_json(&json!({
            "selector": {"value.name": "Widget"},
            "fields": ["key", "value.name"],
            "sort": [{"key": "desc"}]
        }))
        .unwrap();
        assert_eq!(expr.selector, Some(json!({"value.name": "Widget"})));
        assert_eq!(expr.fields.as_deref().map(<[String]>::len), Some(2));
        assert_eq!(expr.sort, vec![SortCriterion::desc("key")]);
    }

    #[test]
    fn find_expression_rejects_bad_fields() {
        assert!(FindExpression::from_json(&json!({"fields": "key"})).is_err());
        assert!(FindExpression::from_json(&json!({"fields": [1]})).is_err());
    }
}
