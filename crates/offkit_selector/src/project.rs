//! Field projection.

use crate::path::field_value;
use serde_json::{Map, Value};

/// Projects a list of dotted field paths out of `value` into a new object
/// with the same nesting.
///
/// Fields missing from `value` are left out of the result.
pub fn assemble_object<S: AsRef<str>>(value: &Value, fields: &[S]) -> Value {
    let mut out = Map::new();
    for field in fields {
        let path = field.as_ref();
        if let Some(found) = field_value(value, path) {
            insert_path(&mut out, path, found.clone());
        }
    }
    Value::Object(out)
}

fn insert_path(target: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            target.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let child = target
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(map) = child {
                insert_path(map, rest, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn projects_nested_paths() {
        let record = json!({
            "key": "k1",
            "metadata": {"url": "/items", "created": 5},
            "value": {"name": "Widget", "price": 3}
        });
        let projected = assemble_object(&record, &["key", "metadata.url", "value.name"]);
        assert_eq!(
            projected,
            json!({"key": "k1", "metadata": {"url": "/items"}, "value": {"name": "Widget"}})
        );
    }

    #[test]
    fn skips_missing_fields() {
        let projected = assemble_object(&json!({"a": 1}), &["a", "b.c"]);
        assert_eq!(projected, json!({"a": 1}));
    }
}
