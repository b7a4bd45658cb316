//! Dotted-path field access.

use serde_json::Value;

/// Resolves a dot-separated path (e.g. `"address.city"`) inside a document.
///
/// Returns `None` when any segment is missing, which callers treat as an
/// undefined field (distinct from a field holding JSON `null`). Numeric
/// segments index into arrays.
pub fn field_value<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = document;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_nested_fields() {
        let doc = json!({"name": "Alice", "address": {"city": "NYC"}});
        assert_eq!(field_value(&doc, "name"), Some(&json!("Alice")));
        assert_eq!(field_value(&doc, "address.city"), Some(&json!("NYC")));
    }

    #[test]
    fn missing_intermediate_is_undefined() {
        let doc = json!({"address": null});
        assert_eq!(field_value(&doc, "address"), Some(&Value::Null));
        assert_eq!(field_value(&doc, "address.city"), None);
        assert_eq!(field_value(&doc, "phone.home"), None);
    }

    #[test]
    fn indexes_into_arrays() {
        let doc = json!({"tags": ["a", "b"]});
        assert_eq!(field_value(&doc, "tags.1"), Some(&json!("b")));
        assert_eq!(field_value(&doc, "tags.7"), None);
        assert_eq!(field_value(&doc, "tags.x"), None);
    }
}
