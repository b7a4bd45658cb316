//! Stable multi-criteria sorting.

use crate::collation::collate;
use crate::error::{SelectorError, SelectorResult};
use crate::path::field_value;
use serde_json::Value;
use std::cmp::Ordering;

/// Sort direction for a single criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    /// Smallest first.
    #[default]
    Ascending,
    /// Largest first.
    Descending,
}

/// One sort criterion: a dotted field path and a direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortCriterion {
    /// Dotted field path.
    pub field: String,
    /// Direction.
    pub direction: SortDirection,
}

impl SortCriterion {
    /// Creates an ascending criterion.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    /// Creates a descending criterion.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }

    /// Parses a JSON list of sort criteria.
    ///
    /// Accepts an array whose items are either plain field names (ascending)
    /// or single-entry objects `{"field": "asc" | "desc"}`.
    pub fn parse_list(value: &Value) -> SelectorResult<Vec<Self>> {
        let items = value
            .as_array()
            .ok_or_else(|| SelectorError::InvalidSort("sort must be an array".into()))?;

        items
            .iter()
            .map(|item| match item {
                Value::String(field) => Ok(Self::asc(field.as_str())),
                Value::Object(map) if map.len() == 1 => {
                    let (field, direction) = map.iter().next().ok_or_else(|| {
                        SelectorError::InvalidSort("empty sort object".into())
                    })?;
                    match direction.as_str() {
                        Some("asc") => Ok(Self::asc(field.as_str())),
                        Some("desc") => Ok(Self::desc(field.as_str())),
                        _ => Err(SelectorError::InvalidSort(format!(
                            "direction for {field:?} must be \"asc\" or \"desc\""
                        ))),
                    }
                }
                other => Err(SelectorError::InvalidSort(format!(
                    "unsupported sort item {other}"
                ))),
            })
            .collect()
    }

    fn compare(&self, a: &Value, b: &Value) -> Ordering {
        let ord = collate(field_value(a, &self.field), field_value(b, &self.field));
        match self.direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    }
}

/// Sorts rows in place.
///
/// Ties on one criterion cascade to the next; rows equal under every
/// criterion keep their input order.
pub fn sort_rows(rows: &mut [Value], criteria: &[SortCriterion]) {
    if criteria.is_empty() {
        return;
    }
    rows.sort_by(|a, b| {
        criteria
            .iter()
            .map(|c| c.compare(a, b))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_mixed_criteria() {
        let criteria = SortCriterion::parse_list(&json!(["name", {"age": "desc"}])).unwrap();
        assert_eq!(criteria, vec![SortCriterion::asc("name"), SortCriterion::desc("age")]);
    }

    #[test]
    fn parse_rejects_bad_direction() {
        assert!(SortCriterion::parse_list(&json!([{"age": "down"}])).is_err());
        assert!(SortCriterion::parse_list(&json!("name")).is_err());
        assert!(SortCriterion::parse_list(&json!([3])).is_err());
    }

    #[test]
    fn ties_cascade_and_stay_stable() {
        let mut rows = vec![
            json!({"id": 1, "team": "b", "score": 3}),
            json!({"id": 2, "team": "a", "score": 3}),
            json!({"id": 3, "team": "a", "score": 9}),
            json!({"id": 4, "team": "a", "score": 3}),
        ];
        sort_rows(
            &mut rows,
            &[SortCriterion::asc("team"), SortCriterion::desc("score")],
        );
        let ids: Vec<_> = rows.iter().map(|r| r["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![3, 2, 4, 1]);
    }

    #[test]
    fn missing_fields_sort_first() {
        let mut rows = vec![json!({"n": 2}), json!({}), json!({"n": null})];
        sort_rows(&mut rows, &[SortCriterion::asc("n")]);
        assert_eq!(rows, vec![json!({}), json!({"n": null}), json!({"n": 2})]);
    }
}
