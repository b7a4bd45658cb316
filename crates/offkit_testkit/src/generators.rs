//! Property-based test generators using proptest.
//!
//! Documents and selectors draw field names from a small shared pool so
//! generated selectors actually hit generated documents.

use offkit_selector::SortCriterion;
use proptest::prelude::*;
use serde_json::{json, Map, Value};

/// Field paths documents and selectors are built from.
pub const FIELDS: &[&str] = &["name", "age", "active", "score", "tags", "address.city"];

/// Strategy for generating a field path from [`FIELDS`].
pub fn field_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(FIELDS).prop_map(str::to_string)
}

/// Strategy for generating scalar JSON values with frequent collisions.
pub fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        1 => Just(Value::Null),
        1 => any::<bool>().prop_map(Value::Bool),
        3 => (-3i64..4).prop_map(|n| json!(n)),
        3 => prop::string::string_regex("[a-c]{0,2}")
            .expect("Invalid regex")
            .prop_map(Value::String),
    ]
}

/// Strategy for generating documents over [`FIELDS`]; each field may be
/// absent.
pub fn document_strategy() -> impl Strategy<Value = Value> {
    (
        prop::option::of(scalar_strategy()),
        prop::option::of(scalar_strategy()),
        prop::option::of(any::<bool>()),
        prop::option::of(scalar_strategy()),
        prop::option::of(prop::collection::vec(scalar_strategy(), 0..3)),
        prop::option::of(prop::option::of(scalar_strategy())),
    )
        .prop_map(|(name, age, active, score, tags, city)| {
            let mut doc = Map::new();
            if let Some(v) = name {
                doc.insert("name".into(), v);
            }
            if let Some(v) = age {
                doc.insert("age".into(), v);
            }
            if let Some(v) = active {
                doc.insert("active".into(), Value::Bool(v));
            }
            if let Some(v) = score {
                doc.insert("score".into(), v);
            }
            if let Some(v) = tags {
                doc.insert("tags".into(), Value::Array(v));
            }
            // Outer None: no address; inner None: address without city.
            if let Some(city) = city {
                let mut address = Map::new();
                if let Some(v) = city {
                    address.insert("city".into(), v);
                }
                doc.insert("address".into(), Value::Object(address));
            }
            Value::Object(doc)
        })
}

/// Strategy for generating a single-condition selector such as
/// `{"age": {"$gte": 2}}` or the implicit-equality form `{"name": "a"}`.
pub fn condition_strategy() -> impl Strategy<Value = Value> {
    let operand = prop_oneof![
        scalar_strategy().prop_map(|v| ("$eq", v)),
        scalar_strategy().prop_map(|v| ("$ne", v)),
        scalar_strategy().prop_map(|v| ("$lt", v)),
        scalar_strategy().prop_map(|v| ("$lte", v)),
        scalar_strategy().prop_map(|v| ("$gt", v)),
        scalar_strategy().prop_map(|v| ("$gte", v)),
        prop::collection::vec(scalar_strategy(), 0..4).prop_map(|v| ("$in", Value::Array(v))),
        any::<bool>().prop_map(|v| ("$exists", Value::Bool(v))),
    ];
    (field_strategy(), operand, any::<bool>()).prop_map(|(field, (op, value), implicit)| {
        if implicit && op == "$eq" {
            json!({ field: value })
        } else {
            json!({ field: { op: value } })
        }
    })
}

/// Strategy for generating selector trees with `$and`/`$or` nesting.
pub fn selector_strategy() -> impl Strategy<Value = Value> {
    condition_strategy().prop_recursive(3, 16, 3, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..3).prop_map(|terms| json!({"$and": terms})),
            prop::collection::vec(inner, 0..3).prop_map(|terms| json!({"$or": terms})),
        ]
    })
}

/// Strategy for generating one to three sort criteria over [`FIELDS`].
pub fn sort_criteria_strategy() -> impl Strategy<Value = Vec<SortCriterion>> {
    prop::collection::vec(
        (field_strategy(), any::<bool>()).prop_map(|(field, ascending)| {
            if ascending {
                SortCriterion::asc(field)
            } else {
                SortCriterion::desc(field)
            }
        }),
        1..4,
    )
}

/// Strategy for generating HTTP methods.
pub fn method_strategy() -> impl Strategy<Value = &'static str> {
    prop::sample::select(&["GET", "HEAD", "PUT", "POST", "PATCH", "DELETE"][..])
}

/// Strategy for generating header values such as `en` or `fr-CA`.
pub fn header_value_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z]{2}(-[A-Z]{2})?").expect("Invalid regex")
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
