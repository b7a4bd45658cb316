//! # OffKit Selector
//!
//! Selector evaluation engine for OffKit.
//!
//! This crate provides:
//! - Mango-style selector parsing (`$and`, `$or`, `$eq`, `$ne`, `$lt`, `$lte`,
//!   `$gt`, `$gte`, `$in`, `$exists`, `$regex`)
//! - Dotted-path field access over JSON documents
//! - Deterministic collation and stable multi-criteria sorting
//! - Field projection (`assemble_object`)
//!
//! This is a pure crate with no I/O operations. It is used by the cache
//! matching engine and by the in-memory store's query path.
//!
//! ## Example
//!
//! ```rust
//! use offkit_selector::{satisfy, Selector};
//! use serde_json::json;
//!
//! let doc = json!({"name": "widget", "stock": {"count": 4}});
//! assert!(satisfy(&json!({"stock.count": {"$gt": 2}}), &doc).unwrap());
//!
//! let selector = Selector::parse(&json!({"$or": [{"name": "gadget"}, {"name": "widget"}]})).unwrap();
//! assert!(selector.matches(&doc));
//! ```
//!
//! ## Key Invariants
//!
//! - A selector is compiled once and is immutable afterwards
//! - Unknown operators fail at parse time, never at evaluation time
//! - A missing field never satisfies an ordering comparison

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod collation;
mod error;
mod expression;
mod path;
mod project;
mod sort;

pub use collation::{collate, values_equal};
pub use error::{SelectorError, SelectorResult};
pub use expression::{satisfy, Condition, Expression, Operator, Selector};
pub use path::field_value;
pub use project::assemble_object;
pub use sort::{sort_rows, SortCriterion, SortDirection};
