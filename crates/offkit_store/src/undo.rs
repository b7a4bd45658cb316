//! Undo/redo row data.
//!
//! Undo/redo data records, per store row, the value before and after a
//! local side effect. It is captured when shredded rows are written or
//! removed and persisted alongside the sync log entry that caused it, so the
//! side effect can be rolled back or reapplied independently of the network
//! outcome.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The local operation a set of rows went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowOperation {
    /// Rows were inserted or replaced.
    Upsert,
    /// A row was removed.
    Remove,
}

/// Before/after values of a single row. `None` means "row absent".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UndoRedoRow {
    /// Row key.
    pub key: String,
    /// Value before the operation.
    pub undo: Option<Value>,
    /// Value after the operation.
    pub redo: Option<Value>,
}

impl UndoRedoRow {
    /// Creates a row entry.
    pub fn new(key: impl Into<String>, undo: Option<Value>, redo: Option<Value>) -> Self {
        Self {
            key: key.into(),
            undo,
            redo,
        }
    }
}

/// Undo/redo data for one store: `{ storeName, operation, undoRedoData }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoRedoData {
    /// Name of the store the rows live in.
    pub store_name: String,
    /// Operation the rows went through.
    pub operation: RowOperation,
    /// Per-row values.
    pub undo_redo_data: Vec<UndoRedoRow>,
}

impl UndoRedoData {
    /// Creates undo/redo data for an upsert.
    pub fn upsert(store_name: impl Into<String>, rows: Vec<UndoRedoRow>) -> Self {
        Self {
            store_name: store_name.into(),
            operation: RowOperation::Upsert,
            undo_redo_data: rows,
        }
    }

    /// Creates undo/redo data for a removal.
    pub fn remove(store_name: impl Into<String>, rows: Vec<UndoRedoRow>) -> Self {
        Self {
            store_name: store_name.into(),
            operation: RowOperation::Remove,
            undo_redo_data: rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn persisted_layout() {
        let data = UndoRedoData::upsert(
            "items",
            vec![UndoRedoRow::new("1", None, Some(json!({"name": "Widget"})))],
        );
        assert_eq!(
            serde_json::to_value(&data).unwrap(),
            json!({
                "storeName": "items",
                "operation": "upsert",
                "undoRedoData": [{"key": "1", "undo": null, "redo": {"name": "Widget"}}]
            })
        );
    }

    #[test]
    fn null_reads_back_as_absent() {
        let data: UndoRedoData = serde_json::from_value(json!({
            "storeName": "items",
            "operation": "remove",
            "undoRedoData": [{"key": "1", "undo": {"a": 1}, "redo": null}]
        }))
        .unwrap();
        assert_eq!(data.operation, RowOperation::Remove);
        assert_eq!(data.undo_redo_data[0].redo, None);
    }
}
