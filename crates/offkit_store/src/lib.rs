//! # OffKit Store
//!
//! Persistence store contract and implementations for OffKit.
//!
//! The production store (typically an embedded document database with
//! secondary indexes) lives outside this workspace. This crate defines the
//! contract the rest of OffKit consumes, plus:
//!
//! - [`StoreManager`] - opens, caches and deletes named stores
//! - [`InMemoryStore`] - reference implementation for tests and ephemeral use
//! - [`UndoRedoData`] - the before/after row model shared by shredding and replay
//!
//! ## Design Principles
//!
//! - Stores hold `{ key, metadata, value, versionTag }` records
//! - Keys are unique per store
//! - Stores must be `Send + Sync`; every operation is `async`
//! - No store-level locking is assumed by callers
//!
//! ## Example
//!
//! ```rust
//! use offkit_store::{FindExpression, StoreManager};
//! use serde_json::json;
//!
//! # async fn demo() -> offkit_store::StoreResult<()> {
//! let manager = StoreManager::in_memory();
//! let store = manager.open_store("items").await?;
//! store.upsert("1", json!({}), json!({"name": "Widget"}), None).await?;
//!
//! let rows = store
//!     .find(&FindExpression::new().with_selector(json!({"value.name": "Widget"})))
//!     .await?;
//! assert_eq!(rows, vec![json!({"name": "Widget"})]);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod feed;
mod manager;
mod memory;
mod record;
mod store;
mod undo;

pub use error::{StoreError, StoreResult};
pub use feed::{StoreEvent, StoreFeed};
pub use manager::{StoreFactory, StoreManager, StoreOptions};
pub use memory::{InMemoryStore, InMemoryStoreFactory};
pub use record::{FindExpression, StoredRecord};
pub use store::PersistenceStore;
pub use undo::{RowOperation, UndoRedoData, UndoRedoRow};
