//! # OffKit Sync
//!
//! The sync log and its replay engine.
//!
//! Mutating requests issued while offline are appended to a durable log
//! (together with the undo/redo data of their local effects) and replayed
//! against the network later, one at a time, writes before reads.
//!
//! This crate provides:
//! - [`SyncLog`] - insert/remove/update/list pending requests, undo/redo
//! - [`SyncManager`] - the replay state machine with listener hooks,
//!   reachability pre-checks and cancellation
//! - [`NetworkTransport`] - the seam to the network, with a
//!   [`MockTransport`] for tests
//!
//! ## Example
//!
//! ```rust
//! use offkit_http::HttpRequest;
//! use offkit_store::StoreManager;
//! use offkit_sync::{MockTransport, SyncConfig, SyncManager, SyncOptions};
//! use std::sync::Arc;
//!
//! # async fn demo() -> offkit_sync::SyncResult<()> {
//! let transport = Arc::new(MockTransport::new());
//! let manager = SyncManager::new(
//!     SyncConfig::default(),
//!     Arc::new(StoreManager::in_memory()),
//!     transport.clone(),
//! );
//!
//! manager
//!     .log()
//!     .insert_request(&HttpRequest::new("PUT", "https://api.example.com/items/1"), None)
//!     .await?;
//! let report = manager.sync(SyncOptions::new()).await?;
//! assert_eq!(report.replayed, 1);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod clock;
mod config;
mod error;
mod listener;
mod log;
mod state;
mod transport;

pub use clock::{Clock, ManualClock, RequestIdGenerator, SystemClock};
pub use config::{
    PreflightPolicy, SyncConfig, SyncOptions, DEFAULT_PREFLIGHT_TIMEOUT, DEFAULT_SYNC_LOG_STORE,
    DEFAULT_UNDO_REDO_STORE,
};
pub use error::{SyncError, SyncResult};
pub use listener::{Decision, FnListener, ListenerRegistry, SyncEvent, SyncEventType, SyncListener};
pub use log::{SyncLog, SyncLogEntry};
pub use state::{CancelHandle, SyncManager, SyncOutcome, SyncReport, SyncState, SyncStats};
pub use transport::{MockTransport, NetworkTransport};
