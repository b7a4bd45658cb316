//! Store lifecycle feed.
//!
//! The store feed emits an event whenever the [`StoreManager`] opens or
//! destroys a named store, enabling:
//! - Cooperative cancellation of a replay pass whose stores disappear
//! - Cache instances dropping in-memory state for deleted stores
//!
//! [`StoreManager`]: crate::StoreManager

use parking_lot::RwLock;
use std::sync::mpsc::{self, Receiver, Sender};

/// A store lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// A store was opened for the first time by the manager.
    Opened(String),
    /// A store was deleted wholesale.
    Destroyed(String),
}

impl StoreEvent {
    /// Returns the name of the store the event refers to.
    pub fn store_name(&self) -> &str {
        match self {
            StoreEvent::Opened(name) | StoreEvent::Destroyed(name) => name,
        }
    }
}

/// Distributes [`StoreEvent`]s to subscribers.
///
/// The feed:
/// - Preserves emission order
/// - Supports multiple subscribers
/// - Drops subscribers whose receiver was dropped
#[derive(Debug, Default)]
pub struct StoreFeed {
    subscribers: RwLock<Vec<Sender<StoreEvent>>>,
}

impl StoreFeed {
    /// Creates a new feed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to the feed.
    ///
    /// The receiver gets every event emitted after this call. Consumers in
    /// async code should poll it with `try_recv`.
    pub fn subscribe(&self) -> Receiver<StoreEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.write().push(tx);
        rx
    }

    /// Emits an event to all subscribers.
    pub fn emit(&self, event: StoreEvent) {
        let mut subscribers = self.subscribers.write();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}
