//! Cache configuration.

/// Default name of the store holding cache bookkeeping documents.
pub const DEFAULT_BOOKKEEPING_STORE: &str = "offkit_cache_bookkeeping";

/// Configuration shared by every cache opened through a
/// [`CacheContext`](crate::CacheContext).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Store holding the per-cache list of shredded stores.
    pub bookkeeping_store: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            bookkeeping_store: DEFAULT_BOOKKEEPING_STORE.to_string(),
        }
    }
}

impl CacheConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the bookkeeping store name.
    #[must_use]
    pub fn with_bookkeeping_store(mut self, name: impl Into<String>) -> Self {
        self.bookkeeping_store = name.into();
        self
    }
}
