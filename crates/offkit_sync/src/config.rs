//! Configuration for the sync engine.

use crate::error::{SyncError, SyncResult};
use regex::Regex;
use std::time::Duration;

/// Default name of the store holding pending requests.
pub const DEFAULT_SYNC_LOG_STORE: &str = "syncLog";

/// Default name of the store holding undo/redo data.
pub const DEFAULT_UNDO_REDO_STORE: &str = "redoUndoLog";

/// Default timeout of the reachability pre-check.
pub const DEFAULT_PREFLIGHT_TIMEOUT: Duration = Duration::from_secs(60);

/// Which requests get an `OPTIONS` reachability probe before replay.
#[derive(Debug, Clone, Default)]
pub enum PreflightPolicy {
    /// Never probe.
    #[default]
    Disabled,
    /// Probe requests whose URL matches the pattern.
    Matching(Regex),
}

impl PreflightPolicy {
    /// Creates a policy probing URLs that match `pattern`.
    pub fn matching(pattern: &str) -> SyncResult<Self> {
        Regex::new(pattern)
            .map(Self::Matching)
            .map_err(|e| SyncError::invalid_pattern(pattern, e.to_string()))
    }

    /// Returns true if requests to `url` should be probed.
    pub fn applies_to(&self, url: &str) -> bool {
        match self {
            PreflightPolicy::Disabled => false,
            PreflightPolicy::Matching(pattern) => pattern.is_match(url),
        }
    }
}

/// Configuration for the sync engine.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Store holding pending requests.
    pub sync_log_store: String,
    /// Store holding undo/redo data, keyed like the sync log.
    pub undo_redo_store: String,
    /// Pre-check policy used when a pass does not override it.
    pub preflight: PreflightPolicy,
    /// Pre-check timeout used when a pass does not override it.
    pub preflight_timeout: Duration,
}

impl SyncConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self {
            sync_log_store: DEFAULT_SYNC_LOG_STORE.to_string(),
            undo_redo_store: DEFAULT_UNDO_REDO_STORE.to_string(),
            preflight: PreflightPolicy::Disabled,
            preflight_timeout: DEFAULT_PREFLIGHT_TIMEOUT,
        }
    }

    /// Sets the sync log store name.
    pub fn with_sync_log_store(mut self, name: impl Into<String>) -> Self {
        self.sync_log_store = name.into();
        self
    }

    /// Sets the undo/redo store name.
    pub fn with_undo_redo_store(mut self, name: impl Into<String>) -> Self {
        self.undo_redo_store = name.into();
        self
    }

    /// Sets the pre-check policy.
    pub fn with_preflight(mut self, policy: PreflightPolicy) -> Self {
        self.preflight = policy;
        self
    }

    /// Sets the pre-check timeout.
    pub fn with_preflight_timeout(mut self, timeout: Duration) -> Self {
        self.preflight_timeout = timeout;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-pass overrides for [`SyncManager::sync`](crate::SyncManager::sync).
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Overrides the configured pre-check policy.
    pub preflight: Option<PreflightPolicy>,
    /// Overrides the configured pre-check timeout.
    pub preflight_timeout: Option<Duration>,
}

impl SyncOptions {
    /// Creates options that keep the configured behavior.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the pre-check policy.
    pub fn with_preflight(mut self, policy: PreflightPolicy) -> Self {
        self.preflight = Some(policy);
        self
    }

    /// Overrides the pre-check timeout.
    pub fn with_preflight_timeout(mut self, timeout: Duration) -> Self {
        self.preflight_timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_config_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.sync_log_store, "syncLog");
        assert_eq!(config.undo_redo_store, "redoUndoLog");
        assert_eq!(config.preflight_timeout, Duration::from_secs(60));
        assert!(!config.preflight.applies_to("https://api.test/items"));
    }

    #[test]
    fn sync_config_builder() {
        let config = SyncConfig::new()
            .with_sync_log_store("pending")
            .with_undo_redo_store("pendingUndo")
            .with_preflight(PreflightPolicy::matching(r"^https://api\.test/").unwrap())
            .with_preflight_timeout(Duration::from_secs(5));
        assert_eq!(config.sync_log_store, "pending");
        assert_eq!(config.undo_redo_store, "pendingUndo");
        assert!(config.preflight.applies_to("https://api.test/items"));
        assert!(!config.preflight.applies_to("https://cdn.test/a.png"));
        assert_eq!(config.preflight_timeout, Duration::from_secs(5));
    }

    #[test]
    fn invalid_preflight_pattern() {
        let err = PreflightPolicy::matching("(").unwrap_err();
        assert!(matches!(err, SyncError::InvalidPattern { .. }));
    }
}
