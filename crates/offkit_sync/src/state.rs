//! Replay engine state machine.

use crate::clock::{Clock, SystemClock};
use crate::config::{SyncConfig, SyncOptions};
use crate::error::{SyncError, SyncResult};
use crate::listener::{Decision, ListenerRegistry, SyncEvent, SyncEventType, SyncListener};
use crate::log::SyncLog;
use crate::transport::NetworkTransport;
use offkit_http::HttpRequest;
use offkit_store::{StoreEvent, StoreManager};
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// The current state of the replay engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No pass is running.
    Idle,
    /// A pass is replaying the log.
    Syncing,
}

impl SyncState {
    /// Returns true while a pass is running.
    pub fn is_active(&self) -> bool {
        matches!(self, SyncState::Syncing)
    }
}

/// How a replay pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The log was exhausted.
    Completed,
    /// A listener stopped the pass.
    Stopped,
    /// The pass was cancelled.
    Cancelled,
    /// The pass failed.
    Failed,
}

/// Statistics about replay passes.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Passes started.
    pub passes_started: u64,
    /// Passes that ended without error (completed or stopped).
    pub passes_completed: u64,
    /// Requests dispatched successfully.
    pub requests_replayed: u64,
    /// Requests dropped by a `Skip` decision.
    pub requests_skipped: u64,
    /// Outcome of the last pass.
    pub last_outcome: Option<SyncOutcome>,
    /// End time of the last pass.
    pub last_sync_time: Option<Instant>,
    /// Last error message.
    pub last_error: Option<String>,
}

/// Result of a replay pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Requests dispatched successfully.
    pub replayed: u64,
    /// Requests dropped by a `Skip` decision.
    pub skipped: u64,
    /// Whether a listener stopped the pass.
    pub stopped: bool,
    /// Duration of the pass.
    pub duration: Duration,
}

/// Requests cancellation of a running pass from anywhere.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Cancels the running pass at its next checkpoint.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }
}

/// Clears the in-flight flag and returns to idle when a pass ends,
/// however it ends.
struct PassGuard<'a> {
    manager: &'a SyncManager,
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.manager.set_state(SyncState::Idle);
        self.manager.syncing.store(false, Ordering::SeqCst);
    }
}

/// Owns the sync log and replays it against the network.
///
/// Entries are replayed strictly one at a time: every non-`GET`/`HEAD`
/// request first, then reads, each group in creation order. A request
/// with status >= 400 or a transport failure ends the pass; nothing is
/// retried. Listeners observe each request before and after dispatch and
/// may skip, substitute or stop.
pub struct SyncManager {
    config: SyncConfig,
    log: SyncLog,
    transport: Arc<dyn NetworkTransport>,
    listeners: ListenerRegistry,
    state: RwLock<SyncState>,
    stats: RwLock<SyncStats>,
    syncing: AtomicBool,
    cancelled: Arc<AtomicBool>,
    store_events: Mutex<Receiver<StoreEvent>>,
}

impl SyncManager {
    /// Creates a manager using the system clock.
    pub fn new(
        config: SyncConfig,
        stores: Arc<StoreManager>,
        transport: Arc<dyn NetworkTransport>,
    ) -> Self {
        Self::with_clock(config, stores, transport, Arc::new(SystemClock))
    }

    /// Creates a manager whose request ids come from `clock`.
    pub fn with_clock(
        config: SyncConfig,
        stores: Arc<StoreManager>,
        transport: Arc<dyn NetworkTransport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let store_events = Mutex::new(stores.subscribe());
        Self {
            log: SyncLog::new(stores, &config, clock),
            config,
            transport,
            listeners: ListenerRegistry::new(),
            state: RwLock::new(SyncState::Idle),
            stats: RwLock::new(SyncStats::default()),
            syncing: AtomicBool::new(false),
            cancelled: Arc::new(AtomicBool::new(false)),
            store_events,
        }
    }

    /// Returns the sync log.
    pub fn log(&self) -> &SyncLog {
        &self.log
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Gets the current state.
    pub fn state(&self) -> SyncState {
        *self.state.read()
    }

    /// Gets the current stats.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Registers a listener for `event_type`, optionally limited to request
    /// URLs matching the `scope` pattern.
    pub fn add_event_listener(
        &self,
        event_type: SyncEventType,
        listener: Arc<dyn SyncListener>,
        scope: Option<&str>,
    ) -> SyncResult<()> {
        self.listeners.add(event_type, listener, scope)
    }

    /// Removes a listener registration; returns whether one was removed.
    pub fn remove_event_listener(
        &self,
        event_type: SyncEventType,
        listener: &Arc<dyn SyncListener>,
        scope: Option<&str>,
    ) -> bool {
        self.listeners.remove(event_type, listener, scope)
    }

    /// Cancels any ongoing pass.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns a handle that cancels passes of this manager.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            flag: Arc::clone(&self.cancelled),
        }
    }

    /// Resets the cancelled flag.
    fn reset_cancel(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    /// Fails with [`SyncError::Cancelled`] if the pass was cancelled or one
    /// of the log stores was destroyed.
    fn check_cancelled(&self) -> SyncResult<()> {
        let destroyed = self.drain_store_events();
        if destroyed {
            warn!("sync log store destroyed during replay");
            self.cancel();
        }
        if self.cancelled.load(Ordering::SeqCst) {
            Err(SyncError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Consumes pending store events; returns true if a log store was
    /// destroyed.
    fn drain_store_events(&self) -> bool {
        let events = self.store_events.lock();
        let mut destroyed = false;
        while let Ok(event) = events.try_recv() {
            if let StoreEvent::Destroyed(name) = &event {
                if *name == self.log.log_store_name() || *name == self.log.undo_store_name() {
                    destroyed = true;
                }
            }
        }
        destroyed
    }

    /// Sets the state.
    fn set_state(&self, state: SyncState) {
        *self.state.write() = state;
    }

    /// Replays the sync log.
    ///
    /// # Errors
    ///
    /// - [`SyncError::AlreadySyncing`] if a pass is running
    /// - [`SyncError::Offline`] if the transport reports no connectivity
    /// - [`SyncError::Cancelled`] on cancellation
    /// - [`SyncError::RequestFailed`] / [`SyncError::PreflightFailed`] when
    ///   a request cannot be replayed; it stays in the log
    pub async fn sync(&self, options: SyncOptions) -> SyncResult<SyncReport> {
        if self
            .syncing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SyncError::AlreadySyncing);
        }
        let _guard = PassGuard { manager: self };

        if !self.transport.is_online() {
            debug!("not syncing while offline");
            return Err(SyncError::Offline);
        }

        // Events from before this pass must not cancel it.
        self.drain_store_events();
        self.reset_cancel();
        self.set_state(SyncState::Syncing);
        self.stats.write().passes_started += 1;

        let start = Instant::now();
        let result = self.replay(&options).await;
        let duration = start.elapsed();

        let outcome = match &result {
            Ok(report) if report.stopped => SyncOutcome::Stopped,
            Ok(_) => SyncOutcome::Completed,
            Err(SyncError::Cancelled) => SyncOutcome::Cancelled,
            Err(_) => SyncOutcome::Failed,
        };
        {
            let mut stats = self.stats.write();
            stats.last_outcome = Some(outcome);
            stats.last_sync_time = Some(Instant::now());
            match &result {
                Ok(report) => {
                    stats.passes_completed += 1;
                    stats.requests_replayed += report.replayed;
                    stats.requests_skipped += report.skipped;
                    stats.last_error = None;
                }
                Err(e) => stats.last_error = Some(e.to_string()),
            }
        }

        match result {
            Ok(mut report) => {
                report.duration = duration;
                info!(
                    replayed = report.replayed,
                    skipped = report.skipped,
                    stopped = report.stopped,
                    ?duration,
                    "sync pass finished"
                );
                Ok(report)
            }
            Err(e) => {
                warn!(error = %e, ?outcome, "sync pass failed");
                Err(e)
            }
        }
    }

    async fn replay(&self, options: &SyncOptions) -> SyncResult<SyncReport> {
        let preflight = options.preflight.as_ref().unwrap_or(&self.config.preflight);
        let timeout = options
            .preflight_timeout
            .unwrap_or(self.config.preflight_timeout);

        let mut entries = self.log.get_sync_log().await?;
        // Stable: creation order is kept within each group.
        entries.sort_by_key(|entry| entry.request().is_read_only());

        let mut reachable: HashSet<String> = HashSet::new();
        let mut report = SyncReport::default();

        for entry in entries {
            self.check_cancelled()?;
            let request_id = entry.request_id().to_string();
            let url = entry.request().url.clone();

            if !reachable.contains(&url) && preflight.applies_to(&url) {
                self.preflight(&request_id, &url, timeout).await?;
                reachable.insert(url);
            }

            let event = SyncEvent::before_sync_request(&request_id, entry.request().clone());
            let request = match self.listeners.dispatch(&event).await? {
                Decision::Continue => event.request,
                Decision::Replay(substitute) => {
                    debug!(request_id = %request_id, url = %substitute.url, "replaying substitute request");
                    substitute
                }
                Decision::Skip => {
                    self.check_cancelled()?;
                    self.log.remove_request(&request_id).await?;
                    report.skipped += 1;
                    debug!(request_id = %request_id, "skipped request");
                    continue;
                }
                Decision::Stop => {
                    info!(request_id = %request_id, "listener stopped sync before dispatch");
                    report.stopped = true;
                    break;
                }
            };

            let response = match self.transport.send(&request).await {
                Ok(response) => response,
                Err(e) => {
                    return Err(SyncError::RequestFailed {
                        request_id,
                        request: Box::new(request),
                        response: None,
                        message: e.to_string(),
                    })
                }
            };
            if response.is_error() {
                let message = format!("status {} {}", response.status, response.status_text);
                return Err(SyncError::RequestFailed {
                    request_id,
                    request: Box::new(request),
                    response: Some(Box::new(response)),
                    message: message.trim_end().to_string(),
                });
            }
            report.replayed += 1;

            let event = SyncEvent::sync_request(&request_id, request, response);
            if self.listeners.dispatch(&event).await? == Decision::Stop {
                info!(request_id = %request_id, "listener stopped sync after dispatch");
                report.stopped = true;
                break;
            }

            self.check_cancelled()?;
            self.log.remove_request(&request_id).await?;
            debug!(request_id = %request_id, "replayed request");
        }
        Ok(report)
    }

    async fn preflight(&self, request_id: &str, url: &str, timeout: Duration) -> SyncResult<()> {
        let probe = HttpRequest::new("OPTIONS", url);
        let failure = |message: String| SyncError::PreflightFailed {
            request_id: request_id.to_string(),
            url: url.to_string(),
            message,
        };
        match tokio::time::timeout(timeout, self.transport.send(&probe)).await {
            Ok(Ok(_)) => {
                debug!(url, "pre-check passed");
                Ok(())
            }
            Ok(Err(e)) => Err(failure(e.to_string())),
            Err(_) => Err(failure(format!("timed out after {timeout:?}"))),
        }
    }
}

impl std::fmt::Debug for SyncManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncManager")
            .field("state", &self.state())
            .field("log", &self.log)
            .field("listeners", &self.listeners)
            .finish()
    }
}
