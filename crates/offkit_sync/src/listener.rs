//! Replay events and listeners.

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use offkit_http::{HttpRequest, HttpResponse};
use parking_lot::RwLock;
use regex::Regex;
use std::fmt;
use std::sync::Arc;

/// The events emitted during replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncEventType {
    /// Before a request is dispatched.
    BeforeSyncRequest,
    /// After a request succeeded.
    SyncRequest,
}

impl SyncEventType {
    /// Returns the event name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncEventType::BeforeSyncRequest => "beforeSyncRequest",
            SyncEventType::SyncRequest => "syncRequest",
        }
    }
}

/// An event emitted during replay.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncEvent {
    /// Event type.
    pub event_type: SyncEventType,
    /// Sync log id of the request.
    pub request_id: String,
    /// The request.
    pub request: HttpRequest,
    /// The response, for [`SyncEventType::SyncRequest`].
    pub response: Option<HttpResponse>,
}

impl SyncEvent {
    /// Creates a `beforeSyncRequest` event.
    pub fn before_sync_request(request_id: impl Into<String>, request: HttpRequest) -> Self {
        Self {
            event_type: SyncEventType::BeforeSyncRequest,
            request_id: request_id.into(),
            request,
            response: None,
        }
    }

    /// Creates a `syncRequest` event.
    pub fn sync_request(
        request_id: impl Into<String>,
        request: HttpRequest,
        response: HttpResponse,
    ) -> Self {
        Self {
            event_type: SyncEventType::SyncRequest,
            request_id: request_id.into(),
            request,
            response: Some(response),
        }
    }
}

/// What a listener wants the engine to do with the current request.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// No opinion; later listeners are asked.
    Continue,
    /// Dispatch this request instead. Only valid before dispatch.
    Replay(HttpRequest),
    /// Drop the request from the log without dispatching it. Only valid
    /// before dispatch.
    Skip,
    /// End the pass, leaving the rest of the log untouched.
    Stop,
}

impl Decision {
    fn is_valid_for(&self, event_type: SyncEventType) -> bool {
        match self {
            Decision::Continue | Decision::Stop => true,
            Decision::Replay(_) | Decision::Skip => event_type == SyncEventType::BeforeSyncRequest,
        }
    }
}

/// Observes replay events and may steer the pass.
#[async_trait]
pub trait SyncListener: Send + Sync {
    /// Handles `event`.
    async fn on_event(&self, event: &SyncEvent) -> SyncResult<Decision>;
}

/// Adapts a closure into a [`SyncListener`].
pub struct FnListener<F> {
    f: F,
}

impl<F> FnListener<F>
where
    F: Fn(&SyncEvent) -> SyncResult<Decision> + Send + Sync,
{
    /// Wraps `f`.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F> SyncListener for FnListener<F>
where
    F: Fn(&SyncEvent) -> SyncResult<Decision> + Send + Sync,
{
    async fn on_event(&self, event: &SyncEvent) -> SyncResult<Decision> {
        (self.f)(event)
    }
}

impl<F> fmt::Debug for FnListener<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnListener").finish_non_exhaustive()
    }
}

struct Registration {
    event_type: SyncEventType,
    listener: Arc<dyn SyncListener>,
    scope: Option<Regex>,
}

impl Registration {
    fn applies_to(&self, event: &SyncEvent) -> bool {
        self.event_type == event.event_type
            && self
                .scope
                .as_ref()
                .map_or(true, |scope| scope.is_match(&event.request.url))
    }
}

fn same_listener(a: &Arc<dyn SyncListener>, b: &Arc<dyn SyncListener>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

/// Listeners in registration order.
///
/// A listener registered with a scope only sees requests whose URL matches
/// the scope pattern.
#[derive(Default)]
pub struct ListenerRegistry {
    registrations: RwLock<Vec<Registration>>,
}

impl ListenerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` for `event_type`, optionally limited to URLs
    /// matching `scope`.
    pub fn add(
        &self,
        event_type: SyncEventType,
        listener: Arc<dyn SyncListener>,
        scope: Option<&str>,
    ) -> SyncResult<()> {
        let scope = scope
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| SyncError::invalid_pattern(pattern, e.to_string()))
            })
            .transpose()?;
        self.registrations.write().push(Registration {
            event_type,
            listener,
            scope,
        });
        Ok(())
    }

    /// Removes the registration of `listener` for `event_type` and `scope`.
    ///
    /// Returns false if there was no such registration.
    pub fn remove(
        &self,
        event_type: SyncEventType,
        listener: &Arc<dyn SyncListener>,
        scope: Option<&str>,
    ) -> bool {
        let mut registrations = self.registrations.write();
        let position = registrations.iter().position(|r| {
            r.event_type == event_type
                && same_listener(&r.listener, listener)
                && r.scope.as_ref().map(Regex::as_str) == scope
        });
        match position {
            Some(index) => {
                registrations.remove(index);
                true
            }
            None => false,
        }
    }

    /// Returns the number of registrations.
    pub fn len(&self) -> usize {
        self.registrations.read().len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.registrations.read().is_empty()
    }

    /// Offers `event` to the matching listeners in registration order.
    ///
    /// The first decision other than [`Decision::Continue`] wins.
    ///
    /// # Errors
    ///
    /// Fails with [`SyncError::Listener`] when a listener returns a decision
    /// that is invalid for the event type, and propagates listener errors.
    pub async fn dispatch(&self, event: &SyncEvent) -> SyncResult<Decision> {
        let listeners: Vec<Arc<dyn SyncListener>> = self
            .registrations
            .read()
            .iter()
            .filter(|r| r.applies_to(event))
            .map(|r| Arc::clone(&r.listener))
            .collect();

        for listener in listeners {
            let decision = listener.on_event(event).await?;
            if !decision.is_valid_for(event.event_type) {
                return Err(SyncError::listener(format!(
                    "{decision:?} is not a valid answer to {}",
                    event.event_type.as_str()
                )));
            }
            if decision != Decision::Continue {
                return Ok(decision);
            }
        }
        Ok(Decision::Continue)
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("registrations", &self.len())
            .finish()
    }
}
