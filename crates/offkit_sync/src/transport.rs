//! Network transport abstraction.

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use offkit_http::{HttpRequest, HttpResponse};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Sends requests to the network.
///
/// This trait abstracts the network layer; the engine only needs to send a
/// request and to know whether the device is online.
#[async_trait]
pub trait NetworkTransport: Send + Sync {
    /// Sends `request` and returns the response.
    ///
    /// A response with an error status is still `Ok`; `Err` means no
    /// response was received.
    async fn send(&self, request: &HttpRequest) -> SyncResult<HttpResponse>;

    /// Returns false when the device is known to be offline.
    fn is_online(&self) -> bool {
        true
    }
}

enum Scripted {
    Respond(HttpResponse),
    Fail(String),
}

/// A mock transport for testing.
///
/// Responses are scripted per `(method, url)`; unscripted requests get the
/// default response (`200 OK` unless changed). Every request received is
/// recorded.
pub struct MockTransport {
    online: AtomicBool,
    scripted: Mutex<HashMap<(String, String), Scripted>>,
    default_response: Mutex<HttpResponse>,
    delay: Mutex<Option<Duration>>,
    sent: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    /// Creates a new mock transport that is online.
    pub fn new() -> Self {
        Self {
            online: AtomicBool::new(true),
            scripted: Mutex::new(HashMap::new()),
            default_response: Mutex::new(HttpResponse::ok()),
            delay: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Sets the response for `method url`.
    pub fn set_response(&self, method: &str, url: &str, response: HttpResponse) {
        self.scripted
            .lock()
            .insert(Self::route(method, url), Scripted::Respond(response));
    }

    /// Makes `method url` fail without a response.
    pub fn set_failure(&self, method: &str, url: &str, message: impl Into<String>) {
        self.scripted
            .lock()
            .insert(Self::route(method, url), Scripted::Fail(message.into()));
    }

    /// Sets the response for unscripted requests.
    pub fn set_default_response(&self, response: HttpResponse) {
        *self.default_response.lock() = response;
    }

    /// Delays every response by `delay`.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock() = delay;
    }

    /// Sets the online state.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Returns the requests received so far, in order.
    pub fn sent(&self) -> Vec<HttpRequest> {
        self.sent.lock().clone()
    }

    /// Returns `"METHOD url"` for every request received so far.
    pub fn sent_lines(&self) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .map(|r| format!("{} {}", r.method, r.url))
            .collect()
    }

    fn route(method: &str, url: &str) -> (String, String) {
        (method.to_ascii_uppercase(), url.to_string())
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NetworkTransport for MockTransport {
    async fn send(&self, request: &HttpRequest) -> SyncResult<HttpResponse> {
        self.sent.lock().push(request.clone());
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if !self.is_online() {
            return Err(SyncError::transport_retryable("network unreachable"));
        }
        let route = Self::route(&request.method, &request.url);
        let reply = match self.scripted.lock().get(&route) {
            Some(Scripted::Respond(response)) => Ok(response.clone()),
            Some(Scripted::Fail(message)) => Err(SyncError::transport_fatal(message.clone())),
            None => Ok(self.default_response.lock().clone()),
        };
        reply.map(|response| {
            if response.url.is_empty() {
                response.with_url(request.url.clone())
            } else {
                response
            }
        })
    }

    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("online", &self.is_online())
            .field("sent", &self.sent.lock().len())
            .finish()
    }
}
