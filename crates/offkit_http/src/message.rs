//! Request and response values.

use crate::body::Body;
use crate::error::HttpResult;
use crate::headers::Headers;
use crate::url::base_url;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Returns true for methods replay treats as reads (`GET`, `HEAD`).
pub fn is_read_only_method(method: &str) -> bool {
    method.eq_ignore_ascii_case("GET") || method.eq_ignore_ascii_case("HEAD")
}

/// An HTTP request.
///
/// The method is stored uppercased. The endpoint key is a per-call
/// attribute linking the request to endpoint-scoped options; it is never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpRequest {
    /// Request method, uppercased.
    pub method: String,
    /// Absolute URL.
    pub url: String,
    /// Headers.
    #[serde(default)]
    pub headers: Headers,
    /// Body.
    #[serde(default)]
    pub body: Body,
    #[serde(skip)]
    endpoint_key: Option<String>,
}

impl HttpRequest {
    /// Creates a request with no headers and no body.
    pub fn new(method: &str, url: impl Into<String>) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            url: url.into(),
            headers: Headers::new(),
            body: Body::Empty,
            endpoint_key: None,
        }
    }

    /// Creates a `GET` request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    /// Adds a header.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Sets the body.
    pub fn with_body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    /// Sets a JSON body and its content type.
    pub fn with_json(self, value: &Value) -> Self {
        self.with_header("Content-Type", "application/json")
            .with_body(Body::json(value))
    }

    /// Sets the endpoint key.
    pub fn with_endpoint_key(mut self, key: impl Into<String>) -> Self {
        self.endpoint_key = Some(key.into());
        self
    }

    /// Replaces the endpoint key.
    pub fn set_endpoint_key(&mut self, key: Option<String>) {
        self.endpoint_key = key;
    }

    /// Returns the endpoint key, if one is attached.
    pub fn endpoint_key(&self) -> Option<&str> {
        self.endpoint_key.as_deref()
    }

    /// Returns the URL without query string or fragment.
    pub fn base_url(&self) -> &str {
        base_url(&self.url)
    }

    /// Returns true for `GET` and `HEAD`.
    pub fn is_read_only(&self) -> bool {
        is_read_only_method(&self.method)
    }

    /// Encodes to the persisted JSON layout.
    pub fn to_json(&self) -> HttpResult<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Decodes from the persisted JSON layout.
    pub fn from_json(value: &Value) -> HttpResult<Self> {
        let mut request: Self = Self::deserialize(value)?;
        request.method = request.method.to_ascii_uppercase();
        Ok(request)
    }
}

/// An HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Status text.
    #[serde(default)]
    pub status_text: String,
    /// URL the response was served for.
    #[serde(default)]
    pub url: String,
    /// Headers.
    #[serde(default)]
    pub headers: Headers,
    /// Body.
    #[serde(default)]
    pub body: Body,
}

impl HttpResponse {
    /// Creates a response with the given status and no body.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            status_text: String::new(),
            url: String::new(),
            headers: Headers::new(),
            body: Body::Empty,
        }
    }

    /// Creates a `200 OK` response.
    pub fn ok() -> Self {
        Self::new(200).with_status_text("OK")
    }

    /// Sets the status text.
    pub fn with_status_text(mut self, text: impl Into<String>) -> Self {
        self.status_text = text.into();
        self
    }

    /// Sets the URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Adds a header.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Sets the body.
    pub fn with_body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    /// Sets a JSON body and its content type.
    pub fn with_json(self, value: &Value) -> Self {
        self.with_header("Content-Type", "application/json")
            .with_body(Body::json(value))
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns true for statuses of 400 and above.
    pub fn is_error(&self) -> bool {
        self.status >= 400
    }

    /// Encodes to the persisted JSON layout.
    pub fn to_json(&self) -> HttpResult<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Decodes from the persisted JSON layout.
    pub fn from_json(value: &Value) -> HttpResult<Self> {
        Ok(Self::deserialize(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_method_is_uppercased() {
        let request = HttpRequest::new("put", "https://api.test/items/1");
        assert_eq!(request.method, "PUT");
        assert!(!request.is_read_only());
        assert!(HttpRequest::new("head", "/").is_read_only());
    }

    #[test]
    fn request_round_trips_without_endpoint_key() {
        let request = HttpRequest::new("POST", "https://api.test/items?x=1")
            .with_json(&json!({"name": "Widget"}))
            .with_endpoint_key("ep-1");

        let encoded = request.to_json().unwrap();
        assert!(encoded.get("endpoint_key").is_none());
        assert_eq!(encoded["headers"]["content-type"], json!("application/json"));

        let decoded = HttpRequest::from_json(&encoded).unwrap();
        assert_eq!(decoded.endpoint_key(), None);
        assert_eq!(decoded.base_url(), "https://api.test/items");
        assert_eq!(decoded.body.to_json().unwrap(), json!({"name": "Widget"}));
    }

    #[test]
    fn request_decodes_minimal_layout() {
        let decoded = HttpRequest::from_json(&json!({"method": "delete", "url": "/a"})).unwrap();
        assert_eq!(decoded.method, "DELETE");
        assert!(decoded.headers.is_empty());
        assert!(decoded.body.is_empty());
    }

    #[test]
    fn response_layout() {
        let response = HttpResponse::ok()
            .with_url("https://api.test/items")
            .with_header("ETag", "\"v1\"")
            .with_json(&json!([1, 2]))
            .with_header("Cache-Control", "no-cache")
            .with_header("cache-control", "private");
        let encoded = response.to_json().unwrap();
        assert_eq!(encoded["status"], json!(200));
        assert_eq!(encoded["statusText"], json!("OK"));

        let decoded = HttpResponse::from_json(&encoded).unwrap();
        assert_eq!(decoded, response);
        assert_eq!(decoded.headers.get("cache-control").as_deref(), Some("no-cache, private"));
    }

    #[test]
    fn response_status_classes() {
        assert!(HttpResponse::new(204).is_success());
        assert!(!HttpResponse::new(304).is_error());
        assert!(HttpResponse::new(404).is_error());
        assert!(HttpResponse::new(500).is_error());
    }
}
