//! Message bodies.

use crate::error::{HttpError, HttpResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The body of a request or response.
///
/// Persisted as `"empty"`, `{"text": ..}`, `{"binary": <base64>}` or
/// `{"formData": [[name, value], ..]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Body {
    /// No body.
    #[default]
    Empty,
    /// UTF-8 text.
    Text(String),
    /// Raw bytes.
    Binary(#[serde(with = "base64_bytes")] Vec<u8>),
    /// Multipart form fields, in order.
    FormData(Vec<(String, String)>),
}

impl Body {
    /// Creates a text body holding serialized JSON.
    pub fn json(value: &Value) -> Self {
        Body::Text(value.to_string())
    }

    /// Returns true for [`Body::Empty`].
    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }

    /// Returns the body as text, if it is text or valid UTF-8 bytes.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Body::Text(text) => Some(text),
            Body::Binary(bytes) => std::str::from_utf8(bytes).ok(),
            _ => None,
        }
    }

    /// Parses the body as JSON.
    ///
    /// # Errors
    ///
    /// Fails for empty or form bodies and for text that is not JSON.
    pub fn to_json(&self) -> HttpResult<Value> {
        let text = self
            .as_text()
            .ok_or_else(|| HttpError::invalid_body("body is not text"))?;
        Ok(serde_json::from_str(text)?)
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
