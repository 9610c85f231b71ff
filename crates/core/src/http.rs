//! Request and response value types.
//!
//! These are plain snapshots: a [`Response`] can be cloned, stored and
//! served again any number of times, which is what lets the cache hand out
//! the same entry to concurrent readers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use url::Url;

use crate::Error;

/// Status used for every synthesized offline response.
pub const OFFLINE_STATUS: u16 = 503;

/// Body of the plain-text response returned when neither cache nor network can answer.
pub const OFFLINE_TEXT: &str = "Offline: this resource is not available in the cache";

/// An intercepted request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub method: String,
    pub url: Url,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Option<Vec<u8>>,
}

impl Request {
    /// Create a request with the given method, normalized to upper case.
    pub fn new(method: &str, url: Url) -> Self {
        Self { method: method.to_ascii_uppercase(), url, headers: BTreeMap::new(), body: None }
    }

    /// Shorthand for a GET request.
    pub fn get(url: Url) -> Self {
        Self::new("GET", url)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }
}

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Network,
    Cache,
    Synthesized,
}

/// A response snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Vec<u8>,
    pub source: ResponseSource,
}

impl Response {
    /// Create a network response with the given status and body.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self { status, headers: BTreeMap::new(), body: body.into(), source: ResponseSource::Network }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn with_source(mut self, source: ResponseSource) -> Self {
        self.source = source;
        self
    }

    /// JSON error body `{"error": ..., "offline": true}` with status 503.
    pub fn offline_json(message: &str) -> Self {
        let body = serde_json::json!({ "error": message, "offline": true }).to_string();
        Self::new(OFFLINE_STATUS, body)
            .with_header("content-type", "application/json")
            .with_source(ResponseSource::Synthesized)
    }

    /// Plain-text offline body with status 503.
    pub fn offline_text() -> Self {
        Self::new(OFFLINE_STATUS, OFFLINE_TEXT)
            .with_header("content-type", "text/plain; charset=utf-8")
            .with_source(ResponseSource::Synthesized)
    }

    /// Whether the status is in the 2xx range.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether this response may be written to the cache store.
    ///
    /// Partial (206) and every other non-200 response is excluded.
    pub fn is_cacheable(&self) -> bool {
        self.status == 200
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type").map(String::as_str)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        serde_json::from_slice(&self.body).map_err(|e| Error::InvalidInput(format!("response is not JSON: {e}")))
    }
}
