//! Network access for the worker.
//!
//! Strategies never talk to reqwest directly; they go through the
//! [`Fetcher`] trait so the lifecycle and strategies can be exercised
//! without a network.
//!
//! ### Error contract
//! - `Ok(response)` whenever the server answered, whatever the status.
//! - `Err(Error::Network)` only when no response arrived (offline, DNS,
//!   connection reset, timeout).

pub mod url;

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use bytes::Bytes;
use reqwest::{Client, Method};
use sw_cache_core::{AppConfig, Error, Request, Response};

pub use self::url::{UrlError, normalize};

/// Performs network requests on behalf of the worker.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Send the request and return whatever the server answered.
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "sw-cache/0.1")
    pub user_agent: String,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { user_agent: "sw-cache/0.1".to_string(), timeout: Duration::from_millis(20000), max_redirects: 5 }
    }
}

impl FetchConfig {
    pub fn from_app(config: &AppConfig) -> Self {
        Self { user_agent: config.user_agent.clone(), timeout: config.timeout(), ..Default::default() }
    }
}

/// HTTP fetch client backed by reqwest.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }
}

#[async_trait::async_trait]
impl Fetcher for FetchClient {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let start = Instant::now();
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid method {}: {e}", request.method)))?;

        let mut builder = self.http.request(method, request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Network(format!("timeout after {}ms: {}", self.config.timeout.as_millis(), request.url))
            } else {
                Error::Network(format!("{}: {e}", request.url))
            }
        })?;

        let status = response.status().as_u16();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
            .collect();

        let bytes: Bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("failed to read response: {e}")))?;

        tracing::debug!(
            "fetched {} {} -> {} in {}ms ({} bytes)",
            request.method,
            request.url,
            status,
            start.elapsed().as_millis(),
            bytes.len()
        );

        Ok(Response { headers, ..Response::new(status, bytes.to_vec()) })
    }
}
