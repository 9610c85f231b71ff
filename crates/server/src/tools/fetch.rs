//! cache_fetch tool implementation.
//!
//! Runs a request through the worker's interception path exactly as an
//! intercepted page request would.

use std::collections::BTreeMap;

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sw_cache_core::{Request, ResponseSource};
use sw_cache_worker::{FetchOutcome, Route, Worker, fetch::normalize};

use super::json_result;
use crate::error::ToolError;

/// Input parameters for cache_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FetchParams {
    /// Path or absolute URL; paths resolve against the app origin.
    pub url: String,

    /// HTTP method (default: GET). Anything else passes through untouched.
    #[serde(default = "default_method")]
    pub method: String,

    /// Request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// UTF-8 request body.
    #[serde(default)]
    pub body: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for cache_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FetchOutput {
    pub url: String,
    /// False when the worker let the request through without answering it.
    pub intercepted: bool,
    /// "cache-first" or "network-first" when intercepted.
    pub route: Option<String>,
    pub status: Option<u16>,
    /// "network", "cache" or "synthesized".
    pub source: Option<String>,
    pub headers: BTreeMap<String, String>,
    /// Body decoded as lossy UTF-8.
    pub body: Option<String>,
}

/// Build a worker request from tool parameters.
pub(crate) fn build_request(
    worker: &Worker, url: &str, method: &str, headers: BTreeMap<String, String>, body: Option<String>,
) -> Result<Request, ToolError> {
    if method.trim().is_empty() {
        return Err(ToolError::InvalidInput("method must not be empty".into()));
    }
    let url = normalize(url, &worker.context().config.origin)?;

    let mut request = Request::new(method.trim(), url);
    for (name, value) in &headers {
        request = request.with_header(name, value);
    }
    if let Some(body) = body {
        request = request.with_body(body.into_bytes());
    }
    Ok(request)
}

fn route_name(route: Route) -> &'static str {
    match route {
        Route::Ignore => "ignore",
        Route::NetworkFirst => "network-first",
        Route::CacheFirst => "cache-first",
    }
}

fn source_name(source: ResponseSource) -> &'static str {
    match source {
        ResponseSource::Network => "network",
        ResponseSource::Cache => "cache",
        ResponseSource::Synthesized => "synthesized",
    }
}

/// Implementation of the cache_fetch tool.
pub async fn fetch_impl(worker: &Worker, params: FetchParams) -> Result<CallToolResult, McpError> {
    let request = build_request(worker, &params.url, &params.method, params.headers, params.body)?;
    let url = request.url.to_string();

    let output = match worker.handle_fetch(request).await {
        FetchOutcome::PassThrough => FetchOutput {
            url,
            intercepted: false,
            route: None,
            status: None,
            source: None,
            headers: BTreeMap::new(),
            body: None,
        },
        FetchOutcome::Respond { route, response } => FetchOutput {
            url,
            intercepted: true,
            route: Some(route_name(route).to_string()),
            status: Some(response.status),
            source: Some(source_name(response.source).to_string()),
            body: Some(response.text()),
            headers: response.headers,
        },
    };

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{output, started_worker};
    use sw_cache_core::Response;

    fn params(url: &str, method: &str) -> FetchParams {
        FetchParams { url: url.into(), method: method.into(), headers: BTreeMap::new(), body: None }
    }

    #[tokio::test]
    async fn test_installed_asset_served_from_cache() {
        let (worker, _fetcher, _host) = started_worker().await;

        let result = fetch_impl(&worker, params("/static/main.js", "GET")).await.unwrap();
        let out: FetchOutput = output(&result);
        assert!(out.intercepted);
        assert_eq!(out.route.as_deref(), Some("cache-first"));
        assert_eq!(out.source.as_deref(), Some("cache"));
        assert_eq!(out.body.as_deref(), Some("/static/main.js"));
        worker.settle().await;
    }

    #[tokio::test]
    async fn test_post_passes_through() {
        let (worker, _fetcher, _host) = started_worker().await;

        let result = fetch_impl(&worker, params("/upload", "POST")).await.unwrap();
        let out: FetchOutput = output(&result);
        assert!(!out.intercepted);
        assert!(out.status.is_none());
    }

    #[tokio::test]
    async fn test_network_first_offline_miss() {
        let (worker, _fetcher, _host) = started_worker().await;

        let result = fetch_impl(&worker, params("/history", "GET")).await.unwrap();
        let out: FetchOutput = output(&result);
        assert_eq!(out.route.as_deref(), Some("network-first"));
        assert_eq!(out.status, Some(503));
        assert_eq!(out.source.as_deref(), Some("synthesized"));
    }

    #[tokio::test]
    async fn test_network_first_live() {
        let (worker, fetcher, _host) = started_worker().await;
        fetcher.respond("/history", Response::new(200, "[]"));

        let result = fetch_impl(&worker, params("/history", "GET")).await.unwrap();
        let out: FetchOutput = output(&result);
        assert_eq!(out.status, Some(200));
        assert_eq!(out.source.as_deref(), Some("network"));
    }

    #[tokio::test]
    async fn test_invalid_url_rejected() {
        let (worker, _fetcher, _host) = started_worker().await;
        assert!(fetch_impl(&worker, params("", "GET")).await.is_err());
        assert!(fetch_impl(&worker, params("ftp://files.test/a", "GET")).await.is_err());
    }
}
