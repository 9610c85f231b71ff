//! MCP tool implementations.
//!
//! Each tool turns its parameters into a worker event, dispatches it and
//! returns the outcome as pretty-printed JSON text content.

pub mod cache;
pub mod events;
pub mod fetch;
pub mod lifecycle;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use crate::error::ToolError;

/// Serialize `output` as the single text content of a successful result.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| ToolError::Output(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
pub(crate) mod testing {
    //! A worker wired to an in-memory store and a canned network.

    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use rmcp::model::CallToolResult;
    use serde::de::DeserializeOwned;
    use sw_cache_core::{AppConfig, CacheDb, Error, Request, Response};
    use sw_cache_worker::{Fetcher, LocalHost, Worker};
    use url::Url;

    pub const ORIGIN: &str = "https://app.test/";

    /// Answers from a fixed table; everything else is treated as offline.
    #[derive(Default)]
    pub struct CannedFetcher {
        routes: Mutex<HashMap<String, Response>>,
    }

    impl CannedFetcher {
        pub fn respond(&self, path: &str, response: Response) {
            let url = Url::parse(ORIGIN).unwrap().join(path).unwrap();
            self.routes.lock().unwrap().insert(url.to_string(), response);
        }

        pub fn serve_manifest(&self, config: &AppConfig) {
            for url in config.manifest_urls().unwrap() {
                self.routes.lock().unwrap().insert(url.to_string(), Response::new(200, url.path().to_string()));
            }
        }
    }

    #[async_trait::async_trait]
    impl Fetcher for CannedFetcher {
        async fn fetch(&self, request: &Request) -> Result<Response, Error> {
            self.routes
                .lock()
                .unwrap()
                .get(request.url.as_str())
                .cloned()
                .ok_or_else(|| Error::Network(format!("unreachable: {}", request.url)))
        }
    }

    pub fn test_config() -> AppConfig {
        AppConfig { origin: Url::parse(ORIGIN).unwrap(), ..AppConfig::default() }
    }

    /// A worker that installed and activated against a reachable manifest.
    pub async fn started_worker() -> (Worker, Arc<CannedFetcher>, Arc<LocalHost>) {
        let config = test_config();
        let db = CacheDb::open_in_memory().await.unwrap();
        let fetcher = Arc::new(CannedFetcher::default());
        fetcher.serve_manifest(&config);
        let host = Arc::new(LocalHost::new());

        let worker = Worker::new(config, db, fetcher.clone(), host.clone());
        worker.start().await.unwrap();
        (worker, fetcher, host)
    }

    /// Decode the JSON text content of a tool result.
    pub fn output<T: DeserializeOwned>(result: &CallToolResult) -> T {
        let content = serde_json::to_value(&result.content[0]).unwrap();
        let text = content.get("text").and_then(|v| v.as_str()).expect("Expected text field in content");
        serde_json::from_str(text).unwrap()
    }
}
