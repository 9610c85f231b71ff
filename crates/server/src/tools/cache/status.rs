//! cache_status tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use sw_cache_worker::Worker;

use crate::tools::json_result;

/// Implementation of the cache_status tool.
pub async fn status_impl(worker: &Worker) -> Result<CallToolResult, McpError> {
    let status = worker.status().await?;
    json_result(&status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{output, started_worker};
    use serde_json::Value;

    #[tokio::test]
    async fn test_status_after_start() {
        let (worker, _fetcher, _host) = started_worker().await;

        let out: Value = output(&status_impl(&worker).await.unwrap());
        assert_eq!(out["state"], "activated");
        assert!(out["state_changed_at"].is_string());
        assert_eq!(out["current_generation"], "study-support-v2");
        assert_eq!(out["generations"][0]["entry_count"], 6);
        assert_eq!(out["pending_mutations"], 0);
        assert!(out["last_refresh"].is_null());
    }
}
