//! pending_list tool implementation.
//!
//! Lists queued mutations with their replay history.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sw_cache_worker::Worker;

use crate::tools::json_result;

/// Parameters for the pending_list tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct PendingListParams {
    /// Queue name (default: the configured pending queue).
    #[serde(default)]
    pub queue: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingItem {
    pub id: i64,
    pub method: String,
    pub url: String,
    pub enqueued_at: String,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub last_attempt_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingListOutput {
    pub queue: String,
    pub items: Vec<PendingItem>,
}

/// Implementation of the pending_list tool.
pub async fn pending_impl(worker: &Worker, params: PendingListParams) -> Result<CallToolResult, McpError> {
    let ctx = worker.context();
    let queue = params.queue.unwrap_or_else(|| ctx.config.pending_queue.clone());

    let items = ctx
        .db
        .list_pending(&queue)
        .await?
        .into_iter()
        .map(|p| PendingItem {
            id: p.id,
            method: p.request.method,
            url: p.request.url.to_string(),
            enqueued_at: p.enqueued_at,
            attempts: p.attempts,
            last_error: p.last_error,
            last_attempt_at: p.last_attempt_at,
        })
        .collect();

    json_result(&PendingListOutput { queue, items })
}
