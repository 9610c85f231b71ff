//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the worker.
use crate::tools::{
    cache::{PendingListParams, pending_impl, status_impl},
    events::{
        ClickParams, MessageParams, PushParams, QueueParams, SyncParams, click_impl, message_impl, push_impl,
        queue_impl, sync_impl,
    },
    fetch::{FetchParams, fetch_impl},
    lifecycle::{RefreshParams, activate_impl, install_impl, refresh_impl, visibility_impl},
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use sw_cache_worker::Worker;

/// The main MCP server handler for sw-cache.
#[derive(Clone)]
pub struct SwCacheServer {
    worker: Worker,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl SwCacheServer {
    /// Create a new server handler around a booted worker.
    pub fn new(worker: Worker) -> Self {
        Self { worker, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Send a request through the worker. GET requests are answered cache-first or network-first; other methods pass through."
    )]
    async fn cache_fetch(&self, params: Parameters<FetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, params.0).await
    }

    #[tool(description = "Install: fetch every manifest asset and seed the worker's cache generation atomically.")]
    async fn worker_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.worker).await
    }

    #[tool(description = "Activate: delete every other cache generation and claim open clients.")]
    async fn worker_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.worker).await
    }

    #[tool(description = "Re-fetch every cached entry if the refresh interval elapsed, or always with force=true.")]
    async fn cache_refresh(&self, params: Parameters<RefreshParams>) -> Result<CallToolResult, McpError> {
        refresh_impl(&self.worker, params.0).await
    }

    #[tool(description = "Signal that a client became visible; refreshes the cache when due.")]
    async fn client_visible(&self) -> Result<CallToolResult, McpError> {
        visibility_impl(&self.worker).await
    }

    #[tool(description = "Fire a background sync. The configured tag replays queued mutations.")]
    async fn background_sync(&self, params: Parameters<SyncParams>) -> Result<CallToolResult, McpError> {
        sync_impl(&self.worker, params.0).await
    }

    #[tool(description = "Deliver a push message and show the resulting notification.")]
    async fn push(&self, params: Parameters<PushParams>) -> Result<CallToolResult, McpError> {
        push_impl(&self.worker, params.0).await
    }

    #[tool(description = "Click a notification: dismiss it, then focus or open an app window.")]
    async fn notification_click(&self, params: Parameters<ClickParams>) -> Result<CallToolResult, McpError> {
        click_impl(&self.worker, params.0).await
    }

    #[tool(description = "Post a control message (SKIP_WAITING or CLEAR_CACHE) and return the reply.")]
    async fn control_message(&self, params: Parameters<MessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.worker, params.0).await
    }

    #[tool(description = "Queue a mutating request that failed to send, for replay on the next sync.")]
    async fn queue_mutation(&self, params: Parameters<QueueParams>) -> Result<CallToolResult, McpError> {
        queue_impl(&self.worker, params.0).await
    }

    #[tool(description = "Report worker state, cache generations, pending queue length and last refresh.")]
    async fn cache_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.worker).await
    }

    #[tool(description = "List queued mutations with attempt counts and last errors.")]
    async fn pending_list(&self, params: Parameters<PendingListParams>) -> Result<CallToolResult, McpError> {
        pending_impl(&self.worker, params.0).await
    }
}

impl ServerHandler for SwCacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "sw-cache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::started_worker;

    #[tokio::test]
    async fn test_all_tools_listed() {
        let (worker, _fetcher, _host) = started_worker().await;
        let server = SwCacheServer::new(worker);

        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();
        assert_eq!(
            names,
            [
                "background_sync",
                "cache_fetch",
                "cache_refresh",
                "cache_status",
                "client_visible",
                "control_message",
                "notification_click",
                "pending_list",
                "push",
                "queue_mutation",
                "worker_activate",
                "worker_install",
            ]
        );
    }

    #[tokio::test]
    async fn test_server_info() {
        let (worker, _fetcher, _host) = started_worker().await;
        let info = SwCacheServer::new(worker).get_info();
        assert_eq!(info.server_info.name, "sw-cache");
    }
}
