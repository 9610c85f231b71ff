//! Event bridge tools: sync, push, notification click, control messages and
//! mutation queueing.

use std::collections::BTreeMap;

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sw_cache_worker::{ControlMessage, ControlReply, Event, EventOutcome, Worker};
use tokio::sync::oneshot;

use super::fetch::build_request;
use super::json_result;
use crate::error::ToolError;

/// Parameters for the background_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SyncParams {
    /// Sync tag; only the configured tag replays the pending queue.
    pub tag: String,
}

/// Parameters for the push tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct PushParams {
    /// Raw push data, normally JSON with optional title, body and taskId.
    #[serde(default)]
    pub payload: Option<String>,
}

/// Parameters for the notification_click tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClickParams {
    /// Tag of the clicked notification.
    pub tag: String,
}

/// Parameters for the control_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MessageParams {
    /// JSON message, e.g. {"type":"CLEAR_CACHE"} or {"type":"SKIP_WAITING"}.
    pub message: String,
}

/// Output of the control_message tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageOutput {
    pub handled: bool,
    /// Reply sent over the channel, if the message kind replies.
    pub reply: Option<ControlReply>,
}

/// Parameters for the queue_mutation tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct QueueParams {
    /// Path or absolute URL of the failed request.
    pub url: String,

    /// HTTP method (default: POST). GET is rejected.
    #[serde(default = "default_method")]
    pub method: String,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// UTF-8 request body.
    #[serde(default)]
    pub body: Option<String>,
}

fn default_method() -> String {
    "POST".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueOutput {
    pub id: i64,
}

fn unexpected(outcome: EventOutcome) -> McpError {
    ToolError::Output(format!("unexpected worker outcome: {outcome:?}")).into()
}

/// Implementation of the background_sync tool.
pub async fn sync_impl(worker: &Worker, params: SyncParams) -> Result<CallToolResult, McpError> {
    match worker.dispatch(Event::Sync { tag: params.tag }).await? {
        EventOutcome::Synced(report) => json_result(&report),
        other => Err(unexpected(other)),
    }
}

/// Implementation of the push tool.
pub async fn push_impl(worker: &Worker, params: PushParams) -> Result<CallToolResult, McpError> {
    let data = params.payload.map(String::into_bytes);
    match worker.dispatch(Event::Push { data }).await? {
        EventOutcome::Notified(notification) => json_result(&notification),
        other => Err(unexpected(other)),
    }
}

/// Implementation of the notification_click tool.
pub async fn click_impl(worker: &Worker, params: ClickParams) -> Result<CallToolResult, McpError> {
    match worker.dispatch(Event::NotificationClick { tag: params.tag }).await? {
        EventOutcome::Clicked(outcome) => json_result(&outcome),
        other => Err(unexpected(other)),
    }
}

/// Implementation of the control_message tool.
pub async fn message_impl(worker: &Worker, params: MessageParams) -> Result<CallToolResult, McpError> {
    let message = ControlMessage::parse(&params.message)?;
    let (tx, rx) = oneshot::channel();

    worker.dispatch(Event::Message { message, reply: Some(tx) }).await?;

    // SKIP_WAITING drops the sender without replying.
    let reply = rx.await.ok();
    json_result(&MessageOutput { handled: true, reply })
}

/// Implementation of the queue_mutation tool.
pub async fn queue_impl(worker: &Worker, params: QueueParams) -> Result<CallToolResult, McpError> {
    let request = build_request(worker, &params.url, &params.method, params.headers, params.body)?;
    match worker.dispatch(Event::QueueMutation(request)).await? {
        EventOutcome::Queued(id) => json_result(&QueueOutput { id }),
        other => Err(unexpected(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{output, started_worker};
    use serde_json::Value;
    use sw_cache_core::Response;

    fn queue_params(url: &str, method: &str) -> QueueParams {
        QueueParams { url: url.into(), method: method.into(), headers: BTreeMap::new(), body: Some("{}".into()) }
    }

    #[tokio::test]
    async fn test_queue_then_sync() {
        let (worker, fetcher, _host) = started_worker().await;

        let out: QueueOutput = output(&queue_impl(&worker, queue_params("/upload", "POST")).await.unwrap());
        assert!(out.id > 0);

        let params = SyncParams { tag: "sync-uploads".into() };
        let out: Value = output(&sync_impl(&worker, params.clone()).await.unwrap());
        assert_eq!(out["failed"], 1);
        assert_eq!(out["remaining"], 1);

        fetcher.respond("/upload", Response::new(200, "{}"));
        let out: Value = output(&sync_impl(&worker, params).await.unwrap());
        assert_eq!(out["replayed"], 1);
        assert_eq!(out["remaining"], 0);
    }

    #[tokio::test]
    async fn test_unknown_sync_tag() {
        let (worker, _fetcher, _host) = started_worker().await;
        let out: Value = output(&sync_impl(&worker, SyncParams { tag: "other".into() }).await.unwrap());
        assert!(out.is_null());
    }

    #[tokio::test]
    async fn test_queue_rejects_get() {
        let (worker, _fetcher, _host) = started_worker().await;
        let err = queue_impl(&worker, queue_params("/upload", "GET")).await.unwrap_err();
        assert!(err.message.starts_with("INVALID_INPUT"));
    }

    #[tokio::test]
    async fn test_push_and_click() {
        let (worker, _fetcher, host) = started_worker().await;

        let params = PushParams { payload: Some(r#"{"title":"Done","taskId":"12"}"#.into()) };
        let out: Value = output(&push_impl(&worker, params).await.unwrap());
        assert_eq!(out["title"], "Done");
        assert_eq!(out["body"], "Image analysis is complete");
        assert_eq!(out["data"]["taskId"], "12");

        let out: Value = output(&click_impl(&worker, ClickParams { tag: "task-12".into() }).await.unwrap());
        assert_eq!(out["action"], "opened");
        assert!(host.notifications().await.is_empty());
    }

    #[tokio::test]
    async fn test_clear_cache_message_replies() {
        let (worker, _fetcher, _host) = started_worker().await;

        let params = MessageParams { message: r#"{"type":"CLEAR_CACHE"}"#.into() };
        let out: MessageOutput = output(&message_impl(&worker, params).await.unwrap());
        assert_eq!(out.reply, Some(ControlReply::ok()));
        assert!(worker.context().db.list_generations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_skip_waiting_message_has_no_reply() {
        let (worker, _fetcher, _host) = started_worker().await;

        let params = MessageParams { message: r#"{"type":"SKIP_WAITING"}"#.into() };
        let out: MessageOutput = output(&message_impl(&worker, params).await.unwrap());
        assert!(out.handled);
        assert!(out.reply.is_none());
    }

    #[tokio::test]
    async fn test_malformed_message_rejected() {
        let (worker, _fetcher, _host) = started_worker().await;
        let params = MessageParams { message: "CLEAR_CACHE".into() };
        assert!(message_impl(&worker, params).await.is_err());
    }
}
