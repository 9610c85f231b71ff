//! Lifecycle tools: install, activate, refresh and visibility.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sw_cache_worker::{Event, EventOutcome, RefreshReport, RefreshTrigger, Worker};

use super::json_result;
use crate::error::ToolError;

/// Parameters for the cache_refresh tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct RefreshParams {
    /// Refresh even if the last run is within the refresh interval.
    #[serde(default)]
    pub force: bool,
}

/// Output of the refresh and visibility tools.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshOutput {
    /// False when the refresh was not due or the worker is inactive.
    pub ran: bool,
    #[serde(flatten)]
    pub report: Option<RefreshReport>,
}

fn unexpected(outcome: EventOutcome) -> McpError {
    ToolError::Output(format!("unexpected worker outcome: {outcome:?}")).into()
}

/// Implementation of the worker_install tool.
pub async fn install_impl(worker: &Worker) -> Result<CallToolResult, McpError> {
    match worker.dispatch(Event::Install).await? {
        EventOutcome::Installed(report) => json_result(&report),
        other => Err(unexpected(other)),
    }
}

/// Implementation of the worker_activate tool.
pub async fn activate_impl(worker: &Worker) -> Result<CallToolResult, McpError> {
    match worker.dispatch(Event::Activate).await? {
        EventOutcome::Activated(report) => json_result(&report),
        other => Err(unexpected(other)),
    }
}

async fn refresh_with(worker: &Worker, trigger: RefreshTrigger) -> Result<CallToolResult, McpError> {
    match worker.dispatch(Event::Refresh(trigger)).await? {
        EventOutcome::Refreshed(report) => json_result(&RefreshOutput { ran: report.is_some(), report }),
        other => Err(unexpected(other)),
    }
}

/// Implementation of the cache_refresh tool.
pub async fn refresh_impl(worker: &Worker, params: RefreshParams) -> Result<CallToolResult, McpError> {
    let trigger = if params.force { RefreshTrigger::Manual } else { RefreshTrigger::Timer };
    refresh_with(worker, trigger).await
}

/// Implementation of the client_visible tool.
pub async fn visibility_impl(worker: &Worker) -> Result<CallToolResult, McpError> {
    refresh_with(worker, RefreshTrigger::Visible).await
}
