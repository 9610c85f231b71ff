//! Control messages from foreground contexts.

use serde::{Deserialize, Serialize};
use sw_cache_core::Error;
use tokio::sync::oneshot;

use crate::lifecycle;
use crate::worker::WorkerContext;

/// Inbound control message, e.g. `{"type": "CLEAR_CACHE"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Activate without waiting.
    SkipWaiting,
    /// Delete every generation.
    ClearCache,
}

impl ControlMessage {
    pub fn parse(raw: &str) -> Result<Self, Error> {
        serde_json::from_str(raw).map_err(|e| Error::InvalidInput(format!("unrecognized control message: {e}")))
    }
}

/// Reply sent back over the sender's channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlReply {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ControlReply {
    pub fn ok() -> Self {
        Self { success: true, error: None }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { success: false, error: Some(error.into()) }
    }
}

pub type ReplyPort = oneshot::Sender<ControlReply>;

/// Handle a control message.
///
/// `SKIP_WAITING` never replies. `CLEAR_CACHE` always replies when a port is
/// given, with the failure reason if the store could not be cleared; the
/// error is not returned to the caller in that case.
pub async fn handle_message(ctx: &WorkerContext, message: ControlMessage, reply: Option<ReplyPort>) -> Result<(), Error> {
    match message {
        ControlMessage::SkipWaiting => {
            lifecycle::skip_waiting(ctx).await?;
            Ok(())
        }
        ControlMessage::ClearCache => {
            let outcome = clear_all(ctx).await;
            let answer = match &outcome {
                Ok(count) => {
                    tracing::info!(deleted = count, "all generations cleared");
                    ControlReply::ok()
                }
                Err(e) => {
                    tracing::warn!("clearing generations failed: {e}");
                    ControlReply::failed(e.to_string())
                }
            };

            match reply {
                Some(port) => {
                    if port.send(answer).is_err() {
                        tracing::debug!("control message sender went away before the reply");
                    }
                    Ok(())
                }
                None => outcome.map(|_| ()),
            }
        }
    }
}

async fn clear_all(ctx: &WorkerContext) -> Result<u64, Error> {
    let deleted = ctx.db.clear_generations().await?;
    ctx.db.clear_current_generation().await?;
    Ok(deleted)
}
