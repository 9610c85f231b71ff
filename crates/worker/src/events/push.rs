//! Push payload to system notification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sw_cache_core::{AppConfig, Error};

use crate::host::{Notification, NotificationData};
use crate::worker::WorkerContext;

pub const DEFAULT_TITLE: &str = "Analysis complete";
pub const DEFAULT_BODY: &str = "Image analysis is complete";

/// Fields a push message may carry. All are optional, and a field of the
/// wrong type is dropped on its own without affecting the others.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushPayload {
    #[serde(default, deserialize_with = "text_lenient")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "text_lenient")]
    pub body: Option<String>,
    /// Accepts a string or a number.
    #[serde(default, deserialize_with = "task_id_lenient")]
    pub task_id: Option<String>,
}

fn text_lenient<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        _ => None,
    })
}

fn task_id_lenient<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

impl PushPayload {
    /// Parse raw push data. Missing, empty or malformed data yields an
    /// empty payload so the notification falls back to defaults.
    pub fn parse(data: Option<&[u8]>) -> Self {
        let Some(bytes) = data.filter(|b| !b.is_empty()) else {
            return Self::default();
        };
        serde_json::from_slice(bytes).unwrap_or_else(|e| {
            tracing::warn!("push payload is not valid JSON, using defaults: {e}");
            Self::default()
        })
    }
}

/// Build the notification shown for `payload` at `now`.
pub fn build_notification(payload: PushPayload, config: &AppConfig, now: DateTime<Utc>) -> Notification {
    let timestamp = now.timestamp_millis();
    let tag = match &payload.task_id {
        Some(id) => format!("task-{id}"),
        None => format!("push-{timestamp}"),
    };

    Notification {
        tag,
        title: payload.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        body: payload.body.unwrap_or_else(|| DEFAULT_BODY.to_string()),
        icon: config.notification_icon.clone(),
        badge: config.notification_badge.clone(),
        data: NotificationData { task_id: payload.task_id, timestamp },
    }
}

pub async fn handle_push(ctx: &WorkerContext, data: Option<&[u8]>) -> Result<Notification, Error> {
    let notification = build_notification(PushPayload::parse(data), &ctx.config, Utc::now());
    ctx.host.show_notification(&notification).await?;
    tracing::info!(tag = %notification.tag, "notification shown");
    Ok(notification)
}
