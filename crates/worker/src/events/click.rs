//! Notification click routing.

use serde::Serialize;
use sw_cache_core::Error;

use crate::host::ClientInfo;
use crate::worker::WorkerContext;

/// What a click did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "client", rename_all = "lowercase")]
pub enum ClickOutcome {
    Focused(ClientInfo),
    Opened(ClientInfo),
}

/// Dismiss the notification, then focus a window on the app origin or open
/// one at the root.
pub async fn handle_notification_click(ctx: &WorkerContext, tag: &str) -> Result<ClickOutcome, Error> {
    ctx.host.close_notification(tag).await?;

    let origin = ctx.config.origin.origin();
    let existing = ctx.host.window_clients().await?.into_iter().find(|client| client.url.origin() == origin);

    if let Some(client) = existing {
        let focused = ctx.host.focus(&client.id).await?;
        tracing::debug!(client = %focused.id, "focused existing client");
        return Ok(ClickOutcome::Focused(focused));
    }

    let root = ctx.config.origin.join("/").map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let opened = ctx.host.open_window(&root).await?;
    tracing::debug!(client = %opened.id, "opened new client");
    Ok(ClickOutcome::Opened(opened))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::push::handle_push;
    use crate::host::Host;
    use crate::testing::{active_worker, url};
    use ::url::Url;

    #[tokio::test]
    async fn test_focuses_matching_client() {
        let (worker, _fetcher, host) = active_worker().await;
        host.add_client(Url::parse("https://elsewhere.test/").unwrap()).await;
        let ours = host.add_client(url("/history")).await;

        let outcome = handle_notification_click(worker.context(), "task-1").await.unwrap();
        let ClickOutcome::Focused(client) = outcome else {
            panic!("expected focus");
        };
        assert_eq!(client.id, ours.id);
        assert!(client.focused);
        assert_eq!(host.window_clients().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_opens_root_when_no_client() {
        let (worker, _fetcher, host) = active_worker().await;
        host.add_client(Url::parse("https://elsewhere.test/").unwrap()).await;

        let outcome = handle_notification_click(worker.context(), "task-1").await.unwrap();
        let ClickOutcome::Opened(client) = outcome else {
            panic!("expected open");
        };
        assert_eq!(client.url, url("/"));
    }

    #[tokio::test]
    async fn test_notification_dismissed_first() {
        let (worker, _fetcher, host) = active_worker().await;
        let shown = handle_push(worker.context(), Some(br#"{"taskId":"5"}"#)).await.unwrap();

        handle_notification_click(worker.context(), &shown.tag).await.unwrap();
        assert!(host.notifications().await.is_empty());
    }
}
