//! Deferred replay of queued mutations.

use serde::Serialize;
use sw_cache_core::{Error, Request};

use crate::worker::WorkerContext;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub replayed: usize,
    pub failed: usize,
    /// Queue length after the replay.
    pub remaining: u64,
}

/// Replay the pending queue when `tag` is the configured sync tag.
///
/// Returns `None` for any other tag.
pub async fn handle_sync(ctx: &WorkerContext, tag: &str) -> Result<Option<SyncReport>, Error> {
    if tag != ctx.config.sync_tag {
        tracing::debug!(tag, "ignoring unknown sync tag");
        return Ok(None);
    }
    replay_pending(ctx).await.map(Some)
}

/// Send every queued request again, oldest first.
///
/// A 2xx answer removes the entry. Anything else, including a network
/// failure, leaves it queued with its attempt counter bumped.
pub async fn replay_pending(ctx: &WorkerContext) -> Result<SyncReport, Error> {
    let queue = &ctx.config.pending_queue;
    let mut report = SyncReport::default();

    for entry in ctx.db.list_pending(queue).await? {
        let outcome = match ctx.fetcher.fetch(&entry.request).await {
            Ok(response) if response.ok() => Ok(()),
            Ok(response) => Err(format!("status {}", response.status)),
            Err(e) => Err(e.to_string()),
        };

        match outcome {
            Ok(()) => {
                if let Err(e) = ctx.db.remove_pending(entry.id).await {
                    tracing::warn!(id = entry.id, "replayed request could not be dequeued: {e}");
                }
                report.replayed += 1;
            }
            Err(reason) => {
                tracing::warn!(id = entry.id, url = %entry.request.url, attempts = entry.attempts + 1, "replay failed: {reason}");
                if let Err(e) = ctx.db.record_pending_failure(entry.id, &reason).await {
                    tracing::warn!(id = entry.id, "recording replay failure failed: {e}");
                }
                report.failed += 1;
            }
        }
    }

    report.remaining = ctx.db.count_pending(queue).await?;
    tracing::info!(replayed = report.replayed, failed = report.failed, remaining = report.remaining, "sync replay done");
    Ok(report)
}

/// Queue a mutating request for the next sync. GET requests are rejected.
pub async fn queue_mutation(ctx: &WorkerContext, request: &Request) -> Result<i64, Error> {
    if request.is_get() {
        return Err(Error::InvalidInput("only mutating requests can be queued".into()));
    }
    let id = ctx.db.enqueue_pending(&ctx.config.pending_queue, request).await?;
    tracing::debug!(id, url = %request.url, "mutation queued");
    Ok(id)
}
