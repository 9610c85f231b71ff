//! Generation lifecycle: install, activate and periodic refresh.
//!
//! Install seeds the worker's generation from the manifest in one atomic
//! write. Activate prunes every other generation, records this one as
//! current and claims open clients. Refresh re-fetches every stored key and
//! overwrites only on a 200.

mod schedule;
mod state;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::Serialize;
use sw_cache_core::{Error, Request};

use crate::worker::WorkerContext;

pub use schedule::{RefreshSchedule, RefreshTrigger};
pub use state::{Lifecycle, WorkerState};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub generation: String,
    pub entries: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivateReport {
    pub current: String,
    /// Generations removed during activation.
    pub deleted: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    pub refreshed: usize,
    /// Keys whose fetch or store write failed; their stale entries are kept.
    pub failed: usize,
    /// Keys that answered with a non-200 status.
    pub skipped: usize,
}

/// Seed the generation from the manifest.
///
/// All manifest assets must answer 200 or nothing is written and the worker
/// becomes redundant. On success the worker asks to skip waiting.
pub async fn install(ctx: &WorkerContext) -> Result<InstallReport, Error> {
    ctx.lifecycle.write().await.transition(WorkerState::Installing)?;

    let entries = match seed_manifest(ctx).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(generation = ctx.generation(), "install failed: {e}");
            ctx.lifecycle.write().await.transition(WorkerState::Redundant)?;
            return Err(match e {
                Error::InstallFailed(_) => e,
                other => Error::InstallFailed(other.to_string()),
            });
        }
    };

    {
        let mut lifecycle = ctx.lifecycle.write().await;
        lifecycle.transition(WorkerState::Installed)?;
        lifecycle.request_skip_waiting();
    }
    if let Err(e) = ctx.host.skip_waiting().await {
        tracing::warn!("skip waiting refused by host: {e}");
    }

    tracing::info!(generation = ctx.generation(), entries, "install complete");
    Ok(InstallReport { generation: ctx.generation().to_string(), entries })
}

async fn seed_manifest(ctx: &WorkerContext) -> Result<usize, Error> {
    let urls = ctx.config.manifest_urls().map_err(|e| Error::InstallFailed(e.to_string()))?;
    let requests: Vec<Request> = urls.into_iter().map(Request::get).collect();

    let responses = join_all(requests.iter().map(|request| ctx.fetcher.fetch(request))).await;

    let mut entries = Vec::with_capacity(requests.len());
    for (request, response) in requests.into_iter().zip(responses) {
        let response = response.map_err(|e| Error::InstallFailed(format!("{}: {e}", request.url)))?;
        if !response.is_cacheable() {
            return Err(Error::InstallFailed(format!("{}: status {}", request.url, response.status)));
        }
        entries.push((request, response));
    }

    ctx.db.put_entries(ctx.generation(), &entries).await?;
    Ok(entries.len())
}

/// Promote the worker's generation to current and delete all others.
pub async fn activate(ctx: &WorkerContext) -> Result<ActivateReport, Error> {
    ctx.lifecycle.write().await.transition(WorkerState::Activating)?;
    let generation = ctx.generation();

    let deleted = match ctx.db.promote_generation(generation).await {
        Ok(deleted) => deleted,
        Err(e) => {
            tracing::warn!(generation, "activation failed: {e}");
            ctx.lifecycle.write().await.transition(WorkerState::Redundant)?;
            return Err(e);
        }
    };
    for name in &deleted {
        tracing::info!(generation = %name, "deleted stale generation");
    }

    if let Err(e) = ctx.host.claim().await {
        tracing::warn!("claiming clients failed: {e}");
    }

    ctx.lifecycle.write().await.transition(WorkerState::Activated)?;
    Ok(ActivateReport { current: generation.to_string(), deleted })
}

/// Record a skip-waiting request; activates immediately when installed.
pub async fn skip_waiting(ctx: &WorkerContext) -> Result<Option<ActivateReport>, Error> {
    let state = {
        let mut lifecycle = ctx.lifecycle.write().await;
        lifecycle.request_skip_waiting();
        lifecycle.state()
    };
    if let Err(e) = ctx.host.skip_waiting().await {
        tracing::warn!("skip waiting refused by host: {e}");
    }

    if state == WorkerState::Installed {
        activate(ctx).await.map(Some)
    } else {
        tracing::debug!(%state, "skip waiting recorded");
        Ok(None)
    }
}

/// Re-fetch every stored key of the generation.
///
/// Best effort: a failed fetch or a failed write leaves the stale entry in
/// place. The run is recorded even when individual keys failed.
pub async fn refresh(ctx: &WorkerContext) -> Result<RefreshReport, Error> {
    let generation = ctx.generation();
    let keys = ctx.db.entry_keys(generation).await?;
    let mut report = RefreshReport::default();

    for request in keys {
        match ctx.fetcher.fetch(&request).await {
            Ok(response) if response.is_cacheable() => match ctx.db.put_entry(generation, &request, &response).await {
                Ok(()) => report.refreshed += 1,
                Err(e) => {
                    tracing::warn!(url = %request.url, "refresh write failed: {e}");
                    report.failed += 1;
                }
            },
            Ok(response) => {
                tracing::debug!(url = %request.url, status = response.status, "refresh skipped");
                report.skipped += 1;
            }
            Err(e) => {
                tracing::warn!(url = %request.url, "refresh fetch failed: {e}");
                report.failed += 1;
            }
        }
    }

    ctx.db.set_last_refresh(Utc::now()).await?;
    tracing::info!(generation, refreshed = report.refreshed, failed = report.failed, "refresh complete");
    Ok(report)
}

/// Refresh if the worker is active and `trigger` calls for it at `now`.
pub async fn refresh_if_due(
    ctx: &WorkerContext, trigger: RefreshTrigger, now: DateTime<Utc>,
) -> Result<Option<RefreshReport>, Error> {
    let state = ctx.state().await;
    if !state.can_intercept() {
        tracing::debug!(%state, "refresh ignored while inactive");
        return Ok(None);
    }

    let last = ctx.db.last_refresh().await?;
    if !RefreshSchedule::from_config(&ctx.config).should_run(trigger, last, now) {
        return Ok(None);
    }
    refresh(ctx).await.map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockFetcher, active_worker, get, new_worker};
    use chrono::TimeDelta;
    use sw_cache_core::Response;

    #[tokio::test]
    async fn test_install_seeds_exact_manifest() {
        let (worker, fetcher, host) = new_worker().await;
        let ctx = worker.context();
        MockFetcher::serve_manifest(&fetcher, &ctx.config);

        let report = install(ctx).await.unwrap();
        assert_eq!(report.entries, ctx.config.manifest.len());
        assert_eq!(ctx.db.count_entries(ctx.generation()).await.unwrap(), 6);

        let mut stored: Vec<String> =
            ctx.db.entry_keys(ctx.generation()).await.unwrap().into_iter().map(|r| r.url.to_string()).collect();
        let mut expected: Vec<String> =
            ctx.config.manifest_urls().unwrap().into_iter().map(|u| u.to_string()).collect();
        stored.sort();
        expected.sort();
        assert_eq!(stored, expected);

        assert_eq!(ctx.state().await, WorkerState::Installed);
        assert_eq!(host.skip_waiting_calls(), 1);
        assert!(ctx.db.current_generation().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_install_failure_is_atomic() {
        let (worker, fetcher, _host) = new_worker().await;
        let ctx = worker.context();
        ctx.db.put_entry("study-support-v1", &get("/"), &Response::new(200, "old")).await.unwrap();
        ctx.db.set_current_generation("study-support-v1").await.unwrap();

        MockFetcher::serve_manifest(&fetcher, &ctx.config);
        fetcher.respond("/static/icon-512.png", Response::new(404, "missing"));

        let result = install(ctx).await;
        assert!(matches!(result, Err(Error::InstallFailed(_))));
        assert_eq!(ctx.state().await, WorkerState::Redundant);
        assert!(!ctx.db.has_generation(ctx.generation()).await.unwrap());
        assert_eq!(ctx.db.current_generation().await.unwrap().as_deref(), Some("study-support-v1"));
    }

    #[tokio::test]
    async fn test_install_fails_offline() {
        let (worker, fetcher, _host) = new_worker().await;
        fetcher.set_offline(true);
        assert!(matches!(install(worker.context()).await, Err(Error::InstallFailed(_))));
    }

    #[tokio::test]
    async fn test_activate_prunes_other_generations() {
        let (worker, fetcher, host) = new_worker().await;
        let ctx = worker.context();
        ctx.db.put_entry("study-support-v1", &get("/"), &Response::new(200, "old")).await.unwrap();
        MockFetcher::serve_manifest(&fetcher, &ctx.config);

        install(ctx).await.unwrap();
        let report = activate(ctx).await.unwrap();

        assert_eq!(report.deleted, vec!["study-support-v1".to_string()]);
        assert_eq!(ctx.db.generation_names().await.unwrap(), vec!["study-support-v2".to_string()]);
        assert_eq!(ctx.db.current_generation().await.unwrap().as_deref(), Some("study-support-v2"));
        assert_eq!(ctx.state().await, WorkerState::Activated);
        assert!(host.is_claimed());
    }

    #[tokio::test]
    async fn test_activate_requires_install() {
        let (worker, _fetcher, _host) = new_worker().await;
        assert!(matches!(activate(worker.context()).await, Err(Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_skip_waiting_activates_installed_worker() {
        let (worker, fetcher, _host) = new_worker().await;
        let ctx = worker.context();
        MockFetcher::serve_manifest(&fetcher, &ctx.config);
        install(ctx).await.unwrap();

        let report = skip_waiting(ctx).await.unwrap();
        assert!(report.is_some());
        assert_eq!(ctx.state().await, WorkerState::Activated);

        assert!(skip_waiting(ctx).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_refresh_overwrites_only_on_success() {
        let (worker, fetcher, _host) = active_worker().await;
        let ctx = worker.context();
        let gen_name = ctx.generation();
        for path in ["/a.js", "/b.js", "/c.js"] {
            ctx.db.put_entry(gen_name, &get(path), &Response::new(200, "stale")).await.unwrap();
        }
        fetcher.respond("/a.js", Response::new(200, "fresh"));
        fetcher.respond("/b.js", Response::new(500, "boom"));
        fetcher.fail("/c.js");

        let report = refresh(ctx).await.unwrap();
        assert_eq!(report, RefreshReport { refreshed: 1, failed: 1, skipped: 1 });

        let body = |path: &'static str| async move {
            ctx.db.match_entry(gen_name, &get(path)).await.unwrap().unwrap().text()
        };
        assert_eq!(body("/a.js").await, "fresh");
        assert_eq!(body("/b.js").await, "stale");
        assert_eq!(body("/c.js").await, "stale");
        assert!(ctx.db.last_refresh().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_refresh_if_due_respects_interval() {
        let (worker, fetcher, _host) = active_worker().await;
        let ctx = worker.context();
        ctx.db.put_entry(ctx.generation(), &get("/a.js"), &Response::new(200, "stale")).await.unwrap();
        fetcher.respond("/a.js", Response::new(200, "fresh"));

        let now = Utc::now();
        assert!(refresh_if_due(ctx, RefreshTrigger::Timer, now).await.unwrap().is_some());
        assert!(refresh_if_due(ctx, RefreshTrigger::Visible, now).await.unwrap().is_none());
        assert!(refresh_if_due(ctx, RefreshTrigger::Manual, now).await.unwrap().is_some());

        let later = now + TimeDelta::days(2);
        assert!(refresh_if_due(ctx, RefreshTrigger::Timer, later).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_refresh_skipped_while_inactive() {
        let (worker, _fetcher, _host) = new_worker().await;
        let result = refresh_if_due(worker.context(), RefreshTrigger::Manual, Utc::now()).await.unwrap();
        assert!(result.is_none());
    }
}
