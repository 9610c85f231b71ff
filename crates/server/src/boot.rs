//! Worker startup and the refresh scheduler.

use std::sync::Arc;
use std::time::Duration;

use sw_cache_core::{AppConfig, CacheDb, Error};
use sw_cache_worker::{Event, EventOutcome, Fetcher, Host, RefreshTrigger, Worker};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Bring up the worker for the configured version.
///
/// - The configured generation is already current: resume it without
///   reinstalling.
/// - Otherwise install and activate. If that fails and the previously
///   current generation still exists, keep serving it. With nothing to fall
///   back to, the redundant worker is returned and passes every request
///   through.
pub async fn boot(
    config: AppConfig, db: CacheDb, fetcher: Arc<dyn Fetcher>, host: Arc<dyn Host>,
) -> Result<Worker, Error> {
    let generation = config.generation_name();
    let previous = db.current_generation().await?;

    if previous.as_deref() == Some(generation.as_str()) {
        tracing::info!(%generation, "generation already current; resuming");
        return Ok(Worker::resume(config, db, fetcher, host, generation));
    }

    let worker = Worker::new(config.clone(), db.clone(), fetcher.clone(), host.clone());
    match worker.start().await {
        Ok((installed, activated)) => {
            tracing::info!(
                generation = %installed.generation,
                entries = installed.entries,
                activated = activated.is_some(),
                "worker started"
            );
            Ok(worker)
        }
        Err(e) => {
            let fallback = match previous {
                Some(previous) if db.has_generation(&previous).await? => Some(previous),
                _ => None,
            };
            match fallback {
                Some(previous) => {
                    tracing::warn!(%previous, "start of {generation} failed, keeping previous generation: {e}");
                    Ok(Worker::resume(config, db, fetcher, host, previous))
                }
                None => {
                    tracing::warn!("start of {generation} failed with no generation to fall back to: {e}");
                    Ok(worker)
                }
            }
        }
    }
}

/// Tick every `every` and refresh when the interval has elapsed.
pub fn spawn_refresh_loop(worker: Worker, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            match worker.dispatch(Event::Refresh(RefreshTrigger::Timer)).await {
                Ok(EventOutcome::Refreshed(Some(report))) => {
                    tracing::info!(refreshed = report.refreshed, failed = report.failed, "scheduled refresh ran");
                }
                Ok(_) => tracing::debug!("scheduled refresh not due"),
                Err(e) => tracing::warn!("scheduled refresh failed: {e}"),
            }
        }
    })
}
