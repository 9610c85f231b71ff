//! Worker assembly and event dispatch.
//!
//! A [`Worker`] owns one [`WorkerContext`]: the injected configuration, the
//! store handle and the two collaborators. Every trigger the host can fire is
//! an [`Event`]; [`Worker::dispatch`] routes it to the handler for its kind.

use std::sync::Arc;

use serde::Serialize;
use sw_cache_core::{AppConfig, CacheDb, Error, Generation, Request, Response};
use tokio::sync::{RwLock, oneshot};

use crate::events::{self, ClickOutcome, ControlMessage, ControlReply, SyncReport};
use crate::fetch::Fetcher;
use crate::host::{Host, Notification};
use crate::lifecycle::{self, ActivateReport, InstallReport, Lifecycle, RefreshReport, RefreshTrigger, WorkerState};
use crate::route::{Route, RoutePolicy};
use crate::strategy;
use crate::wait::WaitUntil;

/// Everything a handler needs, shared by the worker and its background tasks.
pub struct WorkerContext {
    pub config: AppConfig,
    pub db: CacheDb,
    pub fetcher: Arc<dyn Fetcher>,
    pub host: Arc<dyn Host>,
    pub policy: RoutePolicy,
    pub wait_until: WaitUntil,
    generation: String,
    pub(crate) lifecycle: RwLock<Lifecycle>,
}

impl WorkerContext {
    /// Name of the generation this worker reads and writes.
    pub fn generation(&self) -> &str {
        &self.generation
    }

    pub async fn state(&self) -> WorkerState {
        self.lifecycle.read().await.state()
    }
}

/// A trigger delivered to the worker.
#[derive(Debug)]
pub enum Event {
    Install,
    Activate,
    Fetch(Request),
    Sync { tag: String },
    Refresh(RefreshTrigger),
    Push { data: Option<Vec<u8>> },
    NotificationClick { tag: String },
    Message { message: ControlMessage, reply: Option<oneshot::Sender<ControlReply>> },
    /// A foreground context hands over a mutation that failed to send.
    QueueMutation(Request),
}

/// Result of intercepting a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Not intercepted; the host sends the request to the network itself.
    PassThrough,
    Respond { route: Route, response: Response },
}

/// Result of dispatching an [`Event`].
#[derive(Debug)]
pub enum EventOutcome {
    Installed(InstallReport),
    Activated(ActivateReport),
    Fetched(FetchOutcome),
    /// `None` when the sync tag was not ours.
    Synced(Option<SyncReport>),
    /// `None` when the refresh was not due.
    Refreshed(Option<RefreshReport>),
    Notified(Notification),
    Clicked(ClickOutcome),
    MessageHandled,
    Queued(i64),
}

/// Snapshot of the worker and its store.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerStatus {
    pub state: WorkerState,
    /// RFC 3339 time of the last lifecycle transition.
    pub state_changed_at: String,
    pub generation: String,
    pub current_generation: Option<String>,
    pub generations: Vec<Generation>,
    pub pending_mutations: u64,
    pub last_refresh: Option<String>,
    pub skip_waiting_requested: bool,
}

/// The cache manager.
#[derive(Clone)]
pub struct Worker {
    ctx: Arc<WorkerContext>,
}

impl Worker {
    /// A fresh worker for the generation named by `config`. It intercepts
    /// nothing until installed and activated.
    pub fn new(config: AppConfig, db: CacheDb, fetcher: Arc<dyn Fetcher>, host: Arc<dyn Host>) -> Self {
        let generation = config.generation_name();
        Self::build(config, db, fetcher, host, generation, Lifecycle::new())
    }

    /// An already active worker serving `generation`, used when a newer
    /// version failed to install and the previous generation keeps serving.
    pub fn resume(
        config: AppConfig, db: CacheDb, fetcher: Arc<dyn Fetcher>, host: Arc<dyn Host>, generation: String,
    ) -> Self {
        Self::build(config, db, fetcher, host, generation, Lifecycle::starting_at(WorkerState::Activated))
    }

    fn build(
        config: AppConfig, db: CacheDb, fetcher: Arc<dyn Fetcher>, host: Arc<dyn Host>, generation: String,
        lifecycle: Lifecycle,
    ) -> Self {
        let policy = RoutePolicy::from_config(&config);
        let ctx = WorkerContext {
            config,
            db,
            fetcher,
            host,
            policy,
            wait_until: WaitUntil::new(),
            generation,
            lifecycle: RwLock::new(lifecycle),
        };
        Self { ctx: Arc::new(ctx) }
    }

    pub fn context(&self) -> &WorkerContext {
        &self.ctx
    }

    pub async fn state(&self) -> WorkerState {
        self.ctx.state().await
    }

    /// Install, then activate straight away if skip-waiting was requested.
    pub async fn start(&self) -> Result<(InstallReport, Option<ActivateReport>), Error> {
        let installed = lifecycle::install(&self.ctx).await?;
        let activated = if self.ctx.lifecycle.read().await.skip_waiting_requested() {
            Some(lifecycle::activate(&self.ctx).await?)
        } else {
            None
        };
        Ok((installed, activated))
    }

    /// Intercept a request.
    ///
    /// Never fails: network and store problems come back as degraded or
    /// synthesized responses.
    pub async fn handle_fetch(&self, request: Request) -> FetchOutcome {
        let route = self.ctx.policy.classify(&request.method, &request.url);
        let state = self.ctx.state().await;

        let response = match route {
            Route::Ignore => return FetchOutcome::PassThrough,
            _ if !state.can_intercept() => {
                tracing::debug!(url = %request.url, %state, "worker not active; passing through");
                return FetchOutcome::PassThrough;
            }
            Route::NetworkFirst => strategy::network_first(&self.ctx, request).await,
            Route::CacheFirst => strategy::cache_first(&self.ctx, request).await,
        };

        FetchOutcome::Respond { route, response }
    }

    /// Route an event to its handler.
    pub async fn dispatch(&self, event: Event) -> Result<EventOutcome, Error> {
        let ctx = &self.ctx;
        match event {
            Event::Install => lifecycle::install(ctx).await.map(EventOutcome::Installed),
            Event::Activate => lifecycle::activate(ctx).await.map(EventOutcome::Activated),
            Event::Fetch(request) => Ok(EventOutcome::Fetched(self.handle_fetch(request).await)),
            Event::Sync { tag } => events::handle_sync(ctx, &tag).await.map(EventOutcome::Synced),
            Event::Refresh(trigger) => {
                lifecycle::refresh_if_due(ctx, trigger, chrono::Utc::now()).await.map(EventOutcome::Refreshed)
            }
            Event::Push { data } => events::handle_push(ctx, data.as_deref()).await.map(EventOutcome::Notified),
            Event::NotificationClick { tag } => {
                events::handle_notification_click(ctx, &tag).await.map(EventOutcome::Clicked)
            }
            Event::Message { message, reply } => {
                events::handle_message(ctx, message, reply).await?;
                Ok(EventOutcome::MessageHandled)
            }
            Event::QueueMutation(request) => events::queue_mutation(ctx, &request).await.map(EventOutcome::Queued),
        }
    }

    /// Wait for all registered background work.
    pub async fn settle(&self) -> usize {
        self.ctx.wait_until.settle().await
    }

    pub async fn status(&self) -> Result<WorkerStatus, Error> {
        let (state, state_changed_at, skip_waiting_requested) = {
            let lifecycle = self.ctx.lifecycle.read().await;
            (lifecycle.state(), lifecycle.changed_at(), lifecycle.skip_waiting_requested())
        };
        let db = &self.ctx.db;

        Ok(WorkerStatus {
            state,
            state_changed_at: state_changed_at.to_rfc3339(),
            generation: self.ctx.generation.clone(),
            current_generation: db.current_generation().await?,
            generations: db.list_generations().await?,
            pending_mutations: db.count_pending(&self.ctx.config.pending_queue).await?,
            last_refresh: db.last_refresh().await?.map(|t| t.to_rfc3339()),
            skip_waiting_requested,
        })
    }
}
