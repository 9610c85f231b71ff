//! Explicit registry of in-flight background work.
//!
//! Anything a handler starts without awaiting (background revalidation,
//! fire-and-forget store writes) is registered here. The host awaits
//! [`WaitUntil::settle`] before dropping the worker so no write is cut off
//! halfway.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinSet;

/// Handle for registering detached work. Clones share the same set.
#[derive(Clone, Default)]
pub struct WaitUntil {
    tasks: Arc<Mutex<JoinSet<()>>>,
}

impl WaitUntil {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `work` on the runtime and track it until it settles.
    ///
    /// Tasks that already finished are reaped first so the set only holds
    /// work that is still running.
    pub async fn register<F>(&self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock().await;
        while let Some(result) = tasks.try_join_next() {
            if let Err(e) = result {
                tracing::warn!("background task ended abnormally: {e}");
            }
        }
        tasks.spawn(work);
    }

    /// Number of registered tasks that have not been reaped yet.
    pub async fn pending(&self) -> usize {
        self.tasks.lock().await.len()
    }

    /// Wait for every registered task, including ones registered while
    /// waiting. Returns how many tasks were reaped.
    pub async fn settle(&self) -> usize {
        let mut settled = 0;
        loop {
            let mut batch = std::mem::take(&mut *self.tasks.lock().await);
            if batch.is_empty() {
                return settled;
            }
            while let Some(result) = batch.join_next().await {
                if let Err(e) = result {
                    tracing::warn!("background task ended abnormally: {e}");
                }
                settled += 1;
            }
        }
    }
}

impl std::fmt::Debug for WaitUntil {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitUntil").finish_non_exhaustive()
    }
}
