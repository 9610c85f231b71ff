//! Response strategies.
//!
//! Both strategies always produce a [`Response`]: a network failure becomes a
//! cached answer or a synthesized 503, and a store failure is logged and
//! treated as a miss.

mod cache_first;
mod network_first;

pub use cache_first::cache_first;
pub use network_first::{NETWORK_FIRST_MISS, network_first};

use sw_cache_core::{Request, Response};

use crate::worker::WorkerContext;

/// Write `response` under `request` without holding up the caller.
///
/// The write is registered with the worker's [`WaitUntil`](crate::WaitUntil)
/// so shutdown waits for it.
pub(crate) async fn store_detached(ctx: &WorkerContext, request: Request, response: Response) {
    let db = ctx.db.clone();
    let generation = ctx.generation().to_string();
    ctx.wait_until
        .register(async move {
            if let Err(e) = db.put_entry(&generation, &request, &response).await {
                tracing::warn!(url = %request.url, "cache write failed: {e}");
            }
        })
        .await;
}

/// Fetch `request` in the background and overwrite its entry on a 200.
pub(crate) async fn revalidate(ctx: &WorkerContext, request: Request) {
    let db = ctx.db.clone();
    let fetcher = ctx.fetcher.clone();
    let generation = ctx.generation().to_string();
    ctx.wait_until
        .register(async move {
            match fetcher.fetch(&request).await {
                Ok(response) if response.is_cacheable() => {
                    if let Err(e) = db.put_entry(&generation, &request, &response).await {
                        tracing::warn!(url = %request.url, "revalidation write failed: {e}");
                    }
                }
                Ok(response) => {
                    tracing::debug!(url = %request.url, status = response.status, "revalidation not stored");
                }
                Err(e) => tracing::debug!(url = %request.url, "revalidation failed: {e}"),
            }
        })
        .await;
}
