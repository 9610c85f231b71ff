use sw_cache_core::{Request, Response};

use super::{revalidate, store_detached};
use crate::worker::WorkerContext;

/// Serve from the store when possible.
///
/// A hit is returned immediately and a background fetch refreshes the entry
/// for later reads. A miss is fetched inline; a 200 is stored in the
/// background and any received response is returned. If the network is
/// unreachable the caller gets the plain-text offline response.
pub async fn cache_first(ctx: &WorkerContext, request: Request) -> Response {
    match ctx.db.match_entry(ctx.generation(), &request).await {
        Ok(Some(cached)) => {
            tracing::debug!(url = %request.url, "cache hit");
            revalidate(ctx, request).await;
            return cached;
        }
        Ok(None) => tracing::debug!(url = %request.url, "cache miss"),
        Err(e) => tracing::warn!(url = %request.url, "cache lookup failed: {e}"),
    }

    match ctx.fetcher.fetch(&request).await {
        Ok(response) => {
            if response.is_cacheable() {
                store_detached(ctx, request, response.clone()).await;
            }
            response
        }
        Err(e) => {
            tracing::warn!(url = %request.url, "fetch failed with no cached copy: {e}");
            Response::offline_text()
        }
    }
}
