use sw_cache_core::{Request, Response};

use crate::worker::WorkerContext;

/// Error message of the JSON body returned when the network and the store both miss.
pub const NETWORK_FIRST_MISS: &str = "Network request failed and no cached response is available";

/// Prefer the live answer.
///
/// Any received response is returned as is; a 200 also overwrites the stored
/// entry before returning. When the network is unreachable the stored entry
/// is served, or a 503 JSON body if there is none.
pub async fn network_first(ctx: &WorkerContext, request: Request) -> Response {
    let generation = ctx.generation();

    let error = match ctx.fetcher.fetch(&request).await {
        Ok(response) => {
            if response.is_cacheable()
                && let Err(e) = ctx.db.put_entry(generation, &request, &response).await
            {
                tracing::warn!(url = %request.url, "cache write failed: {e}");
            }
            return response;
        }
        Err(e) => e,
    };

    tracing::debug!(url = %request.url, "network failed, trying cache: {error}");
    match ctx.db.match_entry(generation, &request).await {
        Ok(Some(cached)) => cached,
        Ok(None) => Response::offline_json(NETWORK_FIRST_MISS),
        Err(e) => {
            tracing::warn!(url = %request.url, "cache lookup failed: {e}");
            Response::offline_json(NETWORK_FIRST_MISS)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{active_worker, get};
    use sw_cache_core::ResponseSource;

    #[tokio::test]
    async fn test_live_200_overwrites_stale_entry() {
        let (worker, fetcher, _host) = active_worker().await;
        let ctx = worker.context();
        ctx.db.put_entry(ctx.generation(), &get("/history"), &Response::new(200, "[1]")).await.unwrap();
        fetcher.respond("/history", Response::new(200, "[1,2]"));

        let response = network_first(ctx, get("/history")).await;
        assert_eq!(response.text(), "[1,2]");
        assert_eq!(response.source, ResponseSource::Network);

        let stored = ctx.db.match_entry(ctx.generation(), &get("/history")).await.unwrap().unwrap();
        assert_eq!(stored.text(), "[1,2]");
    }

    #[tokio::test]
    async fn test_live_error_status_returned_not_stored() {
        let (worker, fetcher, _host) = active_worker().await;
        let ctx = worker.context();
        ctx.db.put_entry(ctx.generation(), &get("/health"), &Response::new(200, "ok")).await.unwrap();
        fetcher.respond("/health", Response::new(500, "down"));

        let response = network_first(ctx, get("/health")).await;
        assert_eq!(response.status, 500);

        let stored = ctx.db.match_entry(ctx.generation(), &get("/health")).await.unwrap().unwrap();
        assert_eq!(stored.text(), "ok");
    }

    #[tokio::test]
    async fn test_offline_falls_back_to_store() {
        let (worker, fetcher, _host) = active_worker().await;
        let ctx = worker.context();
        ctx.db.put_entry(ctx.generation(), &get("/task/7"), &Response::new(200, "cached")).await.unwrap();
        fetcher.set_offline(true);

        let response = network_first(ctx, get("/task/7")).await;
        assert_eq!(response.text(), "cached");
        assert_eq!(response.source, ResponseSource::Cache);
    }

    #[tokio::test]
    async fn test_offline_miss_synthesizes_json() {
        let (worker, fetcher, _host) = active_worker().await;
        fetcher.set_offline(true);

        let response = network_first(worker.context(), get("/api/v1/items")).await;
        assert_eq!(response.status, 503);
        assert_eq!(response.content_type(), Some("application/json"));

        let body: serde_json::Value = response.json().unwrap();
        assert_eq!(body["offline"], true);
        assert_eq!(body["error"], NETWORK_FIRST_MISS);
    }
}
