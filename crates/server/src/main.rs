//! sw-cache server entry point.
//!
//! Boots the worker against the configured store, starts the refresh
//! scheduler and serves the worker's events as MCP tools on stdio.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use sw_cache_core::{AppConfig, CacheDb};
use sw_cache_worker::{FetchClient, FetchConfig, LocalHost};
use tracing_subscriber::EnvFilter;

mod boot;
mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(generation = %config.generation_name(), db = %config.db_path.display(), "Starting sw-cache on stdio transport");

    let db = CacheDb::open(&config.db_path).await?;
    let fetcher = Arc::new(FetchClient::new(FetchConfig::from_app(&config))?);
    let host = Arc::new(LocalHost::new());
    let refresh_check = config.refresh_check();

    let worker = boot::boot(config, db.clone(), fetcher, host).await?;
    let scheduler = boot::spawn_refresh_loop(worker.clone(), refresh_check);

    let handler = handler::SwCacheServer::new(worker.clone());
    let server = serve_server(handler, stdio()).await?;
    server.waiting().await?;

    scheduler.abort();
    let settled = worker.settle().await;
    tracing::info!(settled, "background work settled; shutting down");
    db.close().await?;

    Ok(())
}
