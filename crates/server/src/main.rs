//! swcache server entry point.
//!
//! Boots the worker host and serves it over MCP on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use swcache_client::{FetchClient, FetchConfig};
use swcache_core::{AppConfig, CacheDb, OfflineCacheWorker, WorkerHost};
use tracing_subscriber::EnvFilter;

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
    let scope = config.scope_url()?;

    tracing::info!(scope = %scope, db_path = %config.db_path.display(), "Starting swcache server on stdio transport");

    let storage = CacheDb::open(&config.db_path).await?;
    let network = FetchClient::new(FetchConfig::from(&config))?;
    let host = Arc::new(WorkerHost::new(OfflineCacheWorker::new(scope), storage, network));

    let state = host.restore().await?;
    tracing::info!(?state, "worker state after restore");

    if config.install_on_start
        && let Err(e) = host.dispatch_install().await
    {
        tracing::warn!(error = %e, state = ?host.state(), "install on start failed");
    }

    let handler = handler::SwCacheServer::new(host);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
