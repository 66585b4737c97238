//! The query and verification API service.

use anyhow::Context;
use facto_node::{init_tracing, shutdown_signal, Config};
use facto_query::{router, QueryService};
use facto_scylla::ScyllaStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = Config::from_env().context("loading configuration")?;

    let store = ScyllaStore::connect(config.store_config())
        .await
        .context("connecting to storage")?;
    let service = Arc::new(QueryService::new(Arc::new(store)));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "query API listening");

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving query API")?;
    Ok(())
}
