//! The batching processor service.
//!
//! Drains the event stream into ScyllaDB, committing a Merkle root per
//! batch. Startup failures (broker or storage unreachable, stream cannot
//! be created) exit non-zero; after startup the loop runs until SIGINT or
//! SIGTERM and drains its buffer on the way out.

use anyhow::Context;
use axum::routing::get;
use axum::{Json, Router};
use facto_nats::JetStreamQueue;
use facto_node::{init_tracing, shutdown_signal, Config};
use facto_processor::BatchProcessor;
use facto_scylla::ScyllaStore;
use prometheus::TextEncoder;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = Config::from_env().context("loading configuration")?;

    let store = ScyllaStore::connect(config.store_config())
        .await
        .context("connecting to storage")?;
    let queue = JetStreamQueue::connect(config.queue_config())
        .await
        .context("connecting to work queue")?;

    serve_metrics(config.metrics_port);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let processor = BatchProcessor::new(
        Arc::new(queue),
        Arc::new(store),
        config.processor_config(),
    );
    processor.run(shutdown_rx).await?;
    Ok(())
}

/// Expose `/metrics` and `/health` on the metrics port.
fn serve_metrics(port: u16) {
    let router = Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy"})) }))
        .route(
            "/metrics",
            get(|| async {
                TextEncoder::new()
                    .encode_to_string(&prometheus::gather())
                    .unwrap_or_default()
            }),
        );

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tokio::spawn(async move {
        match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => {
                info!(%addr, "metrics listener started");
                if let Err(e) = axum::serve(listener, router).await {
                    tracing::warn!(error = %e, "metrics listener stopped");
                }
            }
            Err(e) => tracing::warn!(error = %e, %addr, "metrics listener failed to bind"),
        }
    });
}
