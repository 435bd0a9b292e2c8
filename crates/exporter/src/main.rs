//! Kube State Exporter - cluster resource state as Prometheus metrics
//!
//! Mirrors deployments, pods, nodes and replication controllers through
//! watch caches, renders them on every scrape of `/metrics`, and accepts
//! pushed metric points on `/v1/push`.

use anyhow::Result;
use exporter_lib::{
    api::{self, AppState},
    client,
    push::{LogSink, MetricSink, PushState, TransferSink},
    ExporterMetrics, HealthRegistry, MetricsRegistry, ResourceCaches,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;

const EXPORTER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!(version = EXPORTER_VERSION, "Starting kube-state-exporter");

    let config = config::ExporterConfig::load()?;
    info!(
        port = config.port,
        hostname = %config.hostname,
        push_enabled = config.push_enabled,
        "Exporter configured"
    );

    let client = client::connect(&config.client_settings()).await?;

    let registry = MetricsRegistry::new();
    let metrics = ExporterMetrics::new(&registry)?;
    let caches = ResourceCaches::new();
    caches.register_collectors(&registry)?;

    let health_registry = HealthRegistry::new();
    caches.register_health(&health_registry).await;

    let (shutdown_tx, _) = broadcast::channel(1);
    let reflectors = caches.spawn(
        client,
        &config.sync_settings(),
        &health_registry,
        &metrics,
        &shutdown_tx,
    );

    let push = if config.push_enabled {
        let sink: Arc<dyn MetricSink> = match &config.transfer_url {
            Some(url) => {
                info!(url = %url, "Forwarding pushed metrics");
                Arc::new(TransferSink::new(url.clone(), metrics.clone())?)
            }
            None => Arc::new(LogSink),
        };
        Some(PushState::new(config.hostname.clone(), sink, metrics.clone()))
    } else {
        None
    };

    // readiness now follows the caches' initial lists
    health_registry.set_ready(true).await;

    let app_state = Arc::new(AppState::new(registry, health_registry));
    let signal_tx = shutdown_tx.clone();
    let shutdown = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for shutdown signal");
        }
        info!("Shutting down");
        let _ = signal_tx.send(());
    };

    api::serve(config.port, app_state, push, shutdown).await?;

    // server may have stopped on its own; make sure the reflectors stop too
    let _ = shutdown_tx.send(());
    for handle in reflectors {
        if let Err(e) = handle.await {
            warn!(error = %e, "Reflector task failed");
        }
    }

    info!("Exporter stopped");
    Ok(())
}
