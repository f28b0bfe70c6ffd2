//! Capacity server - storage capacity rollup API
//!
//! Serves hierarchy, forecast and alert reports built from the snapshot
//! directory, alongside health checks and Prometheus metrics.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use capacity_lib::{
    health::{Component, HealthRegistry},
    observability::{ReportMetrics, StructuredLogger},
    CapacityEngine, JsonSnapshotSource,
};
use capacity_server::{api, config::ServerConfig};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting capacity-server");

    let config = ServerConfig::load()?;
    info!(
        instance = %config.instance_name,
        snapshot_dir = %config.snapshot_dir,
        "Server configured"
    );

    let health_registry =
        HealthRegistry::with_source_failure_threshold(config.source_failure_threshold);
    health_registry.register_all().await;

    let metrics = ReportMetrics::new();

    let logger = StructuredLogger::new(&config.instance_name);
    logger.log_startup(SERVER_VERSION, &config.snapshot_dir);

    let source = JsonSnapshotSource::new(&config.snapshot_dir);
    if !source.dir().is_dir() {
        warn!(
            snapshot_dir = %config.snapshot_dir,
            "Snapshot directory does not exist yet"
        );
        health_registry
            .set_degraded(Component::RecordSource, "Snapshot directory missing")
            .await;
    }

    let app_state = Arc::new(api::AppState::new(
        health_registry.clone(),
        metrics,
        logger.clone(),
        Arc::new(source),
        CapacityEngine::new(config.engine.clone()),
        Duration::from_millis(config.fetch_timeout_ms),
    ));

    health_registry.set_ready(true).await;

    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::select! {
        result = api_handle => {
            match result {
                Ok(Err(e)) => return Err(e),
                Err(e) => return Err(e.into()),
                Ok(Ok(())) => {}
            }
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            logger.log_shutdown("SIGINT received");
        }
    }

    info!("Shutting down");
    Ok(())
}
