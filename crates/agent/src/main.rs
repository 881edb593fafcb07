//! Vitals Agent - Patient vital-sign monitoring agent
//!
//! This binary ingests vital-sign samples, runs threshold and
//! statistical anomaly detection, and raises deduplicated alerts.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use monitor_lib::{
    alert::LogDispatcher,
    health::{components, HealthRegistry},
    observability::{MonitorMetrics, StructuredLogger},
    store::{InMemoryAlertStore, InMemoryAnomalyStore, InMemoryHistoryStore},
    VitalsPipelineBuilder,
};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting vitals-agent");

    // Load configuration
    let config = config::AgentConfig::load()?;
    info!(instance = %config.instance_name, "Agent configured");

    // Initialize health registry
    let health_registry = HealthRegistry::new();
    health_registry.register(components::PIPELINE).await;
    health_registry.register(components::HISTORY_STORE).await;
    health_registry.register(components::ANOMALY_STORE).await;
    health_registry.register(components::ALERT_STORE).await;
    health_registry.register(components::NOTIFIER).await;

    // Initialize metrics
    let metrics = MonitorMetrics::new();

    // Initialize structured logger
    let logger = StructuredLogger::new(&config.instance_name);
    logger.log_startup(AGENT_VERSION);

    // Wire the detection pipeline over in-memory stores
    let history = Arc::new(InMemoryHistoryStore::new());
    let pipeline = VitalsPipelineBuilder::new()
        .history(history.clone())
        .anomaly_store(Arc::new(InMemoryAnomalyStore::new()))
        .alert_store(Arc::new(InMemoryAlertStore::new()))
        .notifier(Arc::new(LogDispatcher::new()))
        .dispatch_timeout(Duration::from_secs(config.dispatch_timeout_secs))
        .history_window(chrono::Duration::days(config.history_window_days))
        .dedup_window(chrono::Duration::seconds(config.dedup_window_secs))
        .instance_name(&config.instance_name)
        .health(health_registry.clone())
        .build()?;

    // Create shared application state
    let app_state = Arc::new(api::AppState::new(
        health_registry.clone(),
        metrics.clone(),
        Arc::new(pipeline),
        history,
    ));

    // Mark agent as ready after initialization
    health_registry.set_ready(true).await;

    // Start health and metrics server
    let _api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");
    info!("Shutting down");

    Ok(())
}
