//! Application setup and initialization

pub mod routes;
pub mod server;
pub mod services;

use crate::services::scheduler::JobScheduler;
use crate::state::AppState;
use anyhow::{Context, Result};
use saasconsole_core::Config;
use saasconsole_db::create_store;
use saasconsole_infra::{init_telemetry, LogFormat, TelemetryConfig};
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router, JobScheduler)> {
    config.validate().context("Configuration validation failed")?;

    init_telemetry(&TelemetryConfig {
        service_name: env!("CARGO_PKG_NAME").to_string(),
        service_version: env!("CARGO_PKG_VERSION").to_string(),
        environment: config.environment().to_string(),
        format: LogFormat::parse(config.log_format()),
    })
    .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        environment = %config.environment(),
        store_backend = %config.store_backend(),
        "Configuration loaded and validated successfully"
    );

    let store = create_store(&config)
        .await
        .context("Failed to initialize the item store")?;

    let state = services::initialize_services(&config, store)?;

    let router = routes::setup_routes(&config, state.clone())?;

    let scheduler = JobScheduler::start(state.clone(), config.job_poll_interval_secs());

    Ok((state, router, scheduler))
}
