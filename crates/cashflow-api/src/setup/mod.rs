//! Application setup and initialization
//!
//! Everything `main` needs to turn a [`Config`] into a running router lives
//! here, split so tests can wire the same routes over in-process backends.

pub mod database;
pub mod routes;
pub mod server;
pub mod services;
pub mod storage;

use crate::state::AppState;
use anyhow::{Context, Result};
use cashflow_core::Config;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    config.validate().context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(config.log_json)
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;
    crate::error::set_production_mode(config.is_production());

    tracing::info!(
        environment = %config.environment,
        "Configuration loaded and validated successfully"
    );

    let pool = database::setup_database(&config).await?;
    let storage = storage::setup_storage(&config)?;

    let state = services::initialize_services(&config, pool, storage);
    services::start_background_tasks(&config, &state);

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
