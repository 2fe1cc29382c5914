//! Storage setup and initialization

use anyhow::{Context, Result};
use cashflow_core::Config;
use cashflow_storage::{create_storage, Storage};
use std::sync::Arc;

pub fn setup_storage(config: &Config) -> Result<Arc<dyn Storage>> {
    tracing::info!("Initializing object store gateway...");
    let storage = create_storage(&config.s3).context("Failed to initialize object storage")?;
    tracing::info!(
        backend = storage.backend_name(),
        bucket = %config.s3.bucket,
        region = %config.s3.region,
        endpoint = ?config.s3.endpoint,
        "Object store gateway initialized"
    );
    Ok(storage)
}
