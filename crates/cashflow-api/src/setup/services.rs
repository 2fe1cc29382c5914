//! Service wiring

use crate::state::AppState;
use cashflow_core::Config;
use cashflow_db::{PgTransactionRepository, PgUploadLedger, TransactionRepository, UploadLedger};
use cashflow_services::{OrphanReaper, TransactionService, UploadCoordinator, UploadPolicy};
use cashflow_storage::Storage;
use sqlx::PgPool;
use std::sync::Arc;

/// Build the Postgres-backed repositories and every service on top of them.
pub fn initialize_services(
    config: &Config,
    pool: PgPool,
    storage: Arc<dyn Storage>,
) -> Arc<AppState> {
    let ledger: Arc<dyn UploadLedger> = Arc::new(PgUploadLedger::new(pool.clone()));
    let repository: Arc<dyn TransactionRepository> =
        Arc::new(PgTransactionRepository::new(pool.clone()));

    build_state(config, Some(pool), storage, ledger, repository)
}

/// Assemble the application state from already-constructed backends.
pub fn build_state(
    config: &Config,
    pool: Option<PgPool>,
    storage: Arc<dyn Storage>,
    ledger: Arc<dyn UploadLedger>,
    repository: Arc<dyn TransactionRepository>,
) -> Arc<AppState> {
    let policy = UploadPolicy::from_settings(&config.uploads);
    let uploads = Arc::new(UploadCoordinator::new(storage.clone(), ledger, policy));
    let transactions = Arc::new(TransactionService::new(
        repository,
        uploads.clone(),
        storage.clone(),
    ));

    tracing::info!(
        max_image_bytes = config.uploads.max_size_bytes,
        credential_ttl_secs = config.uploads.credential_ttl.as_secs(),
        "Services initialized"
    );

    Arc::new(AppState::new(
        config.clone(),
        pool,
        storage,
        uploads,
        transactions,
    ))
}

/// Start the orphan reaper; its handle is tracked on the state for shutdown.
pub fn start_background_tasks(config: &Config, state: &Arc<AppState>) {
    let reaper = Arc::new(OrphanReaper::new(
        state.uploads.clone(),
        config.uploads.orphan_sweep_interval,
        config.uploads.orphan_max_age,
    ));

    if let Some(handle) = reaper.start() {
        tracing::info!(
            interval_secs = config.uploads.orphan_sweep_interval.as_secs(),
            max_age_secs = config.uploads.orphan_max_age.as_secs(),
            "Orphan reaper started"
        );
        state.track_task(handle);
    }
}
