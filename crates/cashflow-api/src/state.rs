//! Application state shared by every handler.

use cashflow_core::Config;
use cashflow_services::{TransactionService, UploadCoordinator};
use cashflow_storage::Storage;
use sqlx::PgPool;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// `None` when the ledger is not Postgres-backed (in-process test wiring).
    pub pool: Option<PgPool>,
    pub storage: Arc<dyn Storage>,
    pub uploads: Arc<UploadCoordinator>,
    pub transactions: Arc<TransactionService>,
    background_tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl AppState {
    pub fn new(
        config: Config,
        pool: Option<PgPool>,
        storage: Arc<dyn Storage>,
        uploads: Arc<UploadCoordinator>,
        transactions: Arc<TransactionService>,
    ) -> Self {
        Self {
            config,
            pool,
            storage,
            uploads,
            transactions,
            background_tasks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Keep a background task so it can be aborted on shutdown.
    pub fn track_task(&self, handle: JoinHandle<()>) {
        if let Ok(mut tasks) = self.background_tasks.lock() {
            tasks.push(handle);
        }
    }

    /// Abort all tracked background tasks.
    pub fn shutdown(&self) {
        if let Ok(mut tasks) = self.background_tasks.lock() {
            for handle in tasks.drain(..) {
                handle.abort();
            }
        }
        tracing::info!("Background tasks stopped");
    }
}
