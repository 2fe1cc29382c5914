use crate::upload::UploadCoordinator;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

/// Periodically expires abandoned staged uploads.
#[derive(Clone)]
pub struct OrphanReaper {
    coordinator: Arc<UploadCoordinator>,
    sweep_interval: Duration,
    max_age: Duration,
}

impl OrphanReaper {
    pub fn new(
        coordinator: Arc<UploadCoordinator>,
        sweep_interval: Duration,
        max_age: Duration,
    ) -> Self {
        Self {
            coordinator,
            sweep_interval,
            max_age,
        }
    }

    /// A zero interval disables the background sweep.
    pub fn is_enabled(&self) -> bool {
        !self.sweep_interval.is_zero()
    }

    /// Start the background sweep. The first tick fires immediately.
    /// Returns a JoinHandle for graceful shutdown, or None when disabled.
    pub fn start(self: Arc<Self>) -> Option<tokio::task::JoinHandle<()>> {
        if !self.is_enabled() {
            tracing::info!("Orphan sweep disabled");
            return None;
        }

        Some(tokio::spawn(async move {
            let mut sweep_interval = interval(self.sweep_interval);

            loop {
                sweep_interval.tick().await;
                self.run_once().await;
            }
        }))
    }

    /// Run one sweep and return how many uploads were considered.
    #[tracing::instrument(skip(self), fields(cleanup.operation = "reclaim_orphans"))]
    pub async fn run_once(&self) -> usize {
        tracing::info!(
            max_age_secs = self.max_age.as_secs(),
            "Starting scheduled sweep of orphaned uploads"
        );

        match self.coordinator.reclaim_orphans(self.max_age).await {
            Ok(count) => {
                tracing::info!(considered = count, "Orphan sweep completed");
                count
            }
            Err(e) => {
                tracing::error!(error = %e, "Orphan sweep failed");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::UploadPolicy;
    use bytes::Bytes;
    use cashflow_core::models::UploadStatus;
    use cashflow_db::{LedgerOp, MemoryUploadLedger, UploadLedger};
    use cashflow_storage::{MemoryStorage, Storage};
    use chrono::Utc;

    fn reaper(
        storage: &MemoryStorage,
        ledger: &MemoryUploadLedger,
        sweep_interval: Duration,
    ) -> Arc<OrphanReaper> {
        let coordinator = Arc::new(UploadCoordinator::new(
            Arc::new(storage.clone()),
            Arc::new(ledger.clone()),
            UploadPolicy::default(),
        ));
        Arc::new(OrphanReaper::new(
            coordinator,
            sweep_interval,
            Duration::from_secs(24 * 3600),
        ))
    }

    #[tokio::test]
    async fn zero_interval_disables_sweep() {
        let reaper = reaper(
            &MemoryStorage::new(),
            &MemoryUploadLedger::new(),
            Duration::ZERO,
        );
        assert!(!reaper.is_enabled());
        assert!(reaper.start().is_none());
    }

    #[tokio::test]
    async fn ledger_failure_is_logged_not_raised() {
        let ledger = MemoryUploadLedger::new();
        ledger.fail(LedgerOp::FindOrphans).await;
        let reaper = reaper(&MemoryStorage::new(), &ledger, Duration::from_secs(60));
        assert_eq!(reaper.run_once().await, 0);
    }

    #[tokio::test]
    async fn background_task_expires_orphans() {
        let storage = MemoryStorage::new();
        let ledger = MemoryUploadLedger::new();
        let reaper = reaper(&storage, &ledger, Duration::from_millis(20));

        let coordinator = UploadCoordinator::new(
            Arc::new(storage.clone()),
            Arc::new(ledger.clone()),
            UploadPolicy::default(),
        );
        let credential = coordinator.request_credential("image/png", 3).await.unwrap();
        storage
            .put(&credential.staging_key, Bytes::from_static(b"png"), "image/png")
            .await
            .unwrap();
        ledger
            .backdate(&credential.upload_token, Utc::now() - chrono::Duration::days(2))
            .await;

        let handle = reaper.start().expect("enabled");
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        let record = ledger
            .find_by_token(&credential.upload_token)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.status, UploadStatus::Expired);
        assert!(!storage.exists(&credential.staging_key).await.unwrap());
    }
}
