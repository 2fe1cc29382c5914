//! In-process repositories with the same conditional-write semantics as the
//! Postgres ones. Operations can be forced to fail with `fail`.

use super::transactions::TransactionRepository;
use super::upload::{LinkOutcome, UploadLedger};
use cashflow_core::models::{NewTransaction, NewUploadRecord, Transaction, UploadRecord, UploadStatus};
use cashflow_core::AppError;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Ledger operation that can be forced to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedgerOp {
    Insert,
    FindByToken,
    MarkCompleted,
    Link,
    MarkFailed,
    MarkExpired,
    FindOrphans,
}

fn injected(op: impl std::fmt::Debug) -> AppError {
    AppError::Internal(format!("injected {:?} failure", op))
}

#[derive(Clone, Default)]
pub struct MemoryUploadLedger {
    records: Arc<RwLock<HashMap<String, UploadRecord>>>,
    failing: Arc<RwLock<HashSet<LedgerOp>>>,
}

impl MemoryUploadLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn fail(&self, op: LedgerOp) {
        self.failing.write().await.insert(op);
    }

    pub async fn recover(&self, op: LedgerOp) {
        self.failing.write().await.remove(&op);
    }

    /// Rewrite `created_at` so tests can age a record past the orphan cutoff.
    pub async fn backdate(&self, upload_token: &str, created_at: DateTime<Utc>) {
        if let Some(record) = self.records.write().await.get_mut(upload_token) {
            record.created_at = created_at;
        }
    }

    async fn check(&self, op: LedgerOp) -> Result<(), AppError> {
        if self.failing.read().await.contains(&op) {
            return Err(injected(op));
        }
        Ok(())
    }

    async fn transition<F>(&self, op: LedgerOp, upload_token: &str, apply: F) -> Result<bool, AppError>
    where
        F: FnOnce(&mut UploadRecord) -> bool,
    {
        self.check(op).await?;
        let mut records = self.records.write().await;
        Ok(records.get_mut(upload_token).map(apply).unwrap_or(false))
    }
}

#[async_trait::async_trait]
impl UploadLedger for MemoryUploadLedger {
    async fn insert(&self, record: &NewUploadRecord) -> Result<(), AppError> {
        self.check(LedgerOp::Insert).await?;
        let mut records = self.records.write().await;
        if records.contains_key(&record.upload_token)
            || records.values().any(|r| r.staging_key == record.staging_key)
        {
            return Err(AppError::Conflict(format!(
                "upload {} already recorded",
                record.upload_token
            )));
        }
        records.insert(
            record.upload_token.clone(),
            UploadRecord {
                id: record.id,
                upload_token: record.upload_token.clone(),
                staging_key: record.staging_key.clone(),
                content_type: record.content_type.clone(),
                declared_size: record.declared_size,
                status: UploadStatus::Pending,
                credential_expires_at: record.credential_expires_at,
                created_at: record.created_at,
                completed_at: None,
                linked_record_id: None,
                error_message: None,
            },
        );
        Ok(())
    }

    async fn find_by_token(&self, upload_token: &str) -> Result<Option<UploadRecord>, AppError> {
        self.check(LedgerOp::FindByToken).await?;
        Ok(self.records.read().await.get(upload_token).cloned())
    }

    async fn mark_completed_if_pending(&self, upload_token: &str) -> Result<bool, AppError> {
        self.transition(LedgerOp::MarkCompleted, upload_token, |r| {
            if r.status != UploadStatus::Pending {
                return false;
            }
            r.status = UploadStatus::Completed;
            r.completed_at = Some(Utc::now());
            true
        })
        .await
    }

    async fn link(&self, upload_token: &str, record_id: Uuid) -> Result<LinkOutcome, AppError> {
        let linked = self
            .transition(LedgerOp::Link, upload_token, |r| {
                let linkable = matches!(r.status, UploadStatus::Pending | UploadStatus::Completed);
                if r.linked_record_id.is_some() || !linkable {
                    return false;
                }
                r.linked_record_id = Some(record_id);
                r.status = UploadStatus::Completed;
                r.completed_at = Some(Utc::now());
                true
            })
            .await?;

        Ok(if linked {
            LinkOutcome::Linked
        } else {
            LinkOutcome::AlreadyLinked
        })
    }

    async fn mark_failed(&self, upload_token: &str, reason: &str) -> Result<bool, AppError> {
        self.transition(LedgerOp::MarkFailed, upload_token, |r| {
            if r.status != UploadStatus::Pending {
                return false;
            }
            r.status = UploadStatus::Failed;
            r.error_message = Some(reason.to_string());
            true
        })
        .await
    }

    async fn mark_expired_if_pending(&self, upload_token: &str) -> Result<bool, AppError> {
        self.transition(LedgerOp::MarkExpired, upload_token, |r| {
            if r.status != UploadStatus::Pending || r.linked_record_id.is_some() {
                return false;
            }
            r.status = UploadStatus::Expired;
            true
        })
        .await
    }

    async fn find_orphans(
        &self,
        older_than: DateTime<Utc>,
    ) -> Result<Vec<UploadRecord>, AppError> {
        self.check(LedgerOp::FindOrphans).await?;
        let mut orphans: Vec<UploadRecord> = self
            .records
            .read()
            .await
            .values()
            .filter(|r| {
                r.status == UploadStatus::Pending
                    && r.linked_record_id.is_none()
                    && r.created_at < older_than
            })
            .cloned()
            .collect();
        orphans.sort_by_key(|r| r.created_at);
        Ok(orphans)
    }
}

#[derive(Clone, Default)]
pub struct MemoryTransactionRepository {
    rows: Arc<RwLock<HashMap<Uuid, Transaction>>>,
}

impl MemoryTransactionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl TransactionRepository for MemoryTransactionRepository {
    async fn create(&self, transaction: &NewTransaction) -> Result<Transaction, AppError> {
        let now = Utc::now();
        let row = Transaction {
            id: transaction.id,
            date: transaction.date,
            amount: transaction.amount,
            transaction_type: transaction.transaction_type,
            description: transaction.description.clone(),
            image_key: transaction.image_key.clone(),
            upload_id: transaction.upload_id.clone(),
            created_at: now,
            updated_at: now,
        };
        self.rows.write().await.insert(row.id, row.clone());
        Ok(row)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Transaction>, AppError> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Transaction>, AppError> {
        let mut rows: Vec<Transaction> = self.rows.read().await.values().cloned().collect();
        rows.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
        Ok(rows
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count(&self) -> Result<i64, AppError> {
        Ok(self.rows.read().await.len() as i64)
    }

    async fn list_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Transaction>, AppError> {
        let mut rows: Vec<Transaction> = self
            .rows
            .read()
            .await
            .values()
            .filter(|t| t.date >= start && t.date < end)
            .cloned()
            .collect();
        rows.sort_by_key(|t| t.date);
        Ok(rows)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.rows.write().await.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_record(token: &str) -> NewUploadRecord {
        let now = Utc::now();
        NewUploadRecord {
            id: Uuid::new_v4(),
            upload_token: token.to_string(),
            staging_key: format!("staging/2024/01/{}_1.png", token),
            content_type: "image/png".to_string(),
            declared_size: 10,
            credential_expires_at: now + Duration::minutes(15),
            created_at: now,
        }
    }

    #[tokio::test]
    async fn link_succeeds_once() {
        let ledger = MemoryUploadLedger::new();
        ledger.insert(&new_record("a")).await.unwrap();

        assert_eq!(ledger.link("a", Uuid::new_v4()).await.unwrap(), LinkOutcome::Linked);
        assert_eq!(
            ledger.link("a", Uuid::new_v4()).await.unwrap(),
            LinkOutcome::AlreadyLinked
        );

        let record = ledger.find_by_token("a").await.unwrap().unwrap();
        assert_eq!(record.status, UploadStatus::Completed);
        assert!(record.completed_at.is_some());
    }

    #[tokio::test]
    async fn link_stamps_completion_time() {
        let ledger = MemoryUploadLedger::new();
        ledger.insert(&new_record("c")).await.unwrap();
        assert!(ledger.mark_completed_if_pending("c").await.unwrap());
        let confirmed = ledger.find_by_token("c").await.unwrap().unwrap().completed_at;

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        ledger.link("c", Uuid::new_v4()).await.unwrap();

        let linked = ledger.find_by_token("c").await.unwrap().unwrap().completed_at;
        assert!(linked > confirmed);
    }

    #[tokio::test]
    async fn expired_record_cannot_be_linked_or_completed() {
        let ledger = MemoryUploadLedger::new();
        ledger.insert(&new_record("b")).await.unwrap();
        assert!(ledger.mark_expired_if_pending("b").await.unwrap());

        assert!(!ledger.mark_completed_if_pending("b").await.unwrap());
        assert_eq!(
            ledger.link("b", Uuid::new_v4()).await.unwrap(),
            LinkOutcome::AlreadyLinked
        );
    }

    #[tokio::test]
    async fn orphans_exclude_recent_and_linked() {
        let ledger = MemoryUploadLedger::new();
        for token in ["old", "fresh", "linked"] {
            ledger.insert(&new_record(token)).await.unwrap();
        }
        let past = Utc::now() - Duration::hours(48);
        ledger.backdate("old", past).await;
        ledger.backdate("linked", past).await;
        ledger.link("linked", Uuid::new_v4()).await.unwrap();

        let orphans = ledger
            .find_orphans(Utc::now() - Duration::hours(24))
            .await
            .unwrap();
        let tokens: Vec<_> = orphans.iter().map(|r| r.upload_token.as_str()).collect();
        assert_eq!(tokens, vec!["old"]);
    }

    #[tokio::test]
    async fn duplicate_token_is_rejected() {
        let ledger = MemoryUploadLedger::new();
        ledger.insert(&new_record("dup")).await.unwrap();
        assert!(matches!(
            ledger.insert(&new_record("dup")).await,
            Err(AppError::Conflict(_))
        ));
    }
}
