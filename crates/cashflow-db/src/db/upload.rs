use cashflow_core::models::{NewUploadRecord, UploadRecord};
use cashflow_core::AppError;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

const UPLOAD_COLUMNS: &str = r#"
    id, upload_token, staging_key, content_type, declared_size, status,
    credential_expires_at, created_at, completed_at, linked_record_id, error_message
"#;

/// Result of a conditional link write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    Linked,
    /// No row matched: the upload is already linked or no longer linkable.
    AlreadyLinked,
}

/// Durable record of every issued upload credential.
///
/// Every state change is a conditional write so that concurrent callers
/// cannot both win the same transition.
#[async_trait::async_trait]
pub trait UploadLedger: Send + Sync {
    async fn insert(&self, record: &NewUploadRecord) -> Result<(), AppError>;

    async fn find_by_token(&self, upload_token: &str) -> Result<Option<UploadRecord>, AppError>;

    /// `pending -> completed`. Returns false when the record was not pending.
    async fn mark_completed_if_pending(&self, upload_token: &str) -> Result<bool, AppError>;

    /// Set `linked_record_id` exactly once and mark the upload completed.
    async fn link(&self, upload_token: &str, record_id: Uuid) -> Result<LinkOutcome, AppError>;

    /// `pending -> failed` with a reason.
    async fn mark_failed(&self, upload_token: &str, reason: &str) -> Result<bool, AppError>;

    /// `pending -> expired`, only while still unlinked.
    async fn mark_expired_if_pending(&self, upload_token: &str) -> Result<bool, AppError>;

    /// Pending, unlinked uploads created before `older_than`, oldest first.
    async fn find_orphans(&self, older_than: DateTime<Utc>)
        -> Result<Vec<UploadRecord>, AppError>;
}

/// Repository for the `upload_requests` table
#[derive(Clone)]
pub struct PgUploadLedger {
    pool: PgPool,
}

impl PgUploadLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl UploadLedger for PgUploadLedger {
    #[tracing::instrument(skip(self, record), fields(
        db.system = "postgresql",
        db.table = "upload_requests",
        db.operation = "insert",
        upload_token = %record.upload_token
    ))]
    async fn insert(&self, record: &NewUploadRecord) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO upload_requests (
                id, upload_token, staging_key, content_type, declared_size,
                status, credential_expires_at, created_at
            )
            VALUES ($1, $2, $3, $4, $5, 'pending', $6, $7)
            "#,
        )
        .bind(record.id)
        .bind(&record.upload_token)
        .bind(&record.staging_key)
        .bind(&record.content_type)
        .bind(record.declared_size)
        .bind(record.credential_expires_at)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(
        db.system = "postgresql",
        db.table = "upload_requests",
        db.operation = "select"
    ))]
    async fn find_by_token(&self, upload_token: &str) -> Result<Option<UploadRecord>, AppError> {
        let query = format!(
            "SELECT {} FROM upload_requests WHERE upload_token = $1",
            UPLOAD_COLUMNS
        );
        let record = sqlx::query_as::<_, UploadRecord>(&query)
            .bind(upload_token)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    #[tracing::instrument(skip(self), fields(
        db.system = "postgresql",
        db.table = "upload_requests",
        db.operation = "update"
    ))]
    async fn mark_completed_if_pending(&self, upload_token: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE upload_requests
            SET status = 'completed', completed_at = NOW()
            WHERE upload_token = $1 AND status = 'pending'
            "#,
        )
        .bind(upload_token)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), fields(
        db.system = "postgresql",
        db.table = "upload_requests",
        db.operation = "update"
    ))]
    async fn link(&self, upload_token: &str, record_id: Uuid) -> Result<LinkOutcome, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE upload_requests
            SET linked_record_id = $2,
                status = 'completed',
                completed_at = NOW()
            WHERE upload_token = $1
              AND linked_record_id IS NULL
              AND status IN ('pending', 'completed')
            "#,
        )
        .bind(upload_token)
        .bind(record_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            Ok(LinkOutcome::AlreadyLinked)
        } else {
            Ok(LinkOutcome::Linked)
        }
    }

    #[tracing::instrument(skip(self), fields(
        db.system = "postgresql",
        db.table = "upload_requests",
        db.operation = "update"
    ))]
    async fn mark_failed(&self, upload_token: &str, reason: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE upload_requests
            SET status = 'failed', error_message = $2
            WHERE upload_token = $1 AND status = 'pending'
            "#,
        )
        .bind(upload_token)
        .bind(reason)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), fields(
        db.system = "postgresql",
        db.table = "upload_requests",
        db.operation = "update"
    ))]
    async fn mark_expired_if_pending(&self, upload_token: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE upload_requests
            SET status = 'expired'
            WHERE upload_token = $1
              AND status = 'pending'
              AND linked_record_id IS NULL
            "#,
        )
        .bind(upload_token)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), fields(
        db.system = "postgresql",
        db.table = "upload_requests",
        db.operation = "select"
    ))]
    async fn find_orphans(
        &self,
        older_than: DateTime<Utc>,
    ) -> Result<Vec<UploadRecord>, AppError> {
        let query = format!(
            r#"
            SELECT {}
            FROM upload_requests
            WHERE status = 'pending'
              AND linked_record_id IS NULL
              AND created_at < $1
            ORDER BY created_at ASC
            "#,
            UPLOAD_COLUMNS
        );
        let records = sqlx::query_as::<_, UploadRecord>(&query)
            .bind(older_than)
            .fetch_all(&self.pool)
            .await?;

        Ok(records)
    }
}
