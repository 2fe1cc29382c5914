use cashflow_core::models::{NewTransaction, Transaction};
use cashflow_core::AppError;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

const TRANSACTION_COLUMNS: &str = r#"
    id, date, amount, type, description, image_key, upload_id, created_at, updated_at
"#;

#[async_trait::async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn create(&self, transaction: &NewTransaction) -> Result<Transaction, AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<Transaction>, AppError>;

    /// Newest first: `date DESC, created_at DESC`.
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Transaction>, AppError>;

    async fn count(&self) -> Result<i64, AppError>;

    /// Transactions with `start <= date < end`.
    async fn list_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Transaction>, AppError>;

    /// Returns false when no row had this id.
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;
}

/// Repository for the `transactions` table
#[derive(Clone)]
pub struct PgTransactionRepository {
    pool: PgPool,
}

impl PgTransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl TransactionRepository for PgTransactionRepository {
    #[tracing::instrument(skip(self, transaction), fields(
        db.system = "postgresql",
        db.table = "transactions",
        db.operation = "insert",
        transaction_id = %transaction.id
    ))]
    async fn create(&self, transaction: &NewTransaction) -> Result<Transaction, AppError> {
        let query = format!(
            r#"
            INSERT INTO transactions (id, date, amount, type, description, image_key, upload_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            TRANSACTION_COLUMNS
        );
        let row = sqlx::query_as::<_, Transaction>(&query)
            .bind(transaction.id)
            .bind(transaction.date)
            .bind(transaction.amount)
            .bind(transaction.transaction_type.as_str())
            .bind(&transaction.description)
            .bind(&transaction.image_key)
            .bind(&transaction.upload_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(row)
    }

    #[tracing::instrument(skip(self), fields(
        db.system = "postgresql",
        db.table = "transactions",
        db.operation = "select"
    ))]
    async fn get(&self, id: Uuid) -> Result<Option<Transaction>, AppError> {
        let query = format!(
            "SELECT {} FROM transactions WHERE id = $1",
            TRANSACTION_COLUMNS
        );
        let row = sqlx::query_as::<_, Transaction>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    #[tracing::instrument(skip(self), fields(
        db.system = "postgresql",
        db.table = "transactions",
        db.operation = "select"
    ))]
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Transaction>, AppError> {
        let query = format!(
            r#"
            SELECT {}
            FROM transactions
            ORDER BY date DESC, created_at DESC
            LIMIT $1 OFFSET $2
            "#,
            TRANSACTION_COLUMNS
        );
        let rows = sqlx::query_as::<_, Transaction>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn count(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    #[tracing::instrument(skip(self), fields(
        db.system = "postgresql",
        db.table = "transactions",
        db.operation = "select"
    ))]
    async fn list_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Transaction>, AppError> {
        let query = format!(
            r#"
            SELECT {}
            FROM transactions
            WHERE date >= $1 AND date < $2
            ORDER BY date ASC
            "#,
            TRANSACTION_COLUMNS
        );
        let rows = sqlx::query_as::<_, Transaction>(&query)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    #[tracing::instrument(skip(self), fields(
        db.system = "postgresql",
        db.table = "transactions",
        db.operation = "delete"
    ))]
    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM transactions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
