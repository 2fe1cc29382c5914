//! Financial record service
//!
//! CRUD and monthly aggregation for spending/earning entries. Attaching a
//! receipt goes through [`UploadCoordinator::verify_and_link`].

use crate::best_effort::best_effort;
use crate::upload::UploadCoordinator;
use cashflow_core::models::{
    AggregatedData, CreateTransactionRequest, ListTransactionsResponse, NewTransaction,
    Transaction, TransactionResponse, TransactionType,
};
use cashflow_core::AppError;
use cashflow_db::TransactionRepository;
use cashflow_storage::Storage;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub const DEFAULT_LIST_LIMIT: i64 = 20;
pub const MAX_LIST_LIMIT: i64 = 100;
const MAX_DESCRIPTION_CHARS: usize = 1000;

#[derive(Clone)]
pub struct TransactionService {
    repository: Arc<dyn TransactionRepository>,
    uploads: Arc<UploadCoordinator>,
    storage: Arc<dyn Storage>,
    read_url_ttl: Duration,
}

impl TransactionService {
    pub fn new(
        repository: Arc<dyn TransactionRepository>,
        uploads: Arc<UploadCoordinator>,
        storage: Arc<dyn Storage>,
    ) -> Self {
        let read_url_ttl = uploads.policy().read_url_ttl;
        Self {
            repository,
            uploads,
            storage,
            read_url_ttl,
        }
    }

    #[tracing::instrument(skip(self, request), fields(transaction.operation = "create"))]
    pub async fn create(
        &self,
        request: CreateTransactionRequest,
    ) -> Result<TransactionResponse, AppError> {
        if request.amount <= Decimal::ZERO {
            return Err(AppError::InvalidInput(
                "amount must be greater than 0".to_string(),
            ));
        }

        let transaction_type: TransactionType = request
            .transaction_type
            .parse()
            .map_err(|e: cashflow_core::models::UnknownTransactionType| {
                AppError::InvalidInput(e.to_string())
            })?;

        let date = NaiveDate::parse_from_str(&request.date, "%Y-%m-%d").map_err(|_| {
            AppError::InvalidInput("invalid date format, expected YYYY-MM-DD".to_string())
        })?;

        let description = request.description.unwrap_or_default();
        if description.chars().count() > MAX_DESCRIPTION_CHARS {
            return Err(AppError::InvalidInput(format!(
                "description must be at most {} characters",
                MAX_DESCRIPTION_CHARS
            )));
        }

        let id = Uuid::new_v4();
        let upload_id = request.upload_id.filter(|u| !u.trim().is_empty());

        let image_key = match upload_id.as_deref() {
            Some(token) => {
                let key = self.uploads.verify_and_link(token, id).await.map_err(|e| {
                    if e.is_client_error() {
                        AppError::InvalidInput(format!("invalid upload_id: {}", e))
                    } else {
                        AppError::from(e)
                    }
                })?;
                Some(key).filter(|k| !k.is_empty())
            }
            None => None,
        };

        let linked = image_key.is_some();
        let transaction = self
            .repository
            .create(&NewTransaction {
                id,
                date,
                amount: request.amount,
                transaction_type,
                description,
                image_key,
                upload_id,
            })
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    transaction_id = %id,
                    upload_linked = linked,
                    "Failed to store transaction"
                );
                e
            })?;

        tracing::info!(
            transaction_id = %transaction.id,
            transaction_type = %transaction.transaction_type,
            has_image = transaction.image_key.is_some(),
            "Transaction created"
        );

        Ok(self.respond(transaction).await)
    }

    #[tracing::instrument(skip(self), fields(transaction.operation = "list"))]
    pub async fn list(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<ListTransactionsResponse, AppError> {
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);
        let offset = offset.unwrap_or(0).max(0);

        let rows = self.repository.list(limit, offset).await?;
        let total = self.repository.count().await?;

        let mut transactions = Vec::with_capacity(rows.len());
        for row in rows {
            transactions.push(self.respond(row).await);
        }

        Ok(ListTransactionsResponse {
            transactions,
            total,
            limit,
            offset,
        })
    }

    #[tracing::instrument(skip(self), fields(transaction.operation = "get"))]
    pub async fn get(&self, id: Uuid) -> Result<TransactionResponse, AppError> {
        let transaction = self
            .repository
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound("transaction not found".to_string()))?;

        Ok(self.respond(transaction).await)
    }

    #[tracing::instrument(skip(self), fields(transaction.operation = "aggregate"))]
    pub async fn monthly_aggregate(&self, month: &str) -> Result<AggregatedData, AppError> {
        let (start, end) = parse_month(month)?;
        let rows = self.repository.list_between(start, end).await?;
        Ok(aggregate_month(month, &rows))
    }

    /// Delete a record. The receipt object is removed best-effort; the row is
    /// deleted regardless.
    #[tracing::instrument(skip(self), fields(transaction.operation = "delete"))]
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let transaction = self
            .repository
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound("transaction not found".to_string()))?;

        if let Some(ref key) = transaction.image_key {
            best_effort("delete_receipt", key, self.storage.delete(key)).await;
        }

        if !self.repository.delete(id).await? {
            return Err(AppError::NotFound("transaction not found".to_string()));
        }

        tracing::info!(transaction_id = %id, "Transaction deleted");
        Ok(())
    }

    async fn respond(&self, transaction: Transaction) -> TransactionResponse {
        let image_url = match transaction.image_key.as_deref() {
            Some(key) if !key.is_empty() => {
                best_effort(
                    "presign_receipt",
                    key,
                    self.storage.presigned_get_url(key, self.read_url_ttl),
                )
                .await
            }
            _ => None,
        };
        TransactionResponse::new(transaction, image_url)
    }
}

/// Parse `YYYY-MM` into the half-open date range `[first day, first day of next month)`.
pub fn parse_month(month: &str) -> Result<(NaiveDate, NaiveDate), AppError> {
    let invalid = || AppError::InvalidInput("invalid month format, expected YYYY-MM".to_string());

    let (year, month_num) = month.split_once('-').ok_or_else(invalid)?;
    if year.len() != 4 || month_num.len() != 2 {
        return Err(invalid());
    }
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month_num: u32 = month_num.parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&month_num) {
        return Err(AppError::InvalidInput(
            "month must be between 01 and 12".to_string(),
        ));
    }

    let start = NaiveDate::from_ymd_opt(year, month_num, 1).ok_or_else(invalid)?;
    let end = if month_num == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month_num + 1, 1)
    }
    .ok_or_else(invalid)?;

    Ok((start, end))
}

/// Sum earnings as income and spendings as spending for the rows dated in `month`.
pub fn aggregate_month(month: &str, transactions: &[Transaction]) -> AggregatedData {
    let in_month = parse_month(month).ok();
    let mut income = Decimal::ZERO;
    let mut spending = Decimal::ZERO;

    for t in transactions {
        if let Some((start, end)) = in_month {
            if t.date < start || t.date >= end {
                continue;
            }
        }
        match t.transaction_type {
            TransactionType::Earning => income += t.amount,
            TransactionType::Spending => spending += t.amount,
        }
    }

    AggregatedData {
        month: month.to_string(),
        income,
        spending,
        net_total: income - spending,
    }
}
