use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Spending,
    Earning,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Spending => "spending",
            TransactionType::Earning => "earning",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("type must be 'spending' or 'earning', got '{0}'")]
pub struct UnknownTransactionType(pub String);

impl FromStr for TransactionType {
    type Err = UnknownTransactionType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spending" => Ok(TransactionType::Spending),
            "earning" => Ok(TransactionType::Earning),
            other => Err(UnknownTransactionType(other.to_string())),
        }
    }
}

impl TryFrom<String> for TransactionType {
    type Error = UnknownTransactionType;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A stored spending or earning entry.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct Transaction {
    pub id: Uuid,
    pub date: NaiveDate,
    pub amount: Decimal,
    #[cfg_attr(feature = "sqlx", sqlx(rename = "type", try_from = "String"))]
    pub transaction_type: TransactionType,
    pub description: String,
    /// Permanent object key of the attached receipt
    pub image_key: Option<String>,
    /// Upload token that was linked to this record
    pub upload_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated values ready to be inserted.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub id: Uuid,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub transaction_type: TransactionType,
    pub description: String,
    pub image_key: Option<String>,
    pub upload_id: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateTransactionRequest {
    /// Date in `YYYY-MM-DD` format
    #[validate(length(min = 1, message = "date is required"))]
    pub date: String,
    /// Positive amount
    #[schema(value_type = f64)]
    pub amount: Decimal,
    /// `spending` or `earning`
    #[serde(rename = "type")]
    pub transaction_type: String,
    #[serde(default)]
    #[validate(length(max = 1000, message = "description must be at most 1000 characters"))]
    pub description: Option<String>,
    /// Upload ID returned by `POST /uploads`
    #[serde(default)]
    pub upload_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TransactionResponse {
    pub id: Uuid,
    pub date: NaiveDate,
    #[schema(value_type = f64)]
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub description: String,
    /// Presigned GET URL for the receipt, minted per response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TransactionResponse {
    pub fn new(transaction: Transaction, image_url: Option<String>) -> Self {
        Self {
            id: transaction.id,
            date: transaction.date,
            amount: transaction.amount,
            transaction_type: transaction.transaction_type,
            description: transaction.description,
            image_url,
            image_key: transaction.image_key,
            upload_id: transaction.upload_id,
            created_at: transaction.created_at,
            updated_at: transaction.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListTransactionsResponse {
    pub transactions: Vec<TransactionResponse>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListTransactionsQuery {
    /// Page size, 1 to 100 (default 20)
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AggregateQuery {
    /// Month in `YYYY-MM` format
    pub month: String,
}

/// Income and spending totals for one calendar month
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AggregatedData {
    pub month: String,
    #[schema(value_type = f64)]
    pub income: Decimal,
    #[schema(value_type = f64)]
    pub spending: Decimal,
    #[schema(value_type = f64)]
    pub net_total: Decimal,
}
