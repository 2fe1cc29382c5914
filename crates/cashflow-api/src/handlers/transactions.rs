use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use cashflow_core::models::{
    AggregateQuery, AggregatedData, CreateTransactionRequest, ListTransactionsQuery,
    ListTransactionsResponse, TransactionResponse,
};
use cashflow_core::AppError;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Create a spending or earning record, optionally attaching an uploaded receipt
#[utoipa::path(
    post,
    path = "/api/v1/transactions",
    tag = "transactions",
    request_body = CreateTransactionRequest,
    responses(
        (status = 201, description = "Transaction created", body = TransactionResponse),
        (status = 400, description = "Invalid input or unusable upload_id", body = ErrorResponse),
        (status = 502, description = "Receipt could not be promoted", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, request),
    fields(
        transaction_type = %request.transaction_type,
        has_upload = request.upload_id.is_some(),
        operation = "create_transaction"
    )
)]
pub async fn create_transaction(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<CreateTransactionRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate().map_err(AppError::from)?;
    let transaction = state.transactions.create(request).await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

/// List transactions, newest first
#[utoipa::path(
    get,
    path = "/api/v1/transactions",
    tag = "transactions",
    params(ListTransactionsQuery),
    responses(
        (status = 200, description = "Page of transactions", body = ListTransactionsResponse)
    )
)]
#[tracing::instrument(skip(state, query), fields(operation = "list_transactions"))]
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListTransactionsQuery>, QueryRejection>,
) -> Result<impl IntoResponse, HttpAppError> {
    let Query(query) = query?;
    let page = state.transactions.list(query.limit, query.offset).await?;
    Ok(Json(page))
}

/// Income, spending and net total for one month
#[utoipa::path(
    get,
    path = "/api/v1/transactions/aggregate",
    tag = "transactions",
    params(AggregateQuery),
    responses(
        (status = 200, description = "Monthly totals", body = AggregatedData),
        (status = 400, description = "Missing or malformed month", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, query), fields(operation = "aggregate_transactions"))]
pub async fn aggregate_transactions(
    State(state): State<Arc<AppState>>,
    query: Result<Query<AggregateQuery>, QueryRejection>,
) -> Result<impl IntoResponse, HttpAppError> {
    let Query(query) = query?;
    let totals = state.transactions.monthly_aggregate(&query.month).await?;
    Ok(Json(totals))
}

/// Get a transaction by ID
#[utoipa::path(
    get,
    path = "/api/v1/transactions/{id}",
    tag = "transactions",
    params(
        ("id" = Uuid, Path, description = "Transaction ID")
    ),
    responses(
        (status = 200, description = "Transaction found", body = TransactionResponse),
        (status = 404, description = "Transaction not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(operation = "get_transaction"))]
pub async fn get_transaction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let transaction = state.transactions.get(id).await?;
    Ok(Json(transaction))
}

/// Delete a transaction and, best-effort, its receipt
#[utoipa::path(
    delete,
    path = "/api/v1/transactions/{id}",
    tag = "transactions",
    params(
        ("id" = Uuid, Path, description = "Transaction ID")
    ),
    responses(
        (status = 204, description = "Transaction deleted"),
        (status = 404, description = "Transaction not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(operation = "delete_transaction"))]
pub async fn delete_transaction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.transactions.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
