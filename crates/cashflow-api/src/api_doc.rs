//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use cashflow_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Cashflow API",
        version = "0.1.0",
        description = "Personal finance ledger. Receipts are uploaded directly to object storage with a presigned URL and attached to a spending or earning record by upload_id. All endpoints are versioned under /api/v1/."
    ),
    paths(
        // Uploads
        handlers::uploads::create_upload,
        handlers::uploads::get_upload_status,
        // Transactions
        handlers::transactions::create_transaction,
        handlers::transactions::list_transactions,
        handlers::transactions::aggregate_transactions,
        handlers::transactions::get_transaction,
        handlers::transactions::delete_transaction,
    ),
    components(
        schemas(
            error::ErrorResponse,
            models::UploadStatus,
            models::CreateUploadRequest,
            models::CreateUploadResponse,
            models::UploadStatusResponse,
            models::TransactionType,
            models::CreateTransactionRequest,
            models::TransactionResponse,
            models::ListTransactionsResponse,
            models::AggregatedData,
        )
    ),
    tags(
        (name = "uploads", description = "Presigned receipt uploads"),
        (name = "transactions", description = "Spending and earning records")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_every_route() {
        let spec = ApiDoc::openapi();
        for path in [
            "/api/v1/uploads",
            "/api/v1/uploads/{upload_id}",
            "/api/v1/transactions",
            "/api/v1/transactions/aggregate",
            "/api/v1/transactions/{id}",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
