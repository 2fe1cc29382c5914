use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use cashflow_core::models::{CreateUploadRequest, CreateUploadResponse, UploadStatusResponse};
use cashflow_core::AppError;
use std::sync::Arc;
use validator::Validate;

/// Request a presigned URL for a direct receipt upload
#[utoipa::path(
    post,
    path = "/api/v1/uploads",
    tag = "uploads",
    request_body = CreateUploadRequest,
    responses(
        (status = 200, description = "Presigned URL generated", body = CreateUploadResponse),
        (status = 400, description = "Invalid content type or size", body = ErrorResponse),
        (status = 502, description = "Object store unavailable", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, request),
    fields(
        content_type = %request.content_type,
        file_size = request.file_size,
        operation = "request_upload_credential"
    )
)]
pub async fn create_upload(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<CreateUploadRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate().map_err(AppError::from)?;

    let credential = state
        .uploads
        .request_credential(&request.content_type, request.file_size)
        .await?;

    Ok(Json(CreateUploadResponse::from(credential)))
}

/// Get the status of a staged upload
#[utoipa::path(
    get,
    path = "/api/v1/uploads/{upload_id}",
    tag = "uploads",
    params(
        ("upload_id" = String, Path, description = "Upload ID returned when the URL was issued")
    ),
    responses(
        (status = 200, description = "Upload status", body = UploadStatusResponse),
        (status = 404, description = "Upload not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(operation = "get_upload_status"))]
pub async fn get_upload_status(
    State(state): State<Arc<AppState>>,
    Path(upload_id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    let record = state.uploads.get_status(&upload_id).await?;
    Ok(Json(UploadStatusResponse::from(record)))
}
