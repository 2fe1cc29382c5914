use cashflow_core::AppError;
use cashflow_storage::StorageError;

/// Failures of the staged-upload lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Object store unavailable: {0}")]
    Store(#[source] StorageError),

    #[error("Failed to issue upload credential: {0}")]
    Credential(#[source] StorageError),

    #[error("Failed to promote upload: {0}")]
    Promotion(#[source] StorageError),

    #[error("Failed to persist upload state: {0}")]
    Persistence(#[source] AppError),
}

impl UploadError {
    /// Whether the caller supplied a bad token or an unusable upload.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            UploadError::Validation(_) | UploadError::NotFound(_) | UploadError::Conflict(_)
        )
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Validation(msg) => AppError::InvalidInput(msg),
            UploadError::NotFound(msg) => AppError::NotFound(msg),
            UploadError::Conflict(msg) => AppError::Conflict(msg),
            UploadError::Store(_) | UploadError::Credential(_) | UploadError::Promotion(_) => {
                AppError::Storage(err.to_string())
            }
            UploadError::Persistence(inner) => inner,
        }
    }
}
