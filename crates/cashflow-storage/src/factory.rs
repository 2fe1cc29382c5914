#[cfg(feature = "storage-s3")]
use crate::S3Storage;
use crate::{Storage, StorageResult};
use cashflow_core::S3Settings;
use std::sync::Arc;

/// Create the storage backend from the S3 settings block.
#[cfg(feature = "storage-s3")]
pub fn create_storage(settings: &S3Settings) -> StorageResult<Arc<dyn Storage>> {
    let storage = S3Storage::new(settings)?;
    tracing::info!(
        bucket = %settings.bucket,
        region = %settings.region,
        endpoint = ?settings.endpoint,
        "S3 storage initialized"
    );
    Ok(Arc::new(storage))
}

#[cfg(not(feature = "storage-s3"))]
pub fn create_storage(_settings: &S3Settings) -> StorageResult<Arc<dyn Storage>> {
    Err(crate::StorageError::Config(
        "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
    ))
}
