//! Storage abstraction trait
//!
//! This module defines the Storage trait that every object store gateway implements.

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to issue credential: {0}")]
    Credential(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Size and declared media type of a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectStat {
    pub size: u64,
    /// `Content-Type` the object was written with, if the backend recorded one.
    pub content_type: Option<String>,
}

/// Reject keys that could escape the bucket prefix layout.
pub fn validate_key(storage_key: &str) -> StorageResult<()> {
    if storage_key.is_empty() || storage_key.contains("..") || storage_key.starts_with('/') {
        return Err(StorageError::InvalidKey(format!(
            "Storage key is not allowed: {:?}",
            storage_key
        )));
    }
    Ok(())
}

/// Object store gateway
///
/// The coordinator and record service talk to the store only through this trait,
/// held as `Arc<dyn Storage>`.
///
/// "Object absent" is never an error for `exists`; only connectivity and
/// permission failures are.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Generate a presigned PUT URL for a direct client upload.
    ///
    /// The client must send the returned `content_type` as its `Content-Type`
    /// header; it is handed back in the credential response. Signatures are not
    /// guaranteed to cover that header, so callers check it again with [`Storage::stat`].
    async fn presigned_put_url(
        &self,
        storage_key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> StorageResult<String>;

    /// Generate a presigned GET URL. An empty key yields an empty string.
    async fn presigned_get_url(
        &self,
        storage_key: &str,
        expires_in: Duration,
    ) -> StorageResult<String>;

    /// Check if an object exists
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    /// Size and content type of a stored object. A missing object is `NotFound`.
    async fn stat(&self, storage_key: &str) -> StorageResult<ObjectStat>;

    /// Server-side copy of one object to another key
    async fn copy(&self, from_key: &str, to_key: &str) -> StorageResult<()>;

    /// Delete an object. Deleting the empty key is a no-op.
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    /// Write an object through the server (tests and tooling)
    async fn put(&self, storage_key: &str, data: Bytes, content_type: &str) -> StorageResult<()>;

    /// Short backend name for logs and health output
    fn backend_name(&self) -> &'static str;
}
