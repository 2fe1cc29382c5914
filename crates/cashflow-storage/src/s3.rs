use crate::traits::{validate_key, ObjectStat, Storage, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use cashflow_core::S3Settings;
use http::Method;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::Error as ObjectStoreError;
use object_store::{
    Attribute, Attributes, ClientOptions, GetOptions, ObjectStore, ObjectStoreExt, PutOptions,
    PutPayload, Result as ObjectResult,
};
use std::time::Duration;

/// S3 storage implementation
#[derive(Clone)]
pub struct S3Storage {
    store: AmazonS3,
    bucket: String,
}

impl S3Storage {
    /// Create a new S3Storage instance from explicit settings.
    ///
    /// Static credentials in `settings` take precedence; otherwise the standard
    /// AWS environment and instance credential chain is used.
    pub fn new(settings: &S3Settings) -> StorageResult<Self> {
        if settings.bucket.trim().is_empty() {
            return Err(StorageError::Config("S3 bucket name is empty".to_string()));
        }

        let mut builder = AmazonS3Builder::from_env()
            .with_region(settings.region.clone())
            .with_bucket_name(settings.bucket.clone())
            .with_client_options(ClientOptions::new().with_timeout(settings.request_timeout));

        if let Some(ref endpoint) = settings.endpoint {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        if let (Some(key_id), Some(secret)) =
            (&settings.access_key_id, &settings.secret_access_key)
        {
            builder = builder
                .with_access_key_id(key_id.clone())
                .with_secret_access_key(secret.clone());
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::Config(e.to_string()))?;

        Ok(S3Storage {
            store,
            bucket: settings.bucket.clone(),
        })
    }

    async fn sign(
        &self,
        method: Method,
        storage_key: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        validate_key(storage_key)?;
        let location = Path::from(storage_key.to_string());
        let url_result: ObjectResult<_> = self
            .store
            .signed_url(method.clone(), &location, expires_in)
            .await;

        url_result.map(|url| url.to_string()).map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %storage_key,
                method = %method,
                "S3 presign failed"
            );
            StorageError::Credential(e.to_string())
        })
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn presigned_put_url(
        &self,
        storage_key: &str,
        _content_type: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        self.sign(Method::PUT, storage_key, expires_in).await
    }

    async fn presigned_get_url(
        &self,
        storage_key: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        if storage_key.is_empty() {
            return Ok(String::new());
        }
        self.sign(Method::GET, storage_key, expires_in).await
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        let start = std::time::Instant::now();
        let location = Path::from(storage_key.to_string());
        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %storage_key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 head failed"
                );
                Err(StorageError::Backend(e.to_string()))
            }
        }
    }

    async fn stat(&self, storage_key: &str) -> StorageResult<ObjectStat> {
        let location = Path::from(storage_key.to_string());
        let options = GetOptions {
            head: true,
            ..Default::default()
        };
        match self.store.get_opts(&location, options).await {
            Ok(result) => Ok(ObjectStat {
                size: result.meta.size,
                content_type: stored_content_type(&result.attributes),
            }),
            Err(ObjectStoreError::NotFound { .. }) => {
                Err(StorageError::NotFound(storage_key.to_string()))
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %storage_key,
                    "S3 stat failed"
                );
                Err(StorageError::Backend(e.to_string()))
            }
        }
    }

    async fn copy(&self, from_key: &str, to_key: &str) -> StorageResult<()> {
        validate_key(to_key)?;
        let start = std::time::Instant::now();
        let from = Path::from(from_key.to_string());
        let to = Path::from(to_key.to_string());

        let copy_result: ObjectResult<_> = self.store.copy(&from, &to).await;

        copy_result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                from_key = %from_key,
                to_key = %to_key,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 copy failed"
            );
            match e {
                ObjectStoreError::NotFound { .. } => StorageError::NotFound(from_key.to_string()),
                other => StorageError::Backend(other.to_string()),
            }
        })?;

        tracing::info!(
            bucket = %self.bucket,
            from_key = %from_key,
            to_key = %to_key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 copy successful"
        );

        Ok(())
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        if storage_key.is_empty() {
            return Ok(());
        }

        let start = std::time::Instant::now();
        let location = Path::from(storage_key.to_string());

        let result: ObjectResult<_> = self.store.delete(&location).await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %storage_key,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 delete failed"
            );
            StorageError::Backend(e.to_string())
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %storage_key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }

    async fn put(&self, storage_key: &str, data: Bytes, content_type: &str) -> StorageResult<()> {
        validate_key(storage_key)?;
        let size = data.len() as u64;
        let location = Path::from(storage_key.to_string());
        let start = std::time::Instant::now();

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());
        let options = PutOptions {
            attributes,
            ..Default::default()
        };
        let result: ObjectResult<_> = self
            .store
            .put_opts(&location, PutPayload::from(data), options)
            .await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %storage_key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 put failed"
            );
            StorageError::Backend(e.to_string())
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %storage_key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 put successful"
        );

        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "s3"
    }
}

fn stored_content_type(attributes: &Attributes) -> Option<String> {
    attributes
        .get(&Attribute::ContentType)
        .map(|value| String::from(&**value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> S3Settings {
        S3Settings {
            bucket: "receipts".to_string(),
            region: "us-east-1".to_string(),
            endpoint: Some("http://localhost:9000".to_string()),
            access_key_id: Some("minioadmin".to_string()),
            secret_access_key: Some("minioadmin".to_string()),
            request_timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn presigned_put_is_signed_locally_with_expiry() {
        let storage = S3Storage::new(&settings()).expect("storage");
        let url = storage
            .presigned_put_url(
                "staging/2024/05/tok_1715000000.png",
                "image/png",
                Duration::from_secs(900),
            )
            .await
            .expect("signed url");

        assert!(url.starts_with("http://localhost:9000/"));
        assert!(url.contains("staging/2024/05/tok_1715000000.png"));
        assert!(url.contains("X-Amz-Expires=900"));
        assert!(url.contains("X-Amz-Signature="));
    }

    #[tokio::test]
    async fn presigned_get_for_empty_key_is_empty() {
        let storage = S3Storage::new(&settings()).expect("storage");
        let url = storage
            .presigned_get_url("", Duration::from_secs(60))
            .await
            .expect("no-op");
        assert!(url.is_empty());
    }

    #[tokio::test]
    async fn traversal_keys_are_not_signed() {
        let storage = S3Storage::new(&settings()).expect("storage");
        let err = storage
            .presigned_put_url("../secret", "image/png", Duration::from_secs(60))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }

    #[tokio::test]
    async fn deleting_empty_key_is_noop() {
        let storage = S3Storage::new(&settings()).expect("storage");
        storage.delete("").await.expect("no-op delete");
        assert_eq!(storage.backend_name(), "s3");
    }

    #[test]
    fn content_type_is_read_from_object_attributes() {
        let mut attributes = Attributes::new();
        assert_eq!(stored_content_type(&attributes), None);

        attributes.insert(Attribute::ContentType, "image/png".to_string().into());
        assert_eq!(
            stored_content_type(&attributes).as_deref(),
            Some("image/png")
        );
    }

    #[test]
    fn empty_bucket_is_a_config_error() {
        let mut s = settings();
        s.bucket = String::new();
        assert!(matches!(S3Storage::new(&s), Err(StorageError::Config(_))));
    }
}
