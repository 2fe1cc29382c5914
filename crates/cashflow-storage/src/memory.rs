//! In-process object store.
//!
//! Backs local development without a bucket and the service/API test suites.
//! Presigned URLs use a `memory://` scheme and cannot be dereferenced; tests
//! simulate the client upload with [`Storage::put`].
//!
//! Individual operations can be made to fail with [`MemoryStorage::fail`].

use crate::traits::{validate_key, ObjectStat, Storage, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Gateway operation that can be forced to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageOp {
    PresignPut,
    PresignGet,
    Exists,
    Stat,
    Copy,
    Delete,
    Put,
}

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    content_type: String,
}

#[derive(Clone, Default)]
pub struct MemoryStorage {
    objects: Arc<RwLock<HashMap<String, StoredObject>>>,
    failing: Arc<RwLock<HashSet<StorageOp>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call of `op` return a backend error.
    pub async fn fail(&self, op: StorageOp) {
        self.failing.write().await.insert(op);
    }

    pub async fn recover(&self, op: StorageOp) {
        self.failing.write().await.remove(&op);
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub async fn content_type_of(&self, storage_key: &str) -> Option<String> {
        self.objects
            .read()
            .await
            .get(storage_key)
            .map(|o| o.content_type.clone())
    }

    async fn check(&self, op: StorageOp) -> StorageResult<()> {
        if self.failing.read().await.contains(&op) {
            let message = format!("injected {:?} failure", op);
            return Err(match op {
                StorageOp::PresignPut | StorageOp::PresignGet => StorageError::Credential(message),
                _ => StorageError::Backend(message),
            });
        }
        Ok(())
    }

    fn url(method: &str, storage_key: &str, expires_in: Duration) -> String {
        let expires_at = chrono::Utc::now().timestamp() + expires_in.as_secs() as i64;
        format!(
            "memory://{}?method={}&expires={}",
            storage_key, method, expires_at
        )
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn presigned_put_url(
        &self,
        storage_key: &str,
        _content_type: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        self.check(StorageOp::PresignPut).await?;
        validate_key(storage_key)?;
        Ok(Self::url("PUT", storage_key, expires_in))
    }

    async fn presigned_get_url(
        &self,
        storage_key: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        if storage_key.is_empty() {
            return Ok(String::new());
        }
        self.check(StorageOp::PresignGet).await?;
        validate_key(storage_key)?;
        Ok(Self::url("GET", storage_key, expires_in))
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        self.check(StorageOp::Exists).await?;
        Ok(self.objects.read().await.contains_key(storage_key))
    }

    async fn stat(&self, storage_key: &str) -> StorageResult<ObjectStat> {
        self.check(StorageOp::Stat).await?;
        self.objects
            .read()
            .await
            .get(storage_key)
            .map(|o| ObjectStat {
                size: o.data.len() as u64,
                content_type: Some(o.content_type.clone()),
            })
            .ok_or_else(|| StorageError::NotFound(storage_key.to_string()))
    }

    async fn copy(&self, from_key: &str, to_key: &str) -> StorageResult<()> {
        self.check(StorageOp::Copy).await?;
        validate_key(to_key)?;
        let mut objects = self.objects.write().await;
        let object = objects
            .get(from_key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(from_key.to_string()))?;
        objects.insert(to_key.to_string(), object);
        Ok(())
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        if storage_key.is_empty() {
            return Ok(());
        }
        self.check(StorageOp::Delete).await?;
        self.objects.write().await.remove(storage_key);
        Ok(())
    }

    async fn put(&self, storage_key: &str, data: Bytes, content_type: &str) -> StorageResult<()> {
        self.check(StorageOp::Put).await?;
        validate_key(storage_key)?;
        self.objects.write().await.insert(
            storage_key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
