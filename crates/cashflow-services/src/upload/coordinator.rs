use super::{UploadError, UploadPolicy};
use crate::best_effort::best_effort;
use cashflow_core::keys;
use cashflow_core::models::{IssuedCredential, NewUploadRecord, UploadRecord, UploadStatus};
use cashflow_db::{LinkOutcome, UploadLedger};
use cashflow_storage::{Storage, StorageError};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Drives uploads through credential issuance, verification, promotion and reclamation.
#[derive(Clone)]
pub struct UploadCoordinator {
    storage: Arc<dyn Storage>,
    ledger: Arc<dyn UploadLedger>,
    policy: UploadPolicy,
}

impl UploadCoordinator {
    pub fn new(
        storage: Arc<dyn Storage>,
        ledger: Arc<dyn UploadLedger>,
        policy: UploadPolicy,
    ) -> Self {
        Self {
            storage,
            ledger,
            policy,
        }
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    /// Issue a presigned PUT for a fresh staging key and record it as `pending`.
    ///
    /// The URL is only returned once the ledger row exists.
    #[tracing::instrument(skip(self), fields(upload.operation = "request_credential"))]
    pub async fn request_credential(
        &self,
        content_type: &str,
        declared_size: i64,
    ) -> Result<IssuedCredential, UploadError> {
        let content_type = self.policy.validate_request(content_type, declared_size)?;

        let upload_token = Uuid::new_v4().to_string();
        let issued_at = Utc::now();
        let staging_key = keys::staging_key(&upload_token, &content_type, issued_at);

        let expires_at = chrono::Duration::from_std(self.policy.credential_ttl)
            .ok()
            .and_then(|ttl| issued_at.checked_add_signed(ttl))
            .ok_or_else(|| {
                UploadError::Validation("credential ttl is out of range".to_string())
            })?;

        let presigned_url = self
            .storage
            .presigned_put_url(&staging_key, &content_type, self.policy.credential_ttl)
            .await
            .map_err(UploadError::Credential)?;

        self.ledger
            .insert(&NewUploadRecord {
                id: Uuid::new_v4(),
                upload_token: upload_token.clone(),
                staging_key: staging_key.clone(),
                content_type: content_type.clone(),
                declared_size,
                credential_expires_at: expires_at,
                created_at: issued_at,
            })
            .await
            .map_err(UploadError::Persistence)?;

        tracing::info!(
            upload_token = %upload_token,
            staging_key = %staging_key,
            content_type = %content_type,
            declared_size,
            "Issued upload credential"
        );

        Ok(IssuedCredential {
            upload_token,
            presigned_url,
            staging_key,
            expires_at,
            content_type,
        })
    }

    /// Look up an upload, opportunistically confirming pending ones against the store.
    ///
    /// A pending upload whose object is present is reported `completed` even
    /// when the status write fails.
    #[tracing::instrument(skip(self), fields(upload.operation = "get_status"))]
    pub async fn get_status(&self, upload_token: &str) -> Result<UploadRecord, UploadError> {
        let mut record = self.find(upload_token).await?;

        if record.status == UploadStatus::Pending {
            let present = best_effort(
                "confirm_exists",
                &record.staging_key,
                self.storage.exists(&record.staging_key),
            )
            .await
            .unwrap_or(false);

            if present {
                best_effort(
                    "mark_completed",
                    &record.staging_key,
                    self.ledger.mark_completed_if_pending(upload_token),
                )
                .await;
                record.status = UploadStatus::Completed;
                record.completed_at.get_or_insert_with(Utc::now);
            }
        }

        Ok(record)
    }

    /// Verify the staged object, promote it and link it to `record_id`.
    ///
    /// Returns the permanent key, or an empty string for an empty token.
    /// Order: exists, stat, copy, then staging delete and the link write.
    #[tracing::instrument(skip(self), fields(upload.operation = "verify_and_link"))]
    pub async fn verify_and_link(
        &self,
        upload_token: &str,
        record_id: Uuid,
    ) -> Result<String, UploadError> {
        if upload_token.is_empty() {
            return Ok(String::new());
        }

        let record = self.find(upload_token).await?;
        if record.is_linked() {
            return Err(UploadError::Conflict(
                "upload already linked to a record".to_string(),
            ));
        }
        if matches!(record.status, UploadStatus::Failed | UploadStatus::Expired) {
            return Err(UploadError::Conflict(format!(
                "upload is {} and can no longer be linked",
                record.status
            )));
        }

        let staging_key = record.staging_key.as_str();
        let permanent_key = keys::permanent_key(staging_key);

        let staged = self
            .storage
            .exists(staging_key)
            .await
            .map_err(UploadError::Store)?;

        if staged {
            self.promote(&record, &permanent_key).await?;
        } else {
            // A previous attempt may have promoted the object and then failed
            // to write the link.
            let promoted = self
                .storage
                .exists(&permanent_key)
                .await
                .map_err(UploadError::Store)?;
            if !promoted {
                return Err(UploadError::NotFound("uploaded file not found".to_string()));
            }
            tracing::info!(
                upload_token = %upload_token,
                permanent_key = %permanent_key,
                "Staging object gone but permanent object present, resuming link"
            );
        }

        match self.ledger.link(upload_token, record_id).await {
            Ok(LinkOutcome::Linked) => {
                tracing::info!(
                    upload_token = %upload_token,
                    record_id = %record_id,
                    permanent_key = %permanent_key,
                    "Upload promoted and linked"
                );
                Ok(permanent_key)
            }
            Ok(LinkOutcome::AlreadyLinked) => Err(UploadError::Conflict(
                "upload already linked to a record".to_string(),
            )),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    upload_token = %upload_token,
                    record_id = %record_id,
                    permanent_key = %permanent_key,
                    "Object promoted but link write failed; ledger is behind the store"
                );
                Err(UploadError::Persistence(e))
            }
        }
    }

    async fn promote(&self, record: &UploadRecord, permanent_key: &str) -> Result<(), UploadError> {
        let upload_token = record.upload_token.as_str();
        let staging_key = record.staging_key.as_str();

        let stat = match self.storage.stat(staging_key).await {
            Ok(stat) => stat,
            Err(StorageError::NotFound(_)) => {
                return Err(self.staging_vanished(upload_token).await)
            }
            Err(e) => return Err(UploadError::Store(e)),
        };

        let checked = self.policy.check_size(stat.size).and_then(|()| {
            self.policy
                .check_content_type(&record.content_type, stat.content_type.as_deref())
        });
        if let Err(e) = checked {
            tracing::warn!(
                upload_token = %upload_token,
                staging_key = %staging_key,
                size_bytes = stat.size,
                content_type = ?stat.content_type,
                error = %e,
                "Uploaded object rejected"
            );
            best_effort(
                "mark_failed",
                staging_key,
                self.ledger.mark_failed(upload_token, &e.to_string()),
            )
            .await;
            best_effort(
                "delete_rejected",
                staging_key,
                self.storage.delete(staging_key),
            )
            .await;
            return Err(e);
        }

        match self.storage.copy(staging_key, permanent_key).await {
            Ok(()) => {}
            Err(StorageError::NotFound(_)) => {
                return Err(self.staging_vanished(upload_token).await)
            }
            Err(e) => return Err(UploadError::Promotion(e)),
        }

        best_effort(
            "delete_staging",
            staging_key,
            self.storage.delete(staging_key),
        )
        .await;

        Ok(())
    }

    /// The staging object disappeared after `exists` saw it: either a
    /// concurrent call promoted and linked it, or it was reclaimed.
    async fn staging_vanished(&self, upload_token: &str) -> UploadError {
        match self.find(upload_token).await {
            Ok(record) if record.is_linked() => {
                UploadError::Conflict("upload already linked to a record".to_string())
            }
            Ok(_) => UploadError::NotFound("uploaded file not found".to_string()),
            Err(e) => e,
        }
    }

    /// Expire pending, unlinked uploads older than `max_age` and delete their
    /// staging objects. Returns how many records were considered.
    #[tracing::instrument(skip(self), fields(upload.operation = "reclaim_orphans"))]
    pub async fn reclaim_orphans(&self, max_age: Duration) -> Result<usize, UploadError> {
        let cutoff = chrono::Duration::from_std(max_age)
            .ok()
            .and_then(|max_age| Utc::now().checked_sub_signed(max_age))
            .ok_or_else(|| {
                UploadError::Validation("orphan max age is out of range".to_string())
            })?;

        let orphans = self
            .ledger
            .find_orphans(cutoff)
            .await
            .map_err(UploadError::Persistence)?;

        let count = orphans.len();
        let mut expired = 0usize;
        for orphan in orphans {
            best_effort(
                "delete_orphan",
                &orphan.staging_key,
                self.storage.delete(&orphan.staging_key),
            )
            .await;

            if let Some(true) = best_effort(
                "mark_expired",
                &orphan.staging_key,
                self.ledger.mark_expired_if_pending(&orphan.upload_token),
            )
            .await
            {
                expired += 1;
            }
        }

        tracing::info!(considered = count, expired, cutoff = %cutoff, "Orphan sweep finished");
        Ok(count)
    }

    async fn find(&self, upload_token: &str) -> Result<UploadRecord, UploadError> {
        self.ledger
            .find_by_token(upload_token)
            .await
            .map_err(UploadError::Persistence)?
            .ok_or_else(|| UploadError::NotFound("upload not found".to_string()))
    }
}
