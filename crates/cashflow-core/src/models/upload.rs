use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

/// Lifecycle state of a staged upload.
///
/// `pending` is the only non-terminal state; there is no transition back to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Pending,
    Completed,
    Failed,
    Expired,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStatus::Pending => "pending",
            UploadStatus::Completed => "completed",
            UploadStatus::Failed => "failed",
            UploadStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown upload status: {0}")]
pub struct UnknownUploadStatus(pub String);

impl FromStr for UploadStatus {
    type Err = UnknownUploadStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(UploadStatus::Pending),
            "completed" => Ok(UploadStatus::Completed),
            "failed" => Ok(UploadStatus::Failed),
            "expired" => Ok(UploadStatus::Expired),
            other => Err(UnknownUploadStatus(other.to_string())),
        }
    }
}

impl TryFrom<String> for UploadStatus {
    type Error = UnknownUploadStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// One row per issued upload credential.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct UploadRecord {
    pub id: Uuid,
    pub upload_token: String,
    pub staging_key: String,
    pub content_type: String,
    pub declared_size: i64,
    #[cfg_attr(feature = "sqlx", sqlx(try_from = "String"))]
    pub status: UploadStatus,
    pub credential_expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub linked_record_id: Option<Uuid>,
    pub error_message: Option<String>,
}

impl UploadRecord {
    pub fn is_linked(&self) -> bool {
        self.linked_record_id.is_some()
    }
}

/// Values written when a credential is issued. The record always starts `pending`.
#[derive(Debug, Clone)]
pub struct NewUploadRecord {
    pub id: Uuid,
    pub upload_token: String,
    pub staging_key: String,
    pub content_type: String,
    pub declared_size: i64,
    pub credential_expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Write credential handed back to the client.
#[derive(Debug, Clone)]
pub struct IssuedCredential {
    pub upload_token: String,
    pub presigned_url: String,
    pub staging_key: String,
    pub expires_at: DateTime<Utc>,
    pub content_type: String,
}

/// Request a presigned URL for a direct receipt upload
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateUploadRequest {
    /// Content type (MIME type) the client will send
    #[validate(length(
        min = 1,
        max = 255,
        message = "Content type must be between 1 and 255 characters"
    ))]
    pub content_type: String,
    /// Declared file size in bytes
    pub file_size: i64,
}

/// Presigned upload credential
#[derive(Debug, Serialize, ToSchema)]
pub struct CreateUploadResponse {
    /// Upload ID, passed as `upload_id` when creating the transaction
    pub upload_id: String,
    /// Presigned URL for the direct PUT
    pub presigned_url: String,
    /// HTTP method to use against `presigned_url`
    pub method: String,
    /// Headers the client must send with the PUT
    pub headers: HashMap<String, String>,
    /// Staging key the object will be written to
    pub key: String,
    /// Credential expiration time
    pub expires_at: DateTime<Utc>,
}

impl From<IssuedCredential> for CreateUploadResponse {
    fn from(credential: IssuedCredential) -> Self {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), credential.content_type);
        Self {
            upload_id: credential.upload_token,
            presigned_url: credential.presigned_url,
            method: "PUT".to_string(),
            headers,
            key: credential.staging_key,
            expires_at: credential.expires_at,
        }
    }
}

/// Current state of a staged upload
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadStatusResponse {
    pub upload_id: String,
    pub status: UploadStatus,
    pub key: String,
    pub content_type: String,
    pub file_size: i64,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<UploadRecord> for UploadStatusResponse {
    fn from(record: UploadRecord) -> Self {
        Self {
            upload_id: record.upload_token,
            status: record.status,
            key: record.staging_key,
            content_type: record.content_type,
            file_size: record.declared_size,
            created_at: record.created_at,
            completed_at: record.completed_at,
        }
    }
}
