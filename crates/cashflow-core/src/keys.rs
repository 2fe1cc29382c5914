//! Object key derivation for receipt images.
//!
//! Key format: `staging/{year}/{month:02}/{token}_{unix}{ext}` while an upload
//! is unconfirmed; promotion swaps the `staging/` prefix for `transactions/`.

use chrono::{DateTime, Datelike, Utc};

pub const STAGING_PREFIX: &str = "staging/";
pub const PERMANENT_PREFIX: &str = "transactions/";

/// Map a content type to the file extension used in object keys.
pub fn extension_for(content_type: &str) -> String {
    match content_type {
        "image/jpeg" | "image/jpg" => ".jpg".to_string(),
        "image/png" => ".png".to_string(),
        "image/webp" => ".webp".to_string(),
        other => match other.split_once('/') {
            Some((_, subtype)) if !subtype.is_empty() => format!(".{}", subtype),
            _ => ".jpg".to_string(),
        },
    }
}

/// Build the staging key for a freshly issued upload token.
pub fn staging_key(token: &str, content_type: &str, issued_at: DateTime<Utc>) -> String {
    format!(
        "{}{}/{:02}/{}_{}{}",
        STAGING_PREFIX,
        issued_at.year(),
        issued_at.month(),
        token,
        issued_at.timestamp(),
        extension_for(content_type)
    )
}

/// Permanent key for a staged object. Only the first `staging/` occurrence is replaced.
pub fn permanent_key(staging_key: &str) -> String {
    staging_key.replacen(STAGING_PREFIX, PERMANENT_PREFIX, 1)
}
