use super::UploadError;
use cashflow_core::UploadSettings;
use std::time::Duration;

/// Content types accepted for receipt images.
pub const ALLOWED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png", "image/webp"];

/// Limits and lifetimes applied to every staged upload.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub allowed_content_types: Vec<String>,
    pub max_size_bytes: u64,
    pub credential_ttl: Duration,
    pub read_url_ttl: Duration,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self::from_settings(&UploadSettings::default())
    }
}

impl UploadPolicy {
    pub fn from_settings(settings: &UploadSettings) -> Self {
        Self {
            allowed_content_types: ALLOWED_CONTENT_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_size_bytes: settings.max_size_bytes,
            credential_ttl: settings.credential_ttl,
            read_url_ttl: settings.read_url_ttl,
        }
    }

    /// Check a credential request. Returns the normalized content type.
    pub fn validate_request(
        &self,
        content_type: &str,
        declared_size: i64,
    ) -> Result<String, UploadError> {
        let content_type = content_type.trim().to_ascii_lowercase();
        if !self.allowed_content_types.iter().any(|t| *t == content_type) {
            return Err(UploadError::Validation(format!(
                "invalid content type: {}. Allowed types: {}",
                content_type,
                self.allowed_content_types.join(", ")
            )));
        }

        if declared_size < 1 {
            return Err(UploadError::Validation(
                "file size must be at least 1 byte".to_string(),
            ));
        }

        self.check_size(declared_size as u64)?;
        Ok(content_type)
    }

    pub fn check_size(&self, size: u64) -> Result<(), UploadError> {
        if size > self.max_size_bytes {
            return Err(UploadError::Validation(format!(
                "file size {} exceeds maximum allowed size of {} bytes",
                size, self.max_size_bytes
            )));
        }
        Ok(())
    }

    /// Compare the media type an object was stored with against the one it was
    /// issued for. Parameters such as `charset` are ignored.
    pub fn check_content_type(
        &self,
        expected: &str,
        stored: Option<&str>,
    ) -> Result<(), UploadError> {
        let essence = |value: &str| {
            value
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        };
        match stored {
            Some(actual) if essence(actual) == essence(expected) => Ok(()),
            Some(actual) => Err(UploadError::Validation(format!(
                "uploaded content type {} does not match requested {}",
                essence(actual),
                expected
            ))),
            None => Err(UploadError::Validation(format!(
                "uploaded object has no content type, expected {}",
                expected
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_allowed_types_up_to_the_limit() {
        let policy = UploadPolicy::default();
        assert_eq!(
            policy.validate_request("image/png", 10_485_760).unwrap(),
            "image/png"
        );
        assert_eq!(
            policy.validate_request(" Image/JPEG ", 1).unwrap(),
            "image/jpeg"
        );
    }

    #[test]
    fn rejects_other_types() {
        let policy = UploadPolicy::default();
        let err = policy.validate_request("application/pdf", 100).unwrap_err();
        assert!(matches!(err, UploadError::Validation(ref m) if m.contains("application/pdf")));
    }

    #[test]
    fn rejects_sizes_outside_bounds() {
        let policy = UploadPolicy::default();
        assert!(policy.validate_request("image/png", 10_485_761).is_err());
        assert!(policy.validate_request("image/png", 0).is_err());
        assert!(policy.validate_request("image/png", -5).is_err());
    }

    #[test]
    fn stored_content_type_must_match_issued_one() {
        let policy = UploadPolicy::default();
        assert!(policy
            .check_content_type("image/png", Some("image/png"))
            .is_ok());
        assert!(policy
            .check_content_type("image/png", Some("Image/PNG; charset=binary"))
            .is_ok());
        assert!(matches!(
            policy.check_content_type("image/png", Some("text/html")),
            Err(UploadError::Validation(ref m)) if m.contains("text/html")
        ));
        assert!(policy.check_content_type("image/png", None).is_err());
    }
}
