//! Configuration module
//!
//! Configuration is read once at startup from the process environment (and an
//! optional `.env` file) and then passed by reference into every constructor
//! that needs it. Nothing below the setup layer reads the environment.

use std::env;
use std::time::Duration;

// Common constants
const SERVER_PORT: u16 = 8080;
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_REGION: &str = "us-east-1";
const URL_EXPIRATION_SECS: u64 = 24 * 60 * 60;
const S3_REQUEST_TIMEOUT_SECS: u64 = 30;
const MAX_IMAGE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const UPLOAD_CREDENTIAL_TTL_SECS: u64 = 15 * 60;
const ORPHAN_MAX_AGE_HOURS: u64 = 24;
const ORPHAN_SWEEP_INTERVAL_SECS: u64 = 60 * 60;

/// Connection settings for the S3-compatible object store.
///
/// Built from [`Config`] and handed to the storage gateway constructor.
#[derive(Clone, Debug)]
pub struct S3Settings {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint for S3-compatible providers (MinIO, DigitalOcean Spaces, ...)
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub request_timeout: Duration,
}

/// Limits applied to staged uploads.
#[derive(Clone, Debug)]
pub struct UploadSettings {
    pub max_size_bytes: u64,
    pub credential_ttl: Duration,
    /// Lifetime of presigned GET URLs minted for stored receipts.
    pub read_url_ttl: Duration,
    pub orphan_max_age: Duration,
    /// Zero disables the background sweep.
    pub orphan_sweep_interval: Duration,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            max_size_bytes: MAX_IMAGE_SIZE_BYTES,
            credential_ttl: Duration::from_secs(UPLOAD_CREDENTIAL_TTL_SECS),
            read_url_ttl: Duration::from_secs(URL_EXPIRATION_SECS),
            orphan_max_age: Duration::from_secs(ORPHAN_MAX_AGE_HOURS * 60 * 60),
            orphan_sweep_interval: Duration::from_secs(ORPHAN_SWEEP_INTERVAL_SECS),
        }
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
    pub request_timeout: Duration,
    pub log_json: bool,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub s3: S3Settings,
    pub uploads: UploadSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// `from_env` is a thin wrapper over this; tests feed it a map instead of
    /// mutating the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|s| !s.trim().is_empty());

        let environment = var("ENVIRONMENT")
            .or_else(|| var("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let cors_origins = var("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let server_port = match var("PORT") {
            Some(port) => port
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            None => SERVER_PORT,
        };

        let parse_u64 = |key: &str, default: u64| -> u64 {
            var(key)
                .and_then(|s| s.trim().parse::<u64>().ok())
                .unwrap_or(default)
        };

        let bucket = var("S3_BUCKET_NAME")
            .or_else(|| var("S3_BUCKET"))
            .ok_or_else(|| anyhow::anyhow!("S3_BUCKET_NAME environment variable is required"))?;

        let s3 = S3Settings {
            bucket,
            region: var("AWS_REGION")
                .or_else(|| var("S3_REGION"))
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            endpoint: var("S3_ENDPOINT"),
            access_key_id: var("AWS_ACCESS_KEY_ID"),
            secret_access_key: var("AWS_SECRET_ACCESS_KEY"),
            request_timeout: Duration::from_secs(parse_u64(
                "S3_REQUEST_TIMEOUT_SECS",
                S3_REQUEST_TIMEOUT_SECS,
            )),
        };

        let max_size_bytes = match parse_u64("MAX_IMAGE_SIZE", MAX_IMAGE_SIZE_BYTES) {
            0 => MAX_IMAGE_SIZE_BYTES,
            size => size,
        };

        let uploads = UploadSettings {
            max_size_bytes,
            credential_ttl: Duration::from_secs(parse_u64(
                "UPLOAD_CREDENTIAL_TTL_SECS",
                UPLOAD_CREDENTIAL_TTL_SECS,
            )),
            read_url_ttl: Duration::from_secs(parse_u64(
                "S3_URL_EXPIRATION_SECS",
                URL_EXPIRATION_SECS,
            )),
            orphan_max_age: Duration::from_secs(
                parse_u64("ORPHAN_MAX_AGE_HOURS", ORPHAN_MAX_AGE_HOURS)
                    .checked_mul(60 * 60)
                    .ok_or_else(|| anyhow::anyhow!("ORPHAN_MAX_AGE_HOURS is too large"))?,
            ),
            orphan_sweep_interval: Duration::from_secs(parse_u64(
                "ORPHAN_SWEEP_INTERVAL_SECS",
                ORPHAN_SWEEP_INTERVAL_SECS,
            )),
        };

        let config = Config {
            server_port,
            environment,
            cors_origins,
            request_timeout: Duration::from_secs(parse_u64(
                "REQUEST_TIMEOUT_SECS",
                REQUEST_TIMEOUT_SECS,
            )),
            log_json: var("LOG_FORMAT")
                .map(|s| s.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            database_url: var("DATABASE_URL")
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set"))?,
            db_max_connections: parse_u64("DB_MAX_CONNECTIONS", MAX_CONNECTIONS as u64) as u32,
            db_timeout_seconds: parse_u64("DB_TIMEOUT_SECONDS", CONNECTION_TIMEOUT_SECS),
            s3,
            uploads,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !(self.database_url.starts_with("postgres://")
            || self.database_url.starts_with("postgresql://"))
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if self.is_production() && self.cors_origins.iter().any(|o| o == "*") {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        if self.s3.access_key_id.is_some() != self.s3.secret_access_key.is_some() {
            return Err(anyhow::anyhow!(
                "AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY must be set together"
            ));
        }

        if self.uploads.credential_ttl.is_zero() {
            return Err(anyhow::anyhow!(
                "UPLOAD_CREDENTIAL_TTL_SECS must be greater than zero"
            ));
        }

        Ok(())
    }
}
