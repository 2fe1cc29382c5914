//! Cashflow Core Library
//!
//! Domain models, error types, configuration and object key derivation shared
//! across all Cashflow crates.

pub mod config;
pub mod error;
pub mod keys;
pub mod models;

pub use config::{Config, S3Settings, UploadSettings};
pub use error::{AppError, ErrorMetadata, LogLevel};
