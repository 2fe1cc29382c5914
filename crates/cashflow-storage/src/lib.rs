//! Cashflow Storage Library
//!
//! Object store gateway for receipt images: the [`Storage`] trait, the S3
//! implementation over `object_store`, and an in-memory backend.
//!
//! # Storage key format
//!
//! Receipts are written under `staging/` by clients and promoted to
//! `transactions/` by the server; see `cashflow_core::keys`. Keys must not
//! contain `..` or a leading `/`.

pub mod factory;
#[cfg(feature = "storage-memory")]
pub mod memory;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
#[cfg(feature = "storage-memory")]
pub use memory::{MemoryStorage, StorageOp};
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{validate_key, ObjectStat, Storage, StorageError, StorageResult};
