//! Staged-upload lifecycle
//!
//! A client obtains a presigned PUT for a `staging/` key, uploads directly to
//! the object store, and later references the upload when creating a record.
//! The coordinator then verifies the object, promotes it to `transactions/`
//! and links it to the record exactly once.
//!
//! State machine: `pending -> completed | failed | expired`; no path back to
//! `pending`.

mod coordinator;
mod error;
mod policy;

pub use coordinator::UploadCoordinator;
pub use error::UploadError;
pub use policy::{UploadPolicy, ALLOWED_CONTENT_TYPES};
