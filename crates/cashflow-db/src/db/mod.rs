//! Database repositories for data access layer
//!
//! Each repository is a trait with a Postgres implementation so the services
//! can be exercised without a database.

pub mod transactions;
pub mod upload;

#[cfg(any(test, feature = "memory"))]
pub mod memory;

pub use transactions::{PgTransactionRepository, TransactionRepository};
pub use upload::{LinkOutcome, PgUploadLedger, UploadLedger};
