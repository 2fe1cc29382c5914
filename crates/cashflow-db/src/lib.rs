//! Cashflow database layer
//!
//! Postgres repositories for the upload ledger and financial records, plus
//! in-process implementations behind the `memory` feature.

pub mod db;

pub use db::{
    LinkOutcome, PgTransactionRepository, PgUploadLedger, TransactionRepository, UploadLedger,
};
#[cfg(any(test, feature = "memory"))]
pub use db::memory::{LedgerOp, MemoryTransactionRepository, MemoryUploadLedger};
