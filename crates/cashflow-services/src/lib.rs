//! Cashflow Services Layer
//!
//! Business services: the staged-upload coordinator, the financial record
//! service built on top of it, and the background orphan reaper. HTTP handling
//! stays in cashflow-api.

mod best_effort;
pub mod cleanup;
pub mod transactions;
pub mod upload;

pub use cleanup::OrphanReaper;
pub use transactions::{aggregate_month, parse_month, TransactionService};
pub use upload::{UploadCoordinator, UploadError, UploadPolicy};
