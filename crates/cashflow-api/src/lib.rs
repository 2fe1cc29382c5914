//! Cashflow API Library
//!
//! HTTP handlers, error rendering and application setup for the ledger.

mod api_doc;
pub mod constants;
mod handlers;
pub mod setup;
mod telemetry;

pub mod error;
pub mod state;

pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
