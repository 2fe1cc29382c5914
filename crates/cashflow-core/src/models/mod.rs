//! Data models for the application

pub mod transaction;
pub mod upload;

pub use transaction::*;
pub use upload::*;
