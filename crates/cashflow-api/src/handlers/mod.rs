pub mod transactions;
pub mod uploads;
