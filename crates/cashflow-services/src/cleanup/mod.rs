mod service;

pub use service::OrphanReaper;
