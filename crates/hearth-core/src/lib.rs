pub mod error;

/// Days between 0001-01-01 (chrono's day 1) and the Unix epoch.
pub(crate) const UNIX_EPOCH_DAYS: i32 = 719_163;

pub mod config;
pub mod catalog;
pub mod ingest;
pub mod cleaner;
pub mod reshape;
pub mod metrics;
pub mod validate;
pub mod loader;
pub mod db;
pub mod pipeline;
