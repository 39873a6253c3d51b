pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod interfaces;
pub mod market_data;
pub mod observability;
pub mod query;
pub mod refresh;
pub mod registry;
pub mod storage;
pub mod types;
pub mod utils;

// Grace period for background tasks at shutdown
pub const SHUTDOWN_GRACE_SECS: u64 = 60;

// How often background tasks are checked while serving
pub const HEALTH_CHECK_INTERVAL_SECS: u64 = 30;
