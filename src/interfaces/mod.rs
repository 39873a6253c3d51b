pub mod clock;
pub mod quote_source;
pub mod snapshot_store;
