use std::collections::HashMap;
use async_trait::async_trait;
use crate::error::Result;
use crate::types::series::PriceSeries;

/// Upstream market-data provider.
///
/// Symbols unavailable on this call may be missing from the returned map or
/// map to an empty series. `Err` is reserved for total transport failure.
/// Implementations bound each call with their own request timeout.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch(&self, symbols: &[String], lookback_days: u32) -> Result<HashMap<String, PriceSeries>>;
}
