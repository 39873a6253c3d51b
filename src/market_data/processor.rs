use chrono::{DateTime, Utc};
use crate::types::percent::Percent;
use crate::types::price::Price;
use crate::types::series::PriceSeries;
use crate::types::snapshot::IndexSnapshot;

/// Turns a raw closing-price series into a normalized snapshot.
///
/// All rounding of stored values happens here. The snapshot is stamped with
/// the refresh cycle's start time so every index in one cycle shares it.
pub struct QuoteProcessor;

impl QuoteProcessor {
    pub fn normalize(series: &PriceSeries, cycle_started_at: DateTime<Utc>) -> IndexSnapshot {
        // Step 1: Drop unusable closes
        let usable: PriceSeries = series.points()
            .iter()
            .filter(|p| p.close.is_finite())
            .copied()
            .collect();

        // Step 2: Pick previous/current in time order
        let Some((previous, current)) = usable.last_two() else {
            return IndexSnapshot::absent();
        };

        // Step 3: Round once
        let previous_close = Price::from_f64(previous.close);
        let current_price = Price::from_f64(current.close);

        let percent_change = if previous_close.is_zero() {
            Percent::zero()
        } else {
            Percent::change(previous.close, current.close)
        };

        IndexSnapshot::quoted(current_price, previous_close, percent_change, cycle_started_at)
    }
}
