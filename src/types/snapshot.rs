use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::types::percent::Percent;
use crate::types::price::Price;

/// Latest known quote for one index, keyed by index name in the store.
///
/// Either every field is present or every field is absent; the all-absent
/// shape means the fetch did not yield enough data. Construct through
/// [`IndexSnapshot::quoted`] or [`IndexSnapshot::absent`] to keep that shape.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct IndexSnapshot {
    pub current_price: Option<Price>,
    pub percent_change: Option<Percent>,
    pub previous_close: Option<Price>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl IndexSnapshot {
    pub fn quoted(
        current_price: Price,
        previous_close: Price,
        percent_change: Percent,
        last_updated: DateTime<Utc>,
    ) -> Self {
        IndexSnapshot {
            current_price: Some(current_price),
            percent_change: Some(percent_change),
            previous_close: Some(previous_close),
            last_updated: Some(last_updated),
        }
    }

    pub fn absent() -> Self {
        IndexSnapshot::default()
    }

    pub fn has_quote(&self) -> bool {
        self.current_price.is_some()
    }

    pub fn is_absent(&self) -> bool {
        self.current_price.is_none()
            && self.percent_change.is_none()
            && self.previous_close.is_none()
            && self.last_updated.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn absent_renders_nulls() {
        let json = serde_json::to_value(IndexSnapshot::absent()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "current_price": null,
                "percent_change": null,
                "previous_close": null,
                "last_updated": null,
            })
        );
    }

    #[test]
    fn quoted_renders_snake_case_document() {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap();
        let snapshot = IndexSnapshot::quoted(
            Price::from_f64(105.0),
            Price::from_f64(100.0),
            Percent::from_f64(5.0),
            at,
        );

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["current_price"], 105.0);
        assert_eq!(json["previous_close"], 100.0);
        assert_eq!(json["percent_change"], 5.0);
        assert_eq!(json["last_updated"], "2024-03-05T12:00:00Z");
        assert!(snapshot.has_quote());
        assert!(!snapshot.is_absent());
    }
}
