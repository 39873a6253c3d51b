use chrono::{DateTime, Utc};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
}

impl PricePoint {
    pub fn new(timestamp: DateTime<Utc>, close: f64) -> Self {
        PricePoint { timestamp, close }
    }
}

/// Closing prices for one symbol. Transient: produced by a quote source,
/// consumed by the processor, never persisted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(points: Vec<PricePoint>) -> Self {
        PriceSeries { points }
    }

    pub fn empty() -> Self {
        PriceSeries::default()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    /// Points in ascending time order. Upstream responses are not
    /// guaranteed ordered.
    pub fn sorted(&self) -> Vec<PricePoint> {
        let mut points = self.points.clone();
        points.sort_by_key(|p| p.timestamp);
        points
    }

    /// The last two closes in time order, `(previous, current)`.
    pub fn last_two(&self) -> Option<(PricePoint, PricePoint)> {
        let sorted = self.sorted();
        match sorted.as_slice() {
            [.., previous, current] => Some((*previous, *current)),
            _ => None,
        }
    }
}

impl FromIterator<PricePoint> for PriceSeries {
    fn from_iter<I: IntoIterator<Item = PricePoint>>(iter: I) -> Self {
        PriceSeries::new(iter.into_iter().collect())
    }
}
