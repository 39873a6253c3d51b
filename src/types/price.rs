use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Monetary value held as fixed-point with 2 decimal places.
///
/// Rounding happens once, in `from_f64`. Stored and served values are
/// rendered from the fixed-point representation, so they are bit-identical.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(i64);

impl Price {
    const MULTIPLIER: i64 = 100;  // 10^2

    pub fn from_f64(value: f64) -> Self {
        Price((value * Self::MULTIPLIER as f64).round() as i64)
    }

    pub fn from_cents(value: i64) -> Self {
        Price(value)
    }

    pub fn cents(&self) -> i64 {
        self.0
    }

    pub fn to_f64(&self) -> f64 {
        self.0 as f64 / Self::MULTIPLIER as f64
    }

    pub fn zero() -> Self {
        Price(0)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.to_f64())
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_f64())
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        f64::deserialize(deserializer).map(Price::from_f64)
    }
}
