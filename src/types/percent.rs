use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Percent change held as fixed-point hundredths of a percent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Percent {
    value: i64,  // Percent * 10^2
}

const PERCENT_MULTIPLIER: i64 = 100;  // 10^2

impl Percent {
    pub fn from_f64(value: f64) -> Self {
        Percent {
            value: (value * PERCENT_MULTIPLIER as f64).round() as i64,
        }
    }

    pub fn from_raw(value: i64) -> Self {
        Percent { value }
    }

    pub fn raw_value(&self) -> i64 {
        self.value
    }

    pub fn to_f64(&self) -> f64 {
        self.value as f64 / PERCENT_MULTIPLIER as f64
    }

    pub fn zero() -> Self {
        Percent { value: 0 }
    }

    /// `(current - previous) / previous * 100`, computed on the unrounded
    /// inputs and rounded once. A zero `previous` yields zero.
    pub fn change(previous: f64, current: f64) -> Self {
        if previous == 0.0 {
            return Percent::zero();
        }
        Percent::from_f64((current - previous) / previous * 100.0)
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}%", self.to_f64())
    }
}

impl Serialize for Percent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_f64())
    }
}

impl<'de> Deserialize<'de> for Percent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        f64::deserialize(deserializer).map(Percent::from_f64)
    }
}
