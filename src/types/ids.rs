use uuid::Uuid;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One id per refresh cycle, carried on the cycle's tracing span and returned
/// to every caller that waited on that cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CycleId(pub Uuid);

impl CycleId {
    pub fn new() -> Self {
        CycleId(Uuid::new_v4())
    }
}

impl Default for CycleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CycleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
