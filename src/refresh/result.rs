use std::fmt;
use chrono::{DateTime, Utc};
use crate::error::{Error, Result};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use crate::types::ids::CycleId;
use crate::types::snapshot::IndexSnapshot;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Scheduled,
    Manual,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::Scheduled => "scheduled",
            Trigger::Manual => "manual",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Fresh quote written.
    Updated,
    /// No data this cycle; the previous good document was left untouched.
    Preserved,
    /// No data and no prior document; the all-absent document was written.
    Initialized,
    /// The store rejected the write.
    WriteFailed,
    /// No data, and the store could not say whether a prior document exists,
    /// so nothing was written.
    StoreUnavailable,
}

impl OutcomeStatus {
    /// The store answered for this index, whether or not anything was written.
    pub fn reached_store(&self) -> bool {
        matches!(
            self,
            OutcomeStatus::Updated | OutcomeStatus::Preserved | OutcomeStatus::Initialized
        )
    }
}

/// What one cycle did for one index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IndexOutcome {
    #[serde(flatten)]
    pub snapshot: IndexSnapshot,
    pub status: OutcomeStatus,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IndexOutcome {
    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Updated
    }
}

/// Per-cycle aggregate, in registry order. Serializes as an object keyed by
/// index name.
#[derive(Clone, Debug)]
pub struct RefreshResult {
    pub cycle_id: CycleId,
    pub trigger: Trigger,
    pub started_at: DateTime<Utc>,
    outcomes: Vec<(String, IndexOutcome)>,
}

impl RefreshResult {
    pub fn new(cycle_id: CycleId, trigger: Trigger, started_at: DateTime<Utc>) -> Self {
        RefreshResult {
            cycle_id,
            trigger,
            started_at,
            outcomes: Vec::new(),
        }
    }

    pub fn record(&mut self, name: impl Into<String>, outcome: IndexOutcome) {
        self.outcomes.push((name.into(), outcome));
    }

    pub fn get(&self, name: &str) -> Option<&IndexOutcome> {
        self.outcomes.iter()
            .find(|(n, _)| n == name)
            .map(|(_, o)| o)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &IndexOutcome)> {
        self.outcomes.iter().map(|(n, o)| (n.as_str(), o))
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn updated_count(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_success()).count()
    }

    /// Fails when no index got through to the store. Per-index failures
    /// alongside at least one answered index are not an error.
    pub fn ensure_store_reached(&self) -> Result<()> {
        if self.outcomes.iter().any(|(_, o)| o.status.reached_store()) {
            return Ok(());
        }

        let cause = self.outcomes.iter()
            .find_map(|(_, o)| o.error.as_deref())
            .unwrap_or("no indices refreshed");
        Err(Error::StoreUnreachable(format!(
            "cycle {} persisted nothing: {}", self.cycle_id, cause
        )))
    }
}

impl Serialize for RefreshResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.outcomes.len()))?;
        for (name, outcome) in &self.outcomes {
            map.serialize_entry(name, outcome)?;
        }
        map.end()
    }
}
