use std::collections::BTreeMap;
use std::sync::Arc;
use crate::error::Result;
use crate::interfaces::snapshot_store::SnapshotStore;
use crate::types::snapshot::IndexSnapshot;

/// Read path for the latest snapshots. Takes no scheduler lock, so a read
/// during a cycle may see some indices already updated and others not.
pub struct QueryService {
    store: Arc<dyn SnapshotStore>,
}

impl QueryService {
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        QueryService { store }
    }

    pub async fn latest(&self) -> Result<BTreeMap<String, IndexSnapshot>> {
        self.store.read_all().await
    }
}
