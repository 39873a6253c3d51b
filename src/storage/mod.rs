pub mod credentials;
pub mod firestore;
pub mod memory;

use std::sync::Arc;
use std::time::Duration;
use crate::config::StoreConfig;
use crate::error::Result;
use crate::interfaces::snapshot_store::SnapshotStore;

pub use credentials::ServiceAccountKey;
pub use firestore::FirestoreSnapshotStore;
pub use memory::MemorySnapshotStore;

/// Builds the configured store. Credential problems surface here, at startup.
pub fn build_store(config: &StoreConfig, timeout: Duration) -> Result<Arc<dyn SnapshotStore>> {
    match config {
        StoreConfig::Memory => {
            tracing::warn!("Using in-memory snapshot store; snapshots will not survive a restart");
            Ok(Arc::new(MemorySnapshotStore::new()))
        }
        StoreConfig::Firestore { collection, credentials } => {
            let key = ServiceAccountKey::load(credentials)?;
            tracing::info!(
                "Using Firestore collection {} in project {}",
                collection,
                key.project_id
            );
            Ok(Arc::new(FirestoreSnapshotStore::new(key, collection, timeout)?))
        }
    }
}
