use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use async_trait::async_trait;
use dashmap::DashMap;
use crate::error::{Error, Result};
use crate::interfaces::snapshot_store::SnapshotStore;
use crate::types::snapshot::IndexSnapshot;

/// In-process snapshot store.
///
/// Also used as the test double for the durable store: reads and writes can
/// be made to fail, globally or per key.
#[derive(Default)]
pub struct MemorySnapshotStore {
    documents: DashMap<String, IndexSnapshot>,
    unavailable: AtomicBool,
    failing_keys: Mutex<HashSet<String>>,
    writes: AtomicUsize,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_documents(documents: impl IntoIterator<Item = (String, IndexSnapshot)>) -> Self {
        let store = Self::new();
        for (key, snapshot) in documents {
            store.documents.insert(key, snapshot);
        }
        store
    }

    /// Every read and write fails while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Writes to `key` fail until cleared.
    pub fn fail_writes_for(&self, key: &str) {
        self.failing_keys.lock().unwrap_or_else(|e| e.into_inner()).insert(key.to_string());
    }

    pub fn clear_failures(&self) {
        self.failing_keys.lock().unwrap_or_else(|e| e.into_inner()).clear();
        self.set_unavailable(false);
    }

    /// Successful writes since creation.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn document(&self, key: &str) -> Option<IndexSnapshot> {
        self.documents.get(key).map(|d| d.value().clone())
    }

    fn check_available(&self) -> bool {
        !self.unavailable.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn upsert(&self, key: &str, snapshot: &IndexSnapshot) -> Result<()> {
        let key_fails = self.failing_keys.lock().unwrap_or_else(|e| e.into_inner()).contains(key);
        if !self.check_available() || key_fails {
            return Err(Error::StoreWriteError {
                key: key.to_string(),
                reason: "store unavailable".to_string(),
            });
        }

        self.documents.insert(key.to_string(), snapshot.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<IndexSnapshot>> {
        if !self.check_available() {
            return Err(Error::StoreReadError("store unavailable".to_string()));
        }
        Ok(self.document(key))
    }

    async fn read_all(&self) -> Result<BTreeMap<String, IndexSnapshot>> {
        if !self.check_available() {
            return Err(Error::StoreReadError("store unavailable".to_string()));
        }
        Ok(self.documents.iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect())
    }
}
