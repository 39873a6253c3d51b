use std::collections::BTreeMap;
use async_trait::async_trait;
use crate::error::Result;
use crate::types::snapshot::IndexSnapshot;

/// Durable key-value document store holding one snapshot per index name.
/// Single-document writes are assumed atomic.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn upsert(&self, key: &str, snapshot: &IndexSnapshot) -> Result<()>;
    async fn get(&self, key: &str) -> Result<Option<IndexSnapshot>>;
    async fn read_all(&self) -> Result<BTreeMap<String, IndexSnapshot>>;
}
