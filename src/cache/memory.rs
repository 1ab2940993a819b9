// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! In-memory cache store

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::state::StoreState;
use crate::config::constants::DEFAULT_MAX_SNAPSHOTS;
use super::{BlockHeightSnapshot, CacheStore, CachedRecord, CallKey, RecordKind, StoreStats};
use crate::errors::StoreError;

#[derive(Debug, Default)]
struct MemoryStoreInner {
    state: StoreState,
    stats: StoreStats,
}

/// In-memory cache store
///
/// Holds records and snapshots in process memory. Nothing survives a restart,
/// which makes it the natural backend for tests and throwaway deployments.
///
/// # Examples
///
/// ```rust,ignore
/// use contract_read_cache::cache::{CacheStore, CachedRecord, CallKey, MemoryStore, RecordKind};
///
/// let store = MemoryStore::new();
/// let key = CallKey::constant("totalSupply");
/// store
///     .upsert(RecordKind::Constant, CachedRecord::new(key.clone(), "1000000"))
///     .await?;
/// let record = store.find(RecordKind::Constant, &key).await?;
/// assert_eq!(record.unwrap().value, "1000000");
/// ```
#[derive(Debug)]
pub struct MemoryStore {
    max_snapshots: usize,
    inner: Mutex<MemoryStoreInner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            max_snapshots: DEFAULT_MAX_SNAPSHOTS,
            inner: Mutex::default(),
        }
    }
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps the number of retained block-height snapshots (minimum 1)
    #[must_use]
    pub fn with_max_snapshots(mut self, max_snapshots: usize) -> Self {
        self.max_snapshots = max_snapshots.max(1);
        self
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn find(
        &self,
        kind: RecordKind,
        key: &CallKey,
    ) -> Result<Option<CachedRecord>, StoreError> {
        let mut inner = self.inner.lock().await;
        let record = inner.state.get(kind, key).cloned();
        if record.is_some() {
            inner.stats.hits += 1;
            debug!(%kind, %key, "Store hit (memory)");
        } else {
            inner.stats.misses += 1;
            debug!(%kind, %key, "Store miss (memory)");
        }
        Ok(record)
    }

    async fn upsert(&self, kind: RecordKind, record: CachedRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        debug!(%kind, key = %record.key, "Upserting record (memory)");
        inner.state.upsert(kind, record);
        inner.stats.writes += 1;
        Ok(())
    }

    async fn latest_snapshot(&self) -> Result<Option<BlockHeightSnapshot>, StoreError> {
        Ok(self.inner.lock().await.state.latest_snapshot())
    }

    async fn append_snapshot(&self, snapshot: BlockHeightSnapshot) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let pruned = inner.state.append_snapshot(snapshot, self.max_snapshots);
        if !pruned.is_empty() {
            debug!(pruned = pruned.len(), "Pruned old block-height snapshots (memory)");
        }
        inner.stats.writes += 1;
        Ok(())
    }

    async fn stats(&self) -> StoreStats {
        let inner = self.inner.lock().await;
        StoreStats {
            records: inner.state.record_count(),
            snapshots: inner.state.snapshot_count(),
            ..inner.stats.clone()
        }
    }

    fn name(&self) -> &'static str {
        "MemoryStore"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::build_key;

    #[tokio::test]
    async fn test_memory_store_find_and_upsert() {
        let store = MemoryStore::new();
        let (key, _) = build_key("getLoan", &["true", "5"]);

        assert!(store
            .find(RecordKind::FunctionCall, &key)
            .await
            .unwrap()
            .is_none());

        store
            .upsert(RecordKind::FunctionCall, CachedRecord::new(key.clone(), "7"))
            .await
            .unwrap();
        store
            .upsert(RecordKind::FunctionCall, CachedRecord::new(key.clone(), "8"))
            .await
            .unwrap();

        let record = store.find(RecordKind::FunctionCall, &key).await.unwrap();
        assert_eq!(record.unwrap().value, "8");

        let stats = store.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.writes, 2);
        assert_eq!(stats.records, 1);
    }

    #[tokio::test]
    async fn test_memory_store_snapshots_append() {
        let store = MemoryStore::new();
        assert!(store.latest_snapshot().await.unwrap().is_none());

        store
            .append_snapshot(BlockHeightSnapshot::new(100))
            .await
            .unwrap();
        store
            .append_snapshot(BlockHeightSnapshot::new(101))
            .await
            .unwrap();

        assert_eq!(store.latest_snapshot().await.unwrap().unwrap().height, 101);
        assert_eq!(store.stats().await.snapshots, 2);
    }

    #[tokio::test]
    async fn test_memory_store_snapshots_bounded_by_default() {
        let store = MemoryStore::new();
        for height in 0..(DEFAULT_MAX_SNAPSHOTS as u64 + 50) {
            store
                .append_snapshot(BlockHeightSnapshot::new(height))
                .await
                .unwrap();
        }

        assert_eq!(store.stats().await.snapshots, DEFAULT_MAX_SNAPSHOTS);
        assert_eq!(
            store.latest_snapshot().await.unwrap().unwrap().height,
            DEFAULT_MAX_SNAPSHOTS as u64 + 49
        );
    }

    #[tokio::test]
    async fn test_memory_store_honours_explicit_cap() {
        let store = MemoryStore::new().with_max_snapshots(3);
        for height in 1..=10 {
            store
                .append_snapshot(BlockHeightSnapshot::new(height))
                .await
                .unwrap();
        }

        assert_eq!(store.stats().await.snapshots, 3);
        assert_eq!(store.latest_snapshot().await.unwrap().unwrap().height, 10);
    }
}
