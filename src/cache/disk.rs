// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Disk-based cache store with file locking and versioning

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::state::StoreState;
use crate::config::constants::DEFAULT_MAX_SNAPSHOTS;
use super::{BlockHeightSnapshot, CacheStore, CachedRecord, CallKey, RecordKind, StoreStats};
use crate::errors::StoreError;

/// Current store document version
const STORE_VERSION: u32 = 1;

#[derive(Debug, Deserialize)]
struct StoredRecord {
    kind: RecordKind,
    #[serde(flatten)]
    record: CachedRecord,
}

#[derive(Debug, Serialize)]
struct StoredRecordRef<'a> {
    kind: RecordKind,
    #[serde(flatten)]
    record: &'a CachedRecord,
}

/// Serialized store format (versioned)
#[derive(Debug, Deserialize)]
struct StoreDocument {
    version: u32,
    #[serde(default)]
    records: Vec<StoredRecord>,
    #[serde(default)]
    snapshots: Vec<BlockHeightSnapshot>,
}

#[derive(Debug, Serialize)]
struct StoreDocumentRef<'a> {
    version: u32,
    records: Vec<StoredRecordRef<'a>>,
    snapshots: &'a [BlockHeightSnapshot],
}

impl<'a> StoreDocumentRef<'a> {
    fn from_state(state: &'a StoreState) -> Self {
        Self {
            version: STORE_VERSION,
            records: state
                .records()
                .map(|(kind, record)| StoredRecordRef { kind, record })
                .collect(),
            snapshots: state.snapshots(),
        }
    }
}

#[derive(Debug, Default)]
struct DiskStoreInner {
    state: StoreState,
    /// In-memory only, not persisted
    stats: StoreStats,
}

/// Disk-based cache store
///
/// The whole store is one JSON document, loaded when the store is opened and
/// rewritten after every write:
/// - Advisory file locking guards readers and writers in other processes
/// - Writes go to a temporary file that is atomically renamed into place
/// - The document carries a format version; a mismatched or unreadable file
///   is ignored with a warning and the store starts empty
///
/// Lookups are served from memory. A write that fails to reach disk is rolled
/// back in memory too, so the two never disagree about a key.
///
/// # Examples
///
/// ```rust,ignore
/// use contract_read_cache::cache::DiskStore;
///
/// let store = DiskStore::open("cache/contract-cache.json").await?;
///
/// // Keep at most 10k block-height snapshots
/// let store = DiskStore::open("/var/lib/proxy/cache.json")
///     .await?
///     .with_max_snapshots(10_000);
/// ```
#[derive(Debug)]
pub struct DiskStore {
    path: PathBuf,
    max_snapshots: usize,
    inner: Mutex<DiskStoreInner>,
}

impl DiskStore {
    /// Opens the store at `path`, creating the parent directory if needed
    ///
    /// A missing file is not an error; it is created on the first write.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created or is not
    /// writable, or if an existing file cannot be opened or locked.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        Self::prepare_directory(&path).await?;
        let state = Self::load(&path)?;

        info!(
            path = %path.display(),
            records = state.record_count(),
            snapshots = state.snapshot_count(),
            "Opened disk cache store"
        );

        Ok(Self {
            path,
            max_snapshots: DEFAULT_MAX_SNAPSHOTS,
            inner: Mutex::new(DiskStoreInner {
                state,
                stats: StoreStats::default(),
            }),
        })
    }

    /// Caps the number of retained block-height snapshots (minimum 1)
    ///
    /// The earliest snapshots are dropped as part of the append that exceeds
    /// the cap, so the file never holds more than `max_snapshots`.
    #[must_use]
    pub fn with_max_snapshots(mut self, max_snapshots: usize) -> Self {
        self.max_snapshots = max_snapshots.max(1);
        self
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn prepare_directory(path: &Path) -> Result<(), StoreError> {
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        if !parent.exists() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StoreError::io(
                    parent.display().to_string(),
                    format!("Failed to create store directory: {e}"),
                    Some(e),
                )
            })?;
            debug!(path = %parent.display(), "Created store directory");
        }

        // Check writability now rather than on the first cache miss.
        let marker = parent.join(".store_write_test");
        tokio::fs::write(&marker, b"test").await.map_err(|e| {
            StoreError::io(
                parent.display().to_string(),
                format!("Store directory is not writable: {e}"),
                Some(e),
            )
        })?;
        let _ = tokio::fs::remove_file(&marker).await;

        Ok(())
    }

    /// Loads the store document from disk under a shared lock
    fn load(path: &Path) -> Result<StoreState, StoreError> {
        if !path.exists() {
            debug!(path = %path.display(), "Store file does not exist, starting empty");
            return Ok(StoreState::default());
        }

        let file = File::open(path).map_err(|e| {
            StoreError::io(
                path.display().to_string(),
                format!("Failed to open store file: {e}. Ensure the file is readable."),
                Some(e),
            )
        })?;

        file.lock_shared().map_err(|e| {
            StoreError::io(
                path.display().to_string(),
                format!("Failed to acquire read lock: {e}"),
                Some(e),
            )
        })?;

        let document: StoreDocument = match serde_json::from_reader(&file) {
            Ok(document) => document,
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to parse store file, starting empty"
                );
                return Ok(StoreState::default());
            }
        };

        // Unlock by dropping the file
        drop(file);

        if document.version != STORE_VERSION {
            warn!(
                path = %path.display(),
                stored_version = document.version,
                current_version = STORE_VERSION,
                "Store version mismatch, ignoring stored data"
            );
            return Ok(StoreState::default());
        }

        Ok(StoreState::from_parts(
            document
                .records
                .into_iter()
                .map(|stored| (stored.kind, stored.record)),
            document.snapshots,
        ))
    }

    /// Writes the store document atomically under an exclusive lock
    async fn save(&self, state: &StoreState) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(&StoreDocumentRef::from_state(state))
            .map_err(|e| StoreError::serialization("Failed to encode store document", e))?;

        let temp_path = self.path.with_extension("tmp");

        tokio::fs::write(&temp_path, &json).await.map_err(|e| {
            StoreError::io(
                temp_path.display().to_string(),
                format!("Failed to write store: {e}. Ensure the directory is writable."),
                Some(e),
            )
        })?;

        let file = File::open(&temp_path).map_err(|e| {
            StoreError::io(
                temp_path.display().to_string(),
                format!("Failed to open temp store file: {e}"),
                Some(e),
            )
        })?;

        file.lock().map_err(|e| {
            StoreError::io(
                temp_path.display().to_string(),
                format!("Failed to acquire write lock: {e}"),
                Some(e),
            )
        })?;

        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| {
                StoreError::io(
                    self.path.display().to_string(),
                    format!(
                        "Failed to rename store file from '{}': {e}",
                        temp_path.display()
                    ),
                    Some(e),
                )
            })?;

        // Unlock by dropping the file
        drop(file);

        debug!(
            path = %self.path.display(),
            records = state.record_count(),
            snapshots = state.snapshot_count(),
            "Saved store document"
        );

        Ok(())
    }
}

#[async_trait]
impl CacheStore for DiskStore {
    async fn find(
        &self,
        kind: RecordKind,
        key: &CallKey,
    ) -> Result<Option<CachedRecord>, StoreError> {
        let mut inner = self.inner.lock().await;
        let record = inner.state.get(kind, key).cloned();
        if record.is_some() {
            inner.stats.hits += 1;
            debug!(%kind, %key, "Store hit (disk)");
        } else {
            inner.stats.misses += 1;
            debug!(%kind, %key, "Store miss (disk)");
        }
        Ok(record)
    }

    async fn upsert(&self, kind: RecordKind, record: CachedRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let key = record.key.clone();

        debug!(%kind, %key, "Upserting record (disk)");
        let previous = inner.state.upsert(kind, record);

        if let Err(e) = self.save(&inner.state).await {
            inner.state.restore(kind, &key, previous);
            return Err(e);
        }

        inner.stats.writes += 1;
        Ok(())
    }

    async fn latest_snapshot(&self) -> Result<Option<BlockHeightSnapshot>, StoreError> {
        Ok(self.inner.lock().await.state.latest_snapshot())
    }

    async fn append_snapshot(&self, snapshot: BlockHeightSnapshot) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let pruned = inner.state.append_snapshot(snapshot, self.max_snapshots);
        let pruned_count = pruned.len();

        if let Err(e) = self.save(&inner.state).await {
            inner.state.undo_append(pruned);
            return Err(e);
        }
        inner.stats.writes += 1;

        if pruned_count > 0 {
            debug!(
                pruned = pruned_count,
                max = self.max_snapshots,
                "Pruned old block-height snapshots"
            );
        }

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
        "DiskStore"
    }
}
