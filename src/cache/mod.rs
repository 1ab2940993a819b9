// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Cache store backends for contract reads and block-height snapshots.
//!
//! The store is deliberately free of business logic: it persists records and
//! answers lookups. Deciding *when* to read or write belongs to the
//! [`Resolver`](crate::resolver::Resolver) and the
//! [`BlockHeightPoller`](crate::poller::BlockHeightPoller).
//!
//! - [`DiskStore`]: versioned JSON document written atomically (default)
//! - [`MemoryStore`]: in-process maps, for tests and ephemeral deployments
//!
//! # Examples
//!
//! ```rust,ignore
//! use contract_read_cache::cache::{DiskStore, MemoryStore};
//!
//! let store = DiskStore::open("cache/contract-cache.json")
//!     .await?
//!     .with_max_snapshots(10_000);
//!
//! let store = MemoryStore::new();
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::StoreError;

mod disk;
mod key;
mod memory;
mod state;

pub use disk::DiskStore;
pub use key::{build_key, Argument, CallKey, KEY_SEPARATOR};
pub use memory::MemoryStore;

/// The kind of cached contract read.
///
/// Constants and function calls live in separate namespaces, so a constant
/// `owner` never aliases a zero-argument function call `owner`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Zero-argument getter
    Constant,
    /// Read-only function invoked with positional arguments
    FunctionCall,
}

impl RecordKind {
    /// Short label for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Constant => "constant",
            RecordKind::FunctionCall => "function_call",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The last observed value of a contract read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedRecord {
    /// What was read
    pub key: CallKey,
    /// The chain-returned result in canonical string form
    pub value: String,
    /// When the value was last written
    pub updated_at: DateTime<Utc>,
}

impl CachedRecord {
    /// Creates a record stamped with the current time.
    pub fn new(key: CallKey, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
            updated_at: Utc::now(),
        }
    }
}

/// A point-in-time observation of the chain height.
///
/// Snapshots are appended, never updated; the authoritative one is the snapshot
/// with the greatest `updated_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeightSnapshot {
    /// Observed block number
    pub height: u64,
    /// When it was observed
    pub updated_at: DateTime<Utc>,
}

impl BlockHeightSnapshot {
    /// Creates a snapshot stamped with the current time.
    pub fn new(height: u64) -> Self {
        Self {
            height,
            updated_at: Utc::now(),
        }
    }
}

/// Statistics about store usage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    /// Record lookups that found a value
    pub hits: u64,
    /// Record lookups that found nothing
    pub misses: u64,
    /// Record upserts and snapshot appends
    pub writes: u64,
    /// Current number of cached records
    pub records: usize,
    /// Current number of stored block-height snapshots
    pub snapshots: usize,
}

impl StoreStats {
    /// Calculates the record hit rate as a percentage (0.0 to 100.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

impl fmt::Display for StoreStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits={}, misses={}, writes={}, records={}, snapshots={}, hit_rate={:.1}%",
            self.hits,
            self.misses,
            self.writes,
            self.records,
            self.snapshots,
            self.hit_rate()
        )
    }
}

/// Persistence for cached contract reads and block-height snapshots.
///
/// Each call is an independent operation. No transaction spans a read and a
/// subsequent write, so concurrent writers for the same key resolve as
/// last-write-wins.
///
/// # Thread Safety
///
/// Implementations must support concurrent access from request handlers,
/// background refresh tasks and the poller. Use interior mutability as needed.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Looks up the record for `key` in the `kind` namespace.
    async fn find(&self, kind: RecordKind, key: &CallKey)
        -> Result<Option<CachedRecord>, StoreError>;

    /// Inserts the record, replacing any existing record with the same key.
    async fn upsert(&self, kind: RecordKind, record: CachedRecord) -> Result<(), StoreError>;

    /// Returns the snapshot with the greatest `updated_at`, if any.
    async fn latest_snapshot(&self) -> Result<Option<BlockHeightSnapshot>, StoreError>;

    /// Appends a new block-height snapshot.
    async fn append_snapshot(&self, snapshot: BlockHeightSnapshot) -> Result<(), StoreError>;

    /// Returns current store statistics.
    async fn stats(&self) -> StoreStats;

    /// Returns a human-readable name for this backend, used in logs and `/health`.
    fn name(&self) -> &'static str;
}
