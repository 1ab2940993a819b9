// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! In-memory store contents shared by the memory and disk backends.

use std::collections::HashMap;

use super::{BlockHeightSnapshot, CachedRecord, CallKey, RecordKind};

#[derive(Debug, Clone, Default)]
pub(crate) struct StoreState {
    records: HashMap<(RecordKind, CallKey), CachedRecord>,
    /// Insertion order; ties on `updated_at` go to the later entry.
    snapshots: Vec<BlockHeightSnapshot>,
}

impl StoreState {
    pub(crate) fn from_parts(
        records: impl IntoIterator<Item = (RecordKind, CachedRecord)>,
        snapshots: Vec<BlockHeightSnapshot>,
    ) -> Self {
        let records = records
            .into_iter()
            .map(|(kind, record)| ((kind, record.key.clone()), record))
            .collect();
        Self { records, snapshots }
    }

    pub(crate) fn get(&self, kind: RecordKind, key: &CallKey) -> Option<&CachedRecord> {
        self.records.get(&(kind, key.clone()))
    }

    /// Inserts or replaces a record, returning the one it replaced.
    pub(crate) fn upsert(&mut self, kind: RecordKind, record: CachedRecord) -> Option<CachedRecord> {
        self.records.insert((kind, record.key.clone()), record)
    }

    /// Puts back the record that an [`upsert`](Self::upsert) replaced, or
    /// removes the key when there was none.
    pub(crate) fn restore(
        &mut self,
        kind: RecordKind,
        key: &CallKey,
        previous: Option<CachedRecord>,
    ) {
        match previous {
            Some(record) => {
                self.records.insert((kind, key.clone()), record);
            }
            None => {
                self.records.remove(&(kind, key.clone()));
            }
        }
    }

    pub(crate) fn records(&self) -> impl Iterator<Item = (RecordKind, &CachedRecord)> {
        self.records.iter().map(|((kind, _), record)| (*kind, record))
    }

    pub(crate) fn latest_snapshot(&self) -> Option<BlockHeightSnapshot> {
        self.snapshots
            .iter()
            .enumerate()
            .max_by_key(|(index, snapshot)| (snapshot.updated_at, *index))
            .map(|(_, snapshot)| *snapshot)
    }

    /// Appends `snapshot` and drops the earliest-inserted snapshots so that at
    /// most `max` remain. Returns the dropped snapshots, oldest first.
    pub(crate) fn append_snapshot(
        &mut self,
        snapshot: BlockHeightSnapshot,
        max: usize,
    ) -> Vec<BlockHeightSnapshot> {
        self.snapshots.push(snapshot);
        let excess = self.snapshots.len().saturating_sub(max.max(1));
        self.snapshots.drain(..excess).collect()
    }

    /// Reverts an [`append_snapshot`](Self::append_snapshot) given the
    /// snapshots it dropped.
    pub(crate) fn undo_append(&mut self, pruned: Vec<BlockHeightSnapshot>) {
        self.snapshots.pop();
        self.snapshots.splice(0..0, pruned);
    }

    pub(crate) fn snapshots(&self) -> &[BlockHeightSnapshot] {
        &self.snapshots
    }

    pub(crate) fn record_count(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }
}
