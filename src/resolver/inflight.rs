// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Per-key in-flight tracking for the synchronous miss path.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::cache::{CallKey, RecordKind};

type InFlightKey = (RecordKind, CallKey);

/// Coordinates concurrent misses for the same key.
///
/// Each key maps to an async lock. The map lock is only held long enough to
/// clone that lock, never across an await.
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    fetches: Mutex<HashMap<InFlightKey, Arc<AsyncMutex<()>>>>,
}

/// Held by the one task fetching a key. Dropping it wakes the next waiter and
/// removes the map entry once nobody else references it.
#[derive(Debug)]
pub(crate) struct InFlightGuard<'a> {
    owner: &'a InFlight,
    key: InFlightKey,
    _slot: OwnedMutexGuard<()>,
}

impl InFlight {
    /// Acquires the fetch slot for `key`.
    ///
    /// Returns the guard and whether another task held the slot first, in
    /// which case the caller must re-check the store before fetching.
    pub(crate) async fn acquire(&self, kind: RecordKind, key: &CallKey) -> (InFlightGuard<'_>, bool) {
        let entry = (kind, key.clone());
        let slot = {
            let mut fetches = self.fetches.lock().unwrap_or_else(PoisonError::into_inner);
            fetches.entry(entry.clone()).or_default().clone()
        };

        let (slot, waited) = match slot.clone().try_lock_owned() {
            Ok(held) => (held, false),
            Err(_) => (slot.lock_owned().await, true),
        };

        (
            InFlightGuard {
                owner: self,
                key: entry,
                _slot: slot,
            },
            waited,
        )
    }

    /// Number of keys currently being fetched or waited on.
    pub(crate) fn len(&self) -> usize {
        self.fetches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut fetches = self
            .owner
            .fetches
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // One reference from the map and one from our guard: no waiters left.
        if fetches
            .get(&self.key)
            .is_some_and(|slot| Arc::strong_count(slot) <= 2)
        {
            fetches.remove(&self.key);
        }
    }
}
