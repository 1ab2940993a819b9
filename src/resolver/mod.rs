// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Stale-while-revalidate resolution of contract reads.
//!
//! For every read the [`Resolver`] decides between three paths:
//!
//! - **Hit**: the stored value is returned at once and a background task
//!   re-invokes the producer, writing the result back only if it changed.
//! - **Miss**: the producer is invoked synchronously. Its value is stored and
//!   returned; its failure is returned and nothing is written.
//! - **Coalesced miss**: another request is already fetching the same key,
//!   or stored it between the first lookup and the fetch slot. The caller is
//!   served from the store as a hit.
//!
//! A background refresh is handed back as a [`PendingRefresh`] and does not
//! touch the producer until the caller starts it, so the HTTP layer can finish
//! writing the response first. Refreshes never affect the response that
//! scheduled them. Their failures are logged and counted, nothing more. There is no locking around
//! the refresh's read-compare-write, so concurrent refreshes of one key
//! resolve as last-write-wins.
//!
//! # Examples
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use contract_read_cache::cache::{CallKey, MemoryStore, RecordKind};
//! use contract_read_cache::resolver::{CacheStatus, Resolver};
//!
//! let resolver = Resolver::new(Arc::new(MemoryStore::new()));
//! let gateway = gateway.clone();
//! let resolution = resolver
//!     .resolve(RecordKind::Constant, CallKey::constant("totalSupply"), move || {
//!         let gateway = gateway.clone();
//!         async move { gateway.invoke("totalSupply", &[]).await }
//!     })
//!     .await?;
//! assert_eq!(resolution.status, CacheStatus::Miss);
//! ```

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn, Instrument, Span};

use crate::cache::{CacheStore, CachedRecord, CallKey, RecordKind};
use crate::errors::{ProxyError, RpcError};
use crate::tracing::spans;

mod inflight;

use inflight::InFlight;

/// Resolver behaviour switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Schedule a background refresh after a miss as well as after a hit.
    ///
    /// The value a miss returns was fetched moments earlier, so the extra
    /// upstream call is off by default.
    pub refresh_after_miss: bool,
}

impl ResolverConfig {
    /// Sets [`refresh_after_miss`](Self::refresh_after_miss).
    #[must_use]
    pub fn with_refresh_after_miss(mut self, enabled: bool) -> Self {
        self.refresh_after_miss = enabled;
        self
    }
}

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CacheStatus {
    /// Served from the store
    Hit,
    /// Fetched from the gateway during the request
    Miss,
}

impl CacheStatus {
    /// Value of the `x-cache-status` response header.
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a background refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The producer returned the value already served
    Unchanged,
    /// The producer returned a new value and it was stored
    Updated,
    /// The producer or the store failed; the error was logged
    Failed,
}

/// A background refresh waiting for the go-ahead.
///
/// The task is already spawned but parked before its producer call. Call
/// [`start`](Self::start) once the response has been handed off. Dropping
/// the value without starting it releases the task as well.
#[derive(Debug)]
pub struct PendingRefresh {
    start: oneshot::Sender<()>,
    handle: JoinHandle<RefreshOutcome>,
}

impl PendingRefresh {
    /// Releases the refresh and returns its handle.
    ///
    /// Dropping the handle detaches the task; it still runs to completion.
    pub fn start(self) -> JoinHandle<RefreshOutcome> {
        // A closed receiver means the task is already gone; nothing to release.
        let _ = self.start.send(());
        self.handle
    }
}

/// A resolved contract read.
#[derive(Debug)]
pub struct Resolution {
    /// The value to return to the client
    pub value: String,
    /// Whether the value came from the store
    pub status: CacheStatus,
    /// The background refresh, if one was scheduled
    pub refresh: Option<PendingRefresh>,
}

/// Resolver counters since startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolverStats {
    /// Requests served from the store
    pub hits: u64,
    /// Requests that invoked the producer synchronously
    pub misses: u64,
    /// Misses served from the store after waiting on a concurrent fetch
    pub coalesced: u64,
    /// Background refreshes that stored a new value
    pub refresh_updated: u64,
    /// Background refreshes that saw the same value
    pub refresh_unchanged: u64,
    /// Background refreshes that failed
    pub refresh_failed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
    refresh_updated: AtomicU64,
    refresh_unchanged: AtomicU64,
    refresh_failed: AtomicU64,
}

impl Counters {
    fn record_refresh(&self, outcome: RefreshOutcome) {
        let counter = match outcome {
            RefreshOutcome::Updated => &self.refresh_updated,
            RefreshOutcome::Unchanged => &self.refresh_unchanged,
            RefreshOutcome::Failed => &self.refresh_failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> ResolverStats {
        ResolverStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            refresh_updated: self.refresh_updated.load(Ordering::Relaxed),
            refresh_unchanged: self.refresh_unchanged.load(Ordering::Relaxed),
            refresh_failed: self.refresh_failed.load(Ordering::Relaxed),
        }
    }
}

/// Stale-while-revalidate cache in front of a value producer.
pub struct Resolver {
    store: Arc<dyn CacheStore>,
    config: ResolverConfig,
    inflight: InFlight,
    counters: Arc<Counters>,
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("store", &self.store.name())
            .field("config", &self.config)
            .field("inflight", &self.inflight.len())
            .finish()
    }
}

impl Resolver {
    /// Creates a resolver over `store` with the default configuration.
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            config: ResolverConfig::default(),
            inflight: InFlight::default(),
            counters: Arc::default(),
        }
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    /// The store this resolver reads from and writes to.
    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Counters since startup.
    pub fn stats(&self) -> ResolverStats {
        self.counters.snapshot()
    }

    /// Resolves `key`, invoking `invoke` on a miss and after a hit.
    ///
    /// `invoke` may be called twice: once synchronously on a miss, and once
    /// more in the background on a hit (or after a miss when
    /// [`refresh_after_miss`](ResolverConfig::refresh_after_miss) is set).
    ///
    /// # Errors
    ///
    /// - [`ProxyError::UpstreamCallFailed`] when the producer fails on a miss;
    ///   nothing is stored.
    /// - [`ProxyError::Store`] when the store lookup or the miss write fails.
    ///
    /// Background failures are never returned.
    pub async fn resolve<F, Fut>(
        &self,
        kind: RecordKind,
        key: CallKey,
        invoke: F,
    ) -> Result<Resolution, ProxyError>
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<String, RpcError>> + Send + 'static,
    {
        let span = spans::resolve(kind, &key);
        async move {
            if let Some(record) = self.store.find(kind, &key).await? {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                Span::current().record("status", CacheStatus::Hit.as_str());
                let refresh = self.spawn_refresh(kind, key, record.value.clone(), invoke);
                return Ok(Resolution {
                    value: record.value,
                    status: CacheStatus::Hit,
                    refresh: Some(refresh),
                });
            }

            // A fetch that finished between the lookup above and this slot
            // has already stored the value, whether or not we had to wait.
            let (_slot, waited) = self.inflight.acquire(kind, &key).await;
            if let Some(record) = self.store.find(kind, &key).await? {
                self.counters.coalesced.fetch_add(1, Ordering::Relaxed);
                Span::current().record("status", CacheStatus::Hit.as_str());
                debug!(waited, "Served coalesced miss from store");
                return Ok(Resolution {
                    value: record.value,
                    status: CacheStatus::Hit,
                    refresh: None,
                });
            }

            self.counters.misses.fetch_add(1, Ordering::Relaxed);
            Span::current().record("status", CacheStatus::Miss.as_str());

            let value = invoke().await.inspect_err(|e| {
                warn!(error = %e, "Upstream call failed on cache miss");
            })?;

            self.store
                .upsert(kind, CachedRecord::new(key.clone(), value.clone()))
                .await
                .inspect_err(|e| warn!(error = %e, "Failed to store fetched value"))?;

            let refresh = self
                .config
                .refresh_after_miss
                .then(|| self.spawn_refresh(kind, key, value.clone(), invoke));

            Ok(Resolution {
                value,
                status: CacheStatus::Miss,
                refresh,
            })
        }
        .instrument(span)
        .await
    }

    fn spawn_refresh<F, Fut>(
        &self,
        kind: RecordKind,
        key: CallKey,
        served: String,
        invoke: F,
    ) -> PendingRefresh
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<String, RpcError>> + Send + 'static,
    {
        let store = self.store.clone();
        let counters = self.counters.clone();
        let span = spans::background_refresh(kind, &key);
        let (start, released) = oneshot::channel();

        let handle = tokio::spawn(
            async move {
                // Released by `start` or by the sender being dropped.
                let _ = released.await;
                let outcome = refresh(store.as_ref(), kind, key, &served, invoke).await;
                counters.record_refresh(outcome);
                outcome
            }
            .instrument(span),
        );

        PendingRefresh { start, handle }
    }
}

async fn refresh<F, Fut>(
    store: &dyn CacheStore,
    kind: RecordKind,
    key: CallKey,
    served: &str,
    invoke: F,
) -> RefreshOutcome
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<String, RpcError>>,
{
    let fresh = match invoke().await {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "Background refresh failed");
            return RefreshOutcome::Failed;
        }
    };

    if fresh == served {
        debug!("Background refresh unchanged");
        return RefreshOutcome::Unchanged;
    }

    match store.upsert(kind, CachedRecord::new(key, fresh)).await {
        Ok(()) => {
            debug!("Background refresh stored new value");
            RefreshOutcome::Updated
        }
        Err(e) => {
            warn!(error = %e, "Failed to store refreshed value");
            RefreshOutcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;

    fn constant(value: &'static str) -> impl Fn() -> std::future::Ready<Result<String, RpcError>> {
        move || std::future::ready(Ok(value.to_string()))
    }

    #[test]
    fn cache_status_header_values() {
        assert_eq!(CacheStatus::Hit.to_string(), "HIT");
        assert_eq!(CacheStatus::Miss.as_str(), "MISS");
    }

    #[tokio::test]
    async fn miss_then_hit_updates_counters() {
        let resolver = Resolver::new(Arc::new(MemoryStore::new()));
        let key = CallKey::constant("totalSupply");

        let first = resolver
            .resolve(RecordKind::Constant, key.clone(), constant("7"))
            .await
            .unwrap();
        assert_eq!(first.status, CacheStatus::Miss);
        assert!(first.refresh.is_none());

        let second = resolver
            .resolve(RecordKind::Constant, key, constant("7"))
            .await
            .unwrap();
        assert_eq!(second.status, CacheStatus::Hit);
        assert_eq!(
            second.refresh.unwrap().start().await.unwrap(),
            RefreshOutcome::Unchanged
        );

        let stats = resolver.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.refresh_unchanged, 1);
    }

    #[tokio::test]
    async fn refresh_after_miss_schedules_refresh() {
        let resolver = Resolver::new(Arc::new(MemoryStore::new()))
            .with_config(ResolverConfig::default().with_refresh_after_miss(true));

        let resolution = resolver
            .resolve(RecordKind::Constant, CallKey::constant("owner"), constant("0xabc"))
            .await
            .unwrap();
        assert_eq!(resolution.status, CacheStatus::Miss);
        assert_eq!(
            resolution.refresh.unwrap().start().await.unwrap(),
            RefreshOutcome::Unchanged
        );
    }

    #[tokio::test]
    async fn refresh_waits_for_start() {
        use std::sync::atomic::AtomicUsize;

        let store = Arc::new(MemoryStore::new());
        let key = CallKey::constant("owner");
        store
            .upsert(RecordKind::Constant, CachedRecord::new(key.clone(), "0xabc"))
            .await
            .unwrap();
        let resolver = Resolver::new(store);

        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();
        let resolution = resolver
            .resolve(RecordKind::Constant, key, move || {
                counted.fetch_add(1, Ordering::SeqCst);
                std::future::ready(Ok::<_, RpcError>("0xabc".to_string()))
            })
            .await
            .unwrap();

        let pending = resolution.refresh.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert_eq!(pending.start().await.unwrap(), RefreshOutcome::Unchanged);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stats_serialize_for_health_payload() {
        let json = serde_json::to_value(ResolverStats::default()).unwrap();
        assert_eq!(json["coalesced"], 0);
        assert_eq!(json["refresh_failed"], 0);
    }
}
