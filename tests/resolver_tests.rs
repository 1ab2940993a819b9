// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Tests for stale-while-revalidate resolution
//!
//! Covers the hit, miss and coalesced-miss paths of the resolver against a
//! scripted gateway, including background refresh behaviour and store
//! failures.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use contract_read_cache::cache::{
    Argument, CacheStore, CachedRecord, CallKey, DiskStore, MemoryStore, RecordKind,
};
use contract_read_cache::resolver::{CacheStatus, RefreshOutcome, Resolver};
use contract_read_cache::ProxyError;
use helpers::{producer, FlakyStore, MockGateway};

async fn stored(store: &dyn CacheStore, kind: RecordKind, key: &CallKey) -> Option<String> {
    store.find(kind, key).await.unwrap().map(|record| record.value)
}

#[tokio::test]
async fn test_miss_invokes_gateway_once_and_stores_value() {
    let gateway = Arc::new(MockGateway::new().with_value("totalSupply", "42"));
    let store = Arc::new(MemoryStore::new());
    let resolver = Resolver::new(store.clone());
    let key = CallKey::constant("totalSupply");

    let resolution = resolver
        .resolve(
            RecordKind::Constant,
            key.clone(),
            producer(gateway.clone(), "totalSupply", vec![]),
        )
        .await
        .unwrap();

    assert_eq!(resolution.value, "42");
    assert_eq!(resolution.status, CacheStatus::Miss);
    assert!(resolution.refresh.is_none(), "No refresh after a plain miss");
    assert_eq!(gateway.invocations("totalSupply"), 1);
    assert_eq!(
        stored(store.as_ref(), RecordKind::Constant, &key).await,
        Some("42".to_string())
    );
}

#[tokio::test]
async fn test_hit_returns_before_refresh_completes() {
    let gateway = Arc::new(
        MockGateway::new()
            .with_value("totalSupply", "2")
            .with_gate(),
    );
    let store = Arc::new(MemoryStore::new());
    let key = CallKey::constant("totalSupply");
    store
        .upsert(RecordKind::Constant, CachedRecord::new(key.clone(), "1"))
        .await
        .unwrap();
    let resolver = Resolver::new(store.clone());

    // The gate is closed, so the refresh cannot finish before we return.
    let resolution = resolver
        .resolve(
            RecordKind::Constant,
            key.clone(),
            producer(gateway.clone(), "totalSupply", vec![]),
        )
        .await
        .unwrap();

    assert_eq!(resolution.value, "1");
    assert_eq!(resolution.status, CacheStatus::Hit);
    let refresh = resolution.refresh.expect("hit schedules a refresh").start();
    assert!(!refresh.is_finished());

    gateway.open_gate(1);
    assert_eq!(refresh.await.unwrap(), RefreshOutcome::Updated);
    assert_eq!(
        stored(store.as_ref(), RecordKind::Constant, &key).await,
        Some("2".to_string())
    );

    // The next request sees the refreshed value.
    gateway.open_gate(1);
    let next = resolver
        .resolve(
            RecordKind::Constant,
            key,
            producer(gateway.clone(), "totalSupply", vec![]),
        )
        .await
        .unwrap();
    assert_eq!(next.value, "2");
    assert_eq!(next.refresh.unwrap().start().await.unwrap(), RefreshOutcome::Unchanged);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_refresh_does_not_call_upstream_until_started() {
    let gateway = Arc::new(MockGateway::new().with_value("totalSupply", "2"));
    let store = Arc::new(MemoryStore::new());
    let key = CallKey::constant("totalSupply");
    store
        .upsert(RecordKind::Constant, CachedRecord::new(key.clone(), "1"))
        .await
        .unwrap();
    let resolver = Resolver::new(store.clone());

    let resolution = resolver
        .resolve(
            RecordKind::Constant,
            key.clone(),
            producer(gateway.clone(), "totalSupply", vec![]),
        )
        .await
        .unwrap();
    let pending = resolution.refresh.expect("hit schedules a refresh");

    // Worker threads are free to run the task, yet it stays parked.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(gateway.invocations("totalSupply"), 0);
    assert_eq!(
        stored(store.as_ref(), RecordKind::Constant, &key).await,
        Some("1".to_string())
    );

    assert_eq!(pending.start().await.unwrap(), RefreshOutcome::Updated);
    assert_eq!(gateway.invocations("totalSupply"), 1);
}

#[tokio::test]
async fn test_dropped_pending_refresh_still_runs() {
    let gateway = Arc::new(MockGateway::new().with_value("totalSupply", "2"));
    let store = Arc::new(MemoryStore::new());
    let key = CallKey::constant("totalSupply");
    store
        .upsert(RecordKind::Constant, CachedRecord::new(key.clone(), "1"))
        .await
        .unwrap();
    let resolver = Resolver::new(store.clone());

    let resolution = resolver
        .resolve(
            RecordKind::Constant,
            key.clone(),
            producer(gateway.clone(), "totalSupply", vec![]),
        )
        .await
        .unwrap();
    drop(resolution);

    tokio::time::timeout(Duration::from_secs(1), async {
        while resolver.stats().refresh_updated == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("refresh should run once its starter is dropped");
    assert_eq!(
        stored(store.as_ref(), RecordKind::Constant, &key).await,
        Some("2".to_string())
    );
}

#[tokio::test]
async fn test_unchanged_refresh_does_not_write() {
    let gateway = Arc::new(MockGateway::new().with_value("owner", "0xabc"));
    let store = Arc::new(MemoryStore::new());
    let key = CallKey::constant("owner");
    let original = CachedRecord::new(key.clone(), "0xabc");
    store
        .upsert(RecordKind::Constant, original.clone())
        .await
        .unwrap();
    let writes_before = store.stats().await.writes;
    let resolver = Resolver::new(store.clone());

    let resolution = resolver
        .resolve(
            RecordKind::Constant,
            key.clone(),
            producer(gateway, "owner", vec![]),
        )
        .await
        .unwrap();
    assert_eq!(
        resolution.refresh.unwrap().start().await.unwrap(),
        RefreshOutcome::Unchanged
    );

    assert_eq!(store.stats().await.writes, writes_before);
    let record = store.find(RecordKind::Constant, &key).await.unwrap().unwrap();
    assert_eq!(record.updated_at, original.updated_at);
}

#[tokio::test]
async fn test_background_failure_is_invisible_to_client() {
    let gateway = Arc::new(MockGateway::new());
    gateway.set_failure("totalSupply", "connection refused");
    let store = Arc::new(MemoryStore::new());
    let key = CallKey::constant("totalSupply");
    store
        .upsert(RecordKind::Constant, CachedRecord::new(key.clone(), "7"))
        .await
        .unwrap();
    let resolver = Resolver::new(store.clone());

    let resolution = resolver
        .resolve(
            RecordKind::Constant,
            key.clone(),
            producer(gateway, "totalSupply", vec![]),
        )
        .await
        .expect("hit must succeed even though the gateway is down");

    assert_eq!(resolution.value, "7");
    assert_eq!(
        resolution.refresh.unwrap().start().await.unwrap(),
        RefreshOutcome::Failed
    );
    assert_eq!(
        stored(store.as_ref(), RecordKind::Constant, &key).await,
        Some("7".to_string())
    );
    assert_eq!(resolver.stats().refresh_failed, 1);
}

#[tokio::test]
async fn test_refresh_store_failure_is_swallowed() {
    let gateway = Arc::new(MockGateway::new().with_value("totalSupply", "2"));
    let store = Arc::new(FlakyStore::new());
    let key = CallKey::constant("totalSupply");
    store
        .upsert(RecordKind::Constant, CachedRecord::new(key.clone(), "1"))
        .await
        .unwrap();
    store.fail_writes(true);
    let resolver = Resolver::new(store.clone());

    let resolution = resolver
        .resolve(
            RecordKind::Constant,
            key.clone(),
            producer(gateway.clone(), "totalSupply", vec![]),
        )
        .await
        .expect("hit must succeed even though the store rejects writes");

    assert_eq!(resolution.value, "1");
    assert_eq!(resolution.status, CacheStatus::Hit);
    assert_eq!(
        resolution.refresh.unwrap().start().await.unwrap(),
        RefreshOutcome::Failed
    );
    assert_eq!(gateway.invocations("totalSupply"), 1);
    assert_eq!(
        stored(store.as_ref(), RecordKind::Constant, &key).await,
        Some("1".to_string())
    );

    let stats = resolver.stats();
    assert_eq!(stats.refresh_failed, 1);
    assert_eq!(stats.refresh_updated, 0);
}

#[tokio::test]
async fn test_miss_failure_writes_nothing() {
    let gateway = Arc::new(MockGateway::new());
    gateway.set_failure("getLoan", "execution reverted");
    let store = Arc::new(MemoryStore::new());
    let resolver = Resolver::new(store.clone());
    let key = CallKey::new("getLoan", vec![Argument::Text("5".to_string())]);

    let result = resolver
        .resolve(
            RecordKind::FunctionCall,
            key.clone(),
            producer(gateway, "getLoan", vec![Argument::Text("5".to_string())]),
        )
        .await;

    assert!(matches!(result, Err(ProxyError::UpstreamCallFailed(_))));
    assert_eq!(stored(store.as_ref(), RecordKind::FunctionCall, &key).await, None);
    assert_eq!(store.stats().await.writes, 0);
}

#[tokio::test]
async fn test_store_write_failure_fails_the_miss() {
    let gateway = Arc::new(MockGateway::new().with_value("totalSupply", "42"));
    let store = Arc::new(FlakyStore::new());
    store.fail_writes(true);
    let resolver = Resolver::new(store.clone());

    let result = resolver
        .resolve(
            RecordKind::Constant,
            CallKey::constant("totalSupply"),
            producer(gateway.clone(), "totalSupply", vec![]),
        )
        .await;

    assert!(matches!(result, Err(ProxyError::Store(_))));
    assert_eq!(gateway.invocations("totalSupply"), 1);
}

#[tokio::test]
async fn test_store_read_failure_fails_before_gateway() {
    let gateway = Arc::new(MockGateway::new().with_value("totalSupply", "42"));
    let store = Arc::new(FlakyStore::new());
    store.fail_reads(true);
    let resolver = Resolver::new(store);

    let result = resolver
        .resolve(
            RecordKind::Constant,
            CallKey::constant("totalSupply"),
            producer(gateway.clone(), "totalSupply", vec![]),
        )
        .await;

    assert!(matches!(result, Err(ProxyError::Store(_))));
    assert_eq!(gateway.invocations("totalSupply"), 0);
}

#[tokio::test]
async fn test_concurrent_misses_invoke_gateway_once() {
    let gateway = Arc::new(
        MockGateway::new()
            .with_value("totalSupply", "1000000")
            .with_gate(),
    );
    let resolver = Arc::new(Resolver::new(Arc::new(MemoryStore::new())));

    let spawn_request = || {
        let resolver = resolver.clone();
        let gateway = gateway.clone();
        tokio::spawn(async move {
            resolver
                .resolve(
                    RecordKind::Constant,
                    CallKey::constant("totalSupply"),
                    producer(gateway, "totalSupply", vec![]),
                )
                .await
        })
    };

    let first = spawn_request();
    let second = spawn_request();

    // Both requests are parked: one inside the gateway, one behind it.
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(gateway.invocations("totalSupply"), 1);

    gateway.open_gate(1);
    let first = first.await.unwrap().unwrap();
    let second = second.await.unwrap().unwrap();

    assert_eq!(first.value, "1000000");
    assert_eq!(second.value, "1000000");
    let mut statuses = [first.status, second.status];
    statuses.sort_by_key(|status| status.as_str());
    assert_eq!(statuses, [CacheStatus::Hit, CacheStatus::Miss]);
    assert_eq!(gateway.invocations("totalSupply"), 1);

    let stats = resolver.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.coalesced, 1);
}

#[tokio::test]
async fn test_value_stored_after_lookup_is_served_without_upstream_call() {
    let gateway = Arc::new(MockGateway::new().with_value("totalSupply", "8"));
    let store = Arc::new(FlakyStore::new());
    let key = CallKey::constant("totalSupply");
    store
        .upsert(RecordKind::Constant, CachedRecord::new(key.clone(), "7"))
        .await
        .unwrap();
    // The first lookup misses as though a concurrent fetch stored the value
    // just after it, then released the slot before we asked for it.
    store.miss_next_find();
    let resolver = Resolver::new(store);

    let resolution = resolver
        .resolve(
            RecordKind::Constant,
            key,
            producer(gateway.clone(), "totalSupply", vec![]),
        )
        .await
        .unwrap();

    assert_eq!(resolution.value, "7");
    assert_eq!(resolution.status, CacheStatus::Hit);
    assert!(resolution.refresh.is_none());
    assert_eq!(gateway.invocations("totalSupply"), 0);

    let stats = resolver.stats();
    assert_eq!(stats.misses, 0);
    assert_eq!(stats.coalesced, 1);
}

#[tokio::test]
async fn test_constants_and_function_calls_do_not_alias() {
    let gateway = Arc::new(MockGateway::new().with_value("owner", "0xabc"));
    let store = Arc::new(MemoryStore::new());
    store
        .upsert(
            RecordKind::Constant,
            CachedRecord::new(CallKey::constant("owner"), "stale"),
        )
        .await
        .unwrap();
    let resolver = Resolver::new(store);

    let resolution = resolver
        .resolve(
            RecordKind::FunctionCall,
            CallKey::new("owner", vec![]),
            producer(gateway, "owner", vec![]),
        )
        .await
        .unwrap();

    assert_eq!(resolution.status, CacheStatus::Miss);
    assert_eq!(resolution.value, "0xabc");
}

#[tokio::test]
async fn test_disk_store_serves_hits_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.json");
    let gateway = Arc::new(MockGateway::new().with_value("name", "Loan Book"));
    let key = CallKey::constant("name");

    {
        let store = Arc::new(DiskStore::open(&path).await.unwrap());
        let resolver = Resolver::new(store);
        let resolution = resolver
            .resolve(
                RecordKind::Constant,
                key.clone(),
                producer(gateway.clone(), "name", vec![]),
            )
            .await
            .unwrap();
        assert_eq!(resolution.status, CacheStatus::Miss);
    }

    let store = Arc::new(DiskStore::open(&path).await.unwrap());
    let resolver = Resolver::new(store);
    let resolution = resolver
        .resolve(
            RecordKind::Constant,
            key,
            producer(gateway.clone(), "name", vec![]),
        )
        .await
        .unwrap();

    assert_eq!(resolution.status, CacheStatus::Hit);
    assert_eq!(resolution.value, "Loan Book");
    resolution.refresh.unwrap().start().await.unwrap();
    assert_eq!(gateway.invocations("name"), 2);
}
