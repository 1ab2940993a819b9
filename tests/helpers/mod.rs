// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Test helpers for contract-read-cache integration tests
//!
//! Provides mock implementations of the gateway and store traits so that the
//! resolver, poller and HTTP surface can be tested without a chain node.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use alloy_primitives::{address, Address, U256};
use async_trait::async_trait;
use contract_read_cache::cache::{
    Argument, BlockHeightSnapshot, CacheStore, CachedRecord, CallKey, MemoryStore, RecordKind,
    StoreStats,
};
use contract_read_cache::{RpcError, StoreError};
use tokio::sync::Semaphore;

/// Address every mock gateway reports as its contract.
pub const CONTRACT: Address = address!("5fbdb2315678afecb367f032d93f642f64180aa3");

/// Scriptable [`ContractGateway`](contract_read_cache::gateway::ContractGateway)
///
/// Each member answers with whatever was last scripted for it. Unscripted
/// members revert. Every invocation is recorded before the optional gate is
/// awaited, so tests can observe calls that are still in flight.
///
/// # Example
///
/// ```rust,ignore
/// let gateway = Arc::new(MockGateway::new().with_value("totalSupply", "1000000"));
/// gateway.set_value("totalSupply", "2000000");
/// assert_eq!(gateway.invocations("totalSupply"), 0);
/// ```
pub struct MockGateway {
    values: Mutex<HashMap<String, Result<String, String>>>,
    block_number: Mutex<Result<u64, String>>,
    calls: Mutex<Vec<(String, Vec<Argument>)>>,
    block_number_calls: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGateway {
    /// Create a gateway with no scripted members and block height 0
    pub fn new() -> Self {
        Self {
            values: Mutex::new(HashMap::new()),
            block_number: Mutex::new(Ok(0)),
            calls: Mutex::new(Vec::new()),
            block_number_calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    /// Script a successful result for `member`
    pub fn with_value(self, member: &str, value: &str) -> Self {
        self.set_value(member, value);
        self
    }

    /// Hold every `invoke` until [`open_gate`](Self::open_gate) releases it
    pub fn with_gate(mut self) -> Self {
        self.gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    /// Let `calls` gated invocations proceed
    pub fn open_gate(&self, calls: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(calls);
        }
    }

    pub fn set_value(&self, member: &str, value: &str) {
        self.values
            .lock()
            .unwrap()
            .insert(member.to_string(), Ok(value.to_string()));
    }

    pub fn set_failure(&self, member: &str, message: &str) {
        self.values
            .lock()
            .unwrap()
            .insert(member.to_string(), Err(message.to_string()));
    }

    pub fn set_block_number(&self, height: u64) {
        *self.block_number.lock().unwrap() = Ok(height);
    }

    pub fn fail_block_number(&self, message: &str) {
        *self.block_number.lock().unwrap() = Err(message.to_string());
    }

    /// Number of times `member` was invoked
    pub fn invocations(&self, member: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name == member)
            .count()
    }

    /// Every invocation, in order
    pub fn calls(&self) -> Vec<(String, Vec<Argument>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn block_number_calls(&self) -> usize {
        self.block_number_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl contract_read_cache::gateway::ContractGateway for MockGateway {
    fn contract_address(&self) -> Address {
        CONTRACT
    }

    async fn block_number(&self) -> Result<u64, RpcError> {
        self.block_number_calls.fetch_add(1, Ordering::SeqCst);
        self.block_number
            .lock()
            .unwrap()
            .clone()
            .map_err(RpcError::get_block_number_failed)
    }

    async fn invoke(&self, member: &str, args: &[Argument]) -> Result<String, RpcError> {
        self.calls
            .lock()
            .unwrap()
            .push((member.to_string(), args.to_vec()));

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }

        let scripted = self.values.lock().unwrap().get(member).cloned();
        match scripted {
            Some(Ok(value)) => Ok(value),
            Some(Err(message)) => Err(RpcError::call_failed(member, message)),
            None => Err(RpcError::call_failed(member, "execution reverted")),
        }
    }

    async fn token_balance(&self, token: Address, holder: Address) -> Result<U256, RpcError> {
        if token == Address::ZERO {
            return Err(RpcError::call_failed("balanceOf", "not a token"));
        }
        Ok(U256::from(holder.0[19]) * U256::from(1_000u64))
    }

    async fn token_symbol(&self, token: Address) -> Result<String, RpcError> {
        if token == Address::ZERO {
            return Err(RpcError::call_failed("symbol", "not a token"));
        }
        Ok("MOCK".to_string())
    }
}

/// A [`MemoryStore`] whose writes (and optionally reads) can be made to fail
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    miss_next_find: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes the next `find` report nothing, as if the record landed just
    /// after the lookup
    pub fn miss_next_find(&self) {
        self.miss_next_find.store(true, Ordering::SeqCst);
    }

    fn check(&self, flag: &AtomicBool, operation: &str) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            Err(StoreError::io(
                "flaky-store",
                format!("{operation} failed: disk full"),
                None,
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CacheStore for FlakyStore {
    async fn find(
        &self,
        kind: RecordKind,
        key: &CallKey,
    ) -> Result<Option<CachedRecord>, StoreError> {
        self.check(&self.fail_reads, "find")?;
        if self.miss_next_find.swap(false, Ordering::SeqCst) {
            return Ok(None);
        }
        self.inner.find(kind, key).await
    }

    async fn upsert(&self, kind: RecordKind, record: CachedRecord) -> Result<(), StoreError> {
        self.check(&self.fail_writes, "upsert")?;
        self.inner.upsert(kind, record).await
    }

    async fn latest_snapshot(&self) -> Result<Option<BlockHeightSnapshot>, StoreError> {
        self.check(&self.fail_reads, "latest_snapshot")?;
        self.inner.latest_snapshot().await
    }

    async fn append_snapshot(&self, snapshot: BlockHeightSnapshot) -> Result<(), StoreError> {
        self.check(&self.fail_writes, "append_snapshot")?;
        self.inner.append_snapshot(snapshot).await
    }

    async fn stats(&self) -> StoreStats {
        self.inner.stats().await
    }

    fn name(&self) -> &'static str {
        "FlakyStore"
    }
}

/// Producer closure that invokes `member` with `args` on `gateway`
pub fn producer(
    gateway: Arc<MockGateway>,
    member: &'static str,
    args: Vec<Argument>,
) -> impl Fn() -> futures::future::BoxFuture<'static, Result<String, RpcError>> + Send + 'static {
    use contract_read_cache::gateway::ContractGateway;

    move || {
        let gateway = gateway.clone();
        let args = args.clone();
        Box::pin(async move { gateway.invoke(member, &args).await })
    }
}
