// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Endpoint behaviour, independent of HTTP.
//!
//! [`ContractService`] is the explicit context every handler works through:
//! it owns the gateway, the resolver (and through it the store) and the
//! member allow-list. Nothing here knows about status codes or headers.

use std::str::FromStr;
use std::sync::Arc;

use alloy_chains::Chain;
use alloy_primitives::{Address, U256};
use serde::Serialize;
use tracing::{debug, Instrument};

use crate::cache::{build_key, Argument, CallKey, RecordKind, StoreStats};
use crate::errors::ProxyError;
use crate::gateway::{ContractGateway, MemberTable};
use crate::resolver::{Resolution, Resolver, ResolverStats};
use crate::tracing::spans;

/// Store section of the health report.
#[derive(Debug, Clone, Serialize)]
pub struct StoreHealth {
    /// Backend name
    pub backend: &'static str,
    /// Backend counters
    #[serde(flatten)]
    pub stats: StoreStats,
}

/// Payload of `GET /health`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    /// Always `"ok"` while the process is serving
    pub status: &'static str,
    /// Proxied contract
    pub contract_address: Address,
    /// Chain name or id, when configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain: Option<String>,
    /// Latest stored block height; `None` until the poller's first success
    pub latest_block: Option<u64>,
    /// Number of allowed constants
    pub constants: usize,
    /// Number of allowed function names
    pub functions: usize,
    /// Store backend and counters
    pub store: StoreHealth,
    /// Resolver counters
    pub resolver: ResolverStats,
}

/// Implements every endpoint on top of the gateway and the resolver.
pub struct ContractService {
    gateway: Arc<dyn ContractGateway>,
    resolver: Resolver,
    members: MemberTable,
    chain: Option<Chain>,
}

impl ContractService {
    /// Creates a service over an already-configured resolver.
    pub fn new(gateway: Arc<dyn ContractGateway>, resolver: Resolver, members: MemberTable) -> Self {
        Self {
            gateway,
            resolver,
            members,
            chain: None,
        }
    }

    /// Records the chain for the health report.
    #[must_use]
    pub fn with_chain(mut self, chain: Option<Chain>) -> Self {
        self.chain = chain;
        self
    }

    /// The resolver backing constant and function-call reads.
    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Latest stored block height, or a live uncached read when the poller
    /// has not stored one yet.
    pub async fn block_number(&self) -> Result<u64, ProxyError> {
        if let Some(snapshot) = self.resolver.store().latest_snapshot().await? {
            return Ok(snapshot.height);
        }

        debug!("No block-height snapshot yet, reading live");
        let height = self
            .gateway
            .block_number()
            .instrument(spans::live_block_number())
            .await?;
        Ok(height)
    }

    /// Address of the proxied contract.
    pub fn contract_address(&self) -> Address {
        self.gateway.contract_address()
    }

    /// Reads a zero-argument constant through the cache.
    pub async fn constant(&self, name: &str) -> Result<Resolution, ProxyError> {
        self.members.check_constant(name)?;
        let key = CallKey::constant(name);
        self.resolver
            .resolve(RecordKind::Constant, key, self.producer(name, Vec::new()))
            .await
    }

    /// Calls a read-only function with raw path segments through the cache.
    ///
    /// Empty segments are ignored; `"true"` and `"false"` become booleans.
    pub async fn function_call<S: AsRef<str>>(
        &self,
        name: &str,
        raw_args: &[S],
    ) -> Result<Resolution, ProxyError> {
        let (key, args) = build_key(name, raw_args);
        self.members.check_function(name, args.len())?;
        self.resolver
            .resolve(RecordKind::FunctionCall, key, self.producer(name, args))
            .await
    }

    /// ERC-20 balance of `holder` on `token`, uncached.
    pub async fn token_balance(&self, token: &str, holder: &str) -> Result<U256, ProxyError> {
        let token = parse_address(token)?;
        let holder = parse_address(holder)?;
        Ok(self.gateway.token_balance(token, holder).await?)
    }

    /// ERC-20 symbol of `token`, uncached.
    pub async fn token_symbol(&self, token: &str) -> Result<String, ProxyError> {
        let token = parse_address(token)?;
        Ok(self.gateway.token_symbol(token).await?)
    }

    /// Current health report.
    ///
    /// A store failure while reading the latest snapshot is reported as an
    /// unknown height rather than failing the health check.
    pub async fn health(&self) -> HealthReport {
        let store = self.resolver.store();
        let latest_block = store
            .latest_snapshot()
            .await
            .ok()
            .flatten()
            .map(|snapshot| snapshot.height);

        HealthReport {
            status: "ok",
            contract_address: self.contract_address(),
            chain: self.chain.map(|chain| chain.to_string()),
            latest_block,
            constants: self.members.constant_count(),
            functions: self.members.function_count(),
            store: StoreHealth {
                backend: store.name(),
                stats: store.stats().await,
            },
            resolver: self.resolver.stats(),
        }
    }

    /// Producer that invokes `member` with `args` on every call.
    fn producer(
        &self,
        member: &str,
        args: Vec<Argument>,
    ) -> impl Fn() -> futures::future::BoxFuture<'static, Result<String, crate::errors::RpcError>>
           + Send
           + 'static {
        let gateway = self.gateway.clone();
        let member: Arc<str> = Arc::from(member);
        let args: Arc<[Argument]> = Arc::from(args);
        move || {
            let gateway = gateway.clone();
            let member = member.clone();
            let args = args.clone();
            Box::pin(async move { gateway.invoke(&member, &args).await })
        }
    }
}

fn parse_address(raw: &str) -> Result<Address, ProxyError> {
    Address::from_str(raw).map_err(|_| ProxyError::invalid_address(raw))
}
