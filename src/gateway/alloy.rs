// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Gateway backed by an alloy provider and the contract's JSON ABI.

use std::future::IntoFuture;
use std::path::Path;
use std::time::Duration;

use alloy_contract::{ContractInstance, Interface};
use alloy_dyn_abi::{DynSolType, DynSolValue, Specifier};
use alloy_erc20_full::LazyToken;
use alloy_json_abi::{Function, JsonAbi, Param};
use alloy_network::{AnyNetwork, Network};
use alloy_primitives::{Address, U256};
use alloy_provider::Provider;
use async_trait::async_trait;
use tracing::{debug, warn};

use super::{render_outputs, ContractGateway};
use crate::cache::Argument;
use crate::config::constants::DEFAULT_RPC_TIMEOUT;
use crate::errors::RpcError;
use crate::provider::AnyHttpProvider;

/// [`ContractGateway`] over JSON-RPC.
///
/// Contract members are invoked dynamically: the overload is picked by
/// argument count, each [`Argument`] is coerced to the ABI input type, and
/// the decoded outputs are rendered with [`render_outputs`].
///
/// # Examples
///
/// ```rust,ignore
/// use contract_read_cache::gateway::AlloyGateway;
/// use contract_read_cache::provider::{create_http_provider, ProviderConfig};
///
/// let provider = create_http_provider(ProviderConfig::new("http://localhost:8545"))?;
/// let abi = AlloyGateway::load_abi("abi/Lending.json")?;
/// let gateway = AlloyGateway::new(provider, contract_address, abi)
///     .with_timeout(Duration::from_secs(10));
/// ```
pub struct AlloyGateway {
    contract: ContractInstance<AnyHttpProvider, AnyNetwork>,
    timeout: Duration,
}

impl std::fmt::Debug for AlloyGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlloyGateway")
            .field("address", self.contract.address())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl AlloyGateway {
    /// Creates a gateway for the contract at `address`.
    pub fn new(provider: AnyHttpProvider, address: Address, abi: JsonAbi) -> Self {
        Self {
            contract: ContractInstance::new(address, provider, Interface::new(abi)),
            timeout: DEFAULT_RPC_TIMEOUT,
        }
    }

    /// Sets the timeout applied to each upstream call.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reads a JSON ABI from disk.
    ///
    /// Accepts either a bare ABI array or a compiler artifact with an `abi`
    /// field.
    pub fn load_abi(path: impl AsRef<Path>) -> Result<JsonAbi, RpcError> {
        let path = path.as_ref();
        let abi_error = |details: String| RpcError::AbiLoadFailed {
            path: path.display().to_string(),
            details,
        };

        let raw = std::fs::read_to_string(path).map_err(|e| abi_error(e.to_string()))?;
        let value: serde_json::Value =
            serde_json::from_str(&raw).map_err(|e| abi_error(e.to_string()))?;
        let abi = match value {
            serde_json::Value::Object(mut artifact) => artifact
                .remove("abi")
                .ok_or_else(|| abi_error("artifact has no `abi` field".to_string()))?,
            array => array,
        };

        serde_json::from_value(abi).map_err(|e| abi_error(e.to_string()))
    }

    /// The contract ABI this gateway dispatches against.
    pub fn abi(&self) -> &JsonAbi {
        self.contract.abi()
    }

    /// Picks the overload of `member` taking `args.len()` inputs and encodes
    /// the arguments for it.
    fn encode_call(
        &self,
        member: &str,
        args: &[Argument],
    ) -> Result<(&Function, Vec<DynSolValue>), RpcError> {
        let function = self
            .abi()
            .function(member)
            .and_then(|overloads| overloads.iter().find(|f| f.inputs.len() == args.len()))
            .ok_or_else(|| {
                RpcError::call_failed(
                    member,
                    format!("no overload takes {} argument(s)", args.len()),
                )
            })?;

        let values = function
            .inputs
            .iter()
            .zip(args)
            .enumerate()
            .map(|(index, (param, arg))| {
                coerce_argument(param, arg)
                    .map_err(|details| RpcError::argument_encoding(member, index, details))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok((function, values))
    }

    async fn bounded<F: IntoFuture>(&self, operation: &str, call: F) -> Result<F::Output, RpcError> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| {
                warn!(operation, timeout = ?self.timeout, "Upstream call timed out");
                RpcError::timeout(operation, self.timeout)
            })
    }
}

/// Coerces a normalized path argument into the ABI input type.
fn coerce_argument(param: &Param, arg: &Argument) -> Result<DynSolValue, String> {
    let ty: DynSolType = param.resolve().map_err(|e| e.to_string())?;
    match (arg, &ty) {
        (Argument::Bool(value), DynSolType::Bool) => Ok(DynSolValue::Bool(*value)),
        _ => ty.coerce_str(&arg.to_string()).map_err(|e| e.to_string()),
    }
}

async fn erc20_balance<N, P>(provider: &P, token: Address, holder: Address) -> Result<U256, RpcError>
where
    N: Network,
    P: Provider<N> + Clone,
{
    let token_contract = LazyToken::new(token, provider.clone());
    token_contract
        .balance_of(holder)
        .await
        .map_err(|e| RpcError::call_failed("balanceOf", e.to_string()))
}

async fn erc20_symbol<N, P>(provider: &P, token: Address) -> Result<String, RpcError>
where
    N: Network,
    P: Provider<N> + Clone,
{
    let token_contract = LazyToken::new(token, provider.clone());
    token_contract
        .symbol()
        .await
        .map(|symbol| symbol.to_string())
        .map_err(|e| RpcError::call_failed("symbol", e.to_string()))
}

#[async_trait]
impl ContractGateway for AlloyGateway {
    fn contract_address(&self) -> Address {
        *self.contract.address()
    }

    async fn block_number(&self) -> Result<u64, RpcError> {
        self.bounded("eth_blockNumber", self.contract.provider().get_block_number())
            .await?
            .map_err(RpcError::get_block_number_failed)
    }

    async fn invoke(&self, member: &str, args: &[Argument]) -> Result<String, RpcError> {
        let (function, values) = self.encode_call(member, args)?;
        let call = self
            .contract
            .function_from_selector(&function.selector(), &values)
            .map_err(|e| RpcError::call_failed(member, e))?;

        let outputs = self
            .bounded(member, call.call())
            .await?
            .map_err(|e| RpcError::call_failed(member, e))?;

        let rendered = render_outputs(&outputs);
        debug!(member, args = args.len(), "Contract call succeeded");
        Ok(rendered)
    }

    async fn token_balance(&self, token: Address, holder: Address) -> Result<U256, RpcError> {
        self.bounded(
            "balanceOf",
            erc20_balance::<AnyNetwork, _>(self.contract.provider(), token, holder),
        )
        .await?
    }

    async fn token_symbol(&self, token: Address) -> Result<String, RpcError> {
        self.bounded(
            "symbol",
            erc20_symbol::<AnyNetwork, _>(self.contract.provider(), token),
        )
        .await?
    }
}
