// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Blockchain gateway: the only part of the crate that talks to the chain.
//!
//! The gateway knows nothing about caching. It answers three kinds of
//! questions:
//!
//! - the current block height,
//! - the result of a read-only member of the configured contract, invoked by
//!   name with positional [`Argument`]s and rendered as a string,
//! - ERC-20 `balanceOf` / `symbol` reads against arbitrary tokens.
//!
//! [`AlloyGateway`] is the production implementation. Tests substitute their
//! own [`ContractGateway`].

use alloy_primitives::{Address, U256};
use async_trait::async_trait;

use crate::cache::Argument;
use crate::errors::RpcError;

mod alloy;
mod members;
mod render;

pub use alloy::AlloyGateway;
pub use members::{MemberKind, MemberTable};
pub use render::render_outputs;

/// Read access to the chain and to the configured contract.
///
/// # Thread Safety
///
/// Implementations are shared between request handlers, background refresh
/// tasks and the block-height poller.
#[async_trait]
pub trait ContractGateway: Send + Sync {
    /// Address of the contract this gateway reads from.
    fn contract_address(&self) -> Address;

    /// Returns the current block height.
    async fn block_number(&self) -> Result<u64, RpcError>;

    /// Invokes a read-only contract member and returns its result in
    /// canonical string form (decimal for integers).
    async fn invoke(&self, member: &str, args: &[Argument]) -> Result<String, RpcError>;

    /// ERC-20 `balanceOf(holder)` on `token`.
    async fn token_balance(&self, token: Address, holder: Address) -> Result<U256, RpcError>;

    /// ERC-20 `symbol()` on `token`.
    async fn token_symbol(&self, token: Address) -> Result<String, RpcError>;
}
