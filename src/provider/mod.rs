// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! HTTP provider construction.
//!
//! The proxy talks to one chain endpoint chosen at runtime, so providers are
//! built over `AnyNetwork`. Only read calls are made (`eth_call`,
//! `eth_blockNumber`), which `AnyNetwork` handles on every EVM chain.
//!
//! # Examples
//!
//! ```rust,ignore
//! use contract_read_cache::provider::{create_http_provider, ProviderConfig};
//!
//! let provider = create_http_provider(ProviderConfig::new("https://eth.llamarpc.com"))?;
//! let block_number = provider.get_block_number().await?;
//! ```

mod config;
mod factory;

pub use config::ProviderConfig;
pub use factory::create_http_provider;

use alloy_network::AnyNetwork;

/// Type alias for an HTTP provider using AnyNetwork
pub type AnyHttpProvider = alloy_provider::RootProvider<AnyNetwork>;
