// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Provider factory functions

use alloy_network::AnyNetwork;
use alloy_provider::ProviderBuilder;
use alloy_rpc_client::ClientBuilder;

use crate::errors::RpcError;
use crate::transport::LoggingLayer;

use super::config::ProviderConfig;
use super::AnyHttpProvider;

/// Create an HTTP provider with the given configuration
///
/// Recommended fillers are disabled: the proxy only reads, so a bare
/// `RootProvider` is all it needs.
///
/// # Examples
///
/// ```rust,ignore
/// use contract_read_cache::provider::{create_http_provider, ProviderConfig};
///
/// let provider = create_http_provider(
///     ProviderConfig::new("https://eth.llamarpc.com").with_logging(true)
/// )?;
/// ```
///
/// # Errors
///
/// Returns an error if the URL cannot be parsed.
pub fn create_http_provider(config: ProviderConfig) -> Result<AnyHttpProvider, RpcError> {
    let url: url::Url = config
        .url
        .parse()
        .map_err(|e| RpcError::ProviderUrlInvalid(format!("{e}")))?;

    if config.logging_enabled {
        let client = ClientBuilder::default()
            .layer(LoggingLayer::new().with_slow_call_threshold(config.slow_call_threshold))
            .http(url);

        Ok(ProviderBuilder::new()
            .disable_recommended_fillers()
            .network::<AnyNetwork>()
            .connect_client(client))
    } else {
        let client = ClientBuilder::default().http(url);

        Ok(ProviderBuilder::new()
            .disable_recommended_fillers()
            .network::<AnyNetwork>()
            .connect_client(client))
    }
}
