// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Provider configuration options

use std::time::Duration;

use crate::transport::DEFAULT_SLOW_CALL_THRESHOLD;

/// Configuration for creating providers
///
/// # Example
///
/// ```rust
/// use contract_read_cache::provider::ProviderConfig;
/// use std::time::Duration;
///
/// let config = ProviderConfig::new("https://eth.llamarpc.com")
///     .with_logging(true)
///     .with_slow_call_threshold(Duration::from_secs(2));
/// assert!(config.logging_enabled);
/// ```
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// RPC endpoint URL
    pub url: String,
    /// Whether to log every RPC call through the transport logging layer
    pub logging_enabled: bool,
    /// Calls slower than this are logged at WARN
    pub slow_call_threshold: Duration,
}

impl ProviderConfig {
    /// Create a new provider configuration with the specified URL
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            logging_enabled: false,
            slow_call_threshold: DEFAULT_SLOW_CALL_THRESHOLD,
        }
    }

    /// Enable or disable RPC call logging
    #[must_use]
    pub fn with_logging(mut self, enabled: bool) -> Self {
        self.logging_enabled = enabled;
        self
    }

    /// Set the threshold above which calls are reported as slow
    #[must_use]
    pub fn with_slow_call_threshold(mut self, threshold: Duration) -> Self {
        self.slow_call_threshold = threshold;
        self
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::new("http://localhost:8545")
    }
}
