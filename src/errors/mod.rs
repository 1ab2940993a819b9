// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for the contract read cache.
//!
//! Errors follow a hybrid layout:
//!
//! - **Component errors** for fine-grained handling: [`RpcError`] from the
//!   blockchain gateway, [`StoreError`] from cache store backends and
//!   [`ConfigError`] from configuration loading.
//! - **Unified error type** ([`ProxyError`]) returned by the service layer,
//!   which the HTTP surface maps onto status codes.
//!
//! # Examples
//!
//! ```rust
//! use contract_read_cache::{ProxyError, RpcError};
//!
//! let error: ProxyError = RpcError::call_failed("totalSupply", "reverted").into();
//! assert!(matches!(error, ProxyError::UpstreamCallFailed(_)));
//! ```

mod config;
mod rpc;
mod store;

pub use config::ConfigError;
pub use rpc::RpcError;
pub use store::StoreError;

/// Unified error type for every request-path operation.
///
/// Background work (refreshes, poller ticks) never produces a `ProxyError`
/// that reaches a client: those failures are logged where they occur.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// The gateway failed on the synchronous path.
    #[error("Upstream call failed: {0}")]
    UpstreamCallFailed(#[from] RpcError),

    /// The cache store failed on the synchronous path.
    #[error("Cache store error: {0}")]
    Store(#[from] StoreError),

    /// The contract member is not on the allow-list.
    #[error("Unknown contract member: {name}")]
    UnknownMember {
        /// Requested member name
        name: String,
    },

    /// The member exists but was called with the wrong number of arguments.
    #[error("`{member}` expects {expected} argument(s), got {got}")]
    InvalidArguments {
        /// Requested member name
        member: String,
        /// Number of inputs in the ABI
        expected: usize,
        /// Number of arguments supplied
        got: usize,
    },

    /// A path segment that must be an address could not be parsed.
    #[error("Invalid address: {value}")]
    InvalidAddress {
        /// The rejected input
        value: String,
    },
}

impl ProxyError {
    /// Create an `UnknownMember` error.
    pub fn unknown_member(name: impl Into<String>) -> Self {
        ProxyError::UnknownMember { name: name.into() }
    }

    /// Create an `InvalidAddress` error.
    pub fn invalid_address(value: impl Into<String>) -> Self {
        ProxyError::InvalidAddress {
            value: value.into(),
        }
    }

    /// Renders the error and all of its sources as a single message.
    ///
    /// ```rust
    /// use contract_read_cache::{ProxyError, RpcError};
    ///
    /// let error: ProxyError = RpcError::call_failed("getLoan", "execution reverted").into();
    /// assert_eq!(
    ///     error.report(),
    ///     "Upstream call failed: Contract call `getLoan` failed: execution reverted"
    /// );
    /// ```
    pub fn report(&self) -> String {
        let mut message = self.to_string();
        let mut source = std::error::Error::source(self);
        // The top-level Display already embeds the first wrapped error.
        if matches!(self, ProxyError::UpstreamCallFailed(_) | ProxyError::Store(_)) {
            source = source.and_then(std::error::Error::source);
        }
        while let Some(err) = source {
            message.push_str(": ");
            message.push_str(&err.to_string());
            source = err.source();
        }
        message
    }
}
