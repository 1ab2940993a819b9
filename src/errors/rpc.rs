// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! RPC error types for the blockchain gateway.
//!
//! Every failure that originates while talking to the chain endpoint (block
//! height lookups, contract reads, ERC-20 pass-through reads) is expressed as
//! an [`RpcError`]. On the synchronous request path these surface to clients
//! as `UpstreamCallFailed`; on background paths they are logged and dropped.

use std::time::Duration;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while talking to the chain endpoint.
///
/// # Examples
///
/// ```rust
/// use contract_read_cache::RpcError;
///
/// let error = RpcError::call_failed("totalSupply", "execution reverted");
/// assert_eq!(error.to_string(), "Contract call `totalSupply` failed");
/// ```
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// Failed to fetch the current block number.
    #[error("Failed to get current block number")]
    GetBlockNumberFailed {
        /// The underlying provider error
        #[source]
        source: BoxError,
    },

    /// A contract read reverted, was rejected by the node, or its output could
    /// not be decoded.
    #[error("Contract call `{member}` failed")]
    CallFailed {
        /// Contract member that was invoked
        member: String,
        /// The underlying provider or decoding error
        #[source]
        source: BoxError,
    },

    /// An argument could not be encoded as the ABI type the member expects.
    ///
    /// This is detected locally before any request is sent to the node.
    #[error("Invalid argument {index} for `{member}`: {details}")]
    ArgumentEncoding {
        /// Contract member being called
        member: String,
        /// Zero-based position of the offending argument
        index: usize,
        /// Why the argument was rejected
        details: String,
    },

    /// The RPC did not answer within the configured timeout.
    #[error("RPC `{operation}` timed out after {timeout:?}")]
    Timeout {
        /// Operation that timed out
        operation: String,
        /// Configured timeout
        timeout: Duration,
    },

    /// The RPC endpoint URL could not be parsed.
    #[error("Invalid provider URL: {0}")]
    ProviderUrlInvalid(String),

    /// The contract ABI could not be read or parsed.
    #[error("Failed to load contract ABI from {path}: {details}")]
    AbiLoadFailed {
        /// Path of the ABI file
        path: String,
        /// Details about the failure
        details: String,
    },
}

impl RpcError {
    /// Helper to create a `GetBlockNumberFailed` error from any error type.
    pub fn get_block_number_failed(source: impl Into<BoxError>) -> Self {
        RpcError::GetBlockNumberFailed {
            source: source.into(),
        }
    }

    /// Helper to create a `CallFailed` error from any error type.
    pub fn call_failed(member: impl Into<String>, source: impl Into<BoxError>) -> Self {
        RpcError::CallFailed {
            member: member.into(),
            source: source.into(),
        }
    }

    /// Helper to create an `ArgumentEncoding` error.
    pub fn argument_encoding(
        member: impl Into<String>,
        index: usize,
        details: impl Into<String>,
    ) -> Self {
        RpcError::ArgumentEncoding {
            member: member.into(),
            index,
            details: details.into(),
        }
    }

    /// Helper to create a `Timeout` error.
    pub fn timeout(operation: impl Into<String>, timeout: Duration) -> Self {
        RpcError::Timeout {
            operation: operation.into(),
            timeout,
        }
    }

    /// Returns true when the error was caused by the caller's input rather than
    /// the upstream node.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, RpcError::ArgumentEncoding { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn call_failed_keeps_source() {
        let error = RpcError::call_failed("getLoan", "execution reverted");
        assert_eq!(error.to_string(), "Contract call `getLoan` failed");
        assert_eq!(
            error.source().map(|s| s.to_string()),
            Some("execution reverted".to_string())
        );
    }

    #[test]
    fn argument_encoding_is_client_error() {
        let error = RpcError::argument_encoding("getLoan", 1, "expected uint256");
        assert!(error.is_client_error());
        assert!(!RpcError::timeout("eth_call", Duration::from_secs(1)).is_client_error());
    }
}
