// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Environment variable names and defaults
//!
//! Centralizes every setting the proxy reads at startup so that the binary,
//! the documentation and the tests agree on spelling.

use std::time::Duration;

/// Environment variable names
pub mod vars {
    /// JSON-RPC endpoint of the chain node (required)
    pub const RPC_URL: &str = "RPC_URL";
    /// Address of the contract being proxied (required)
    pub const CONTRACT_ADDRESS: &str = "CONTRACT_ADDRESS";
    /// Path to the contract's JSON ABI (required)
    pub const CONTRACT_ABI_PATH: &str = "CONTRACT_ABI_PATH";
    /// Numeric chain id, used for logging and `/health`
    pub const CHAIN_ID: &str = "CHAIN_ID";
    /// HTTP listen port
    pub const API_PORT: &str = "API_PORT";
    /// `disk` or `memory`
    pub const CACHE_BACKEND: &str = "CACHE_BACKEND";
    /// Disk store file
    pub const CACHE_PATH: &str = "CACHE_PATH";
    /// Maximum number of retained block-height snapshots (both backends)
    pub const CACHE_MAX_SNAPSHOTS: &str = "CACHE_MAX_SNAPSHOTS";
    /// Seconds between block-height polls
    pub const BLOCK_POLL_INTERVAL_SECS: &str = "BLOCK_POLL_INTERVAL_SECS";
    /// Per-call upstream timeout in seconds
    pub const RPC_TIMEOUT_SECS: &str = "RPC_TIMEOUT_SECS";
    /// Log every RPC call through the transport layer
    pub const RPC_LOGGING: &str = "RPC_LOGGING";
    /// Schedule a background refresh after a miss too
    pub const REFRESH_AFTER_MISS: &str = "REFRESH_AFTER_MISS";
    /// Comma-separated CORS origins; empty allows any origin
    pub const ALLOWED_ORIGINS: &str = "ALLOWED_ORIGINS";
    /// `pretty` or `json`
    pub const LOG_FORMAT: &str = "LOG_FORMAT";
}

/// Default HTTP listen port
pub const DEFAULT_API_PORT: u16 = 3000;

/// Default disk store location
pub const DEFAULT_CACHE_PATH: &str = "cache/contract-cache.json";

/// Default cap on retained block-height snapshots
pub const DEFAULT_MAX_SNAPSHOTS: usize = 1_000;

/// Default block-height poll interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Default per-call upstream timeout
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(30);
