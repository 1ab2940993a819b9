// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Configuration for the read-cache proxy
//!
//! Settings come from the environment (optionally seeded from a `.env` file).
//! Three are required: the RPC endpoint, the contract address and the path to
//! its ABI. Everything else has a default.
//!
//! # Example: From the environment
//!
//! ```rust,ignore
//! use contract_read_cache::config::ProxyConfig;
//!
//! let config = ProxyConfig::from_env()?;
//! ```
//!
//! # Example: Programmatic
//!
//! ```rust
//! use contract_read_cache::config::{CacheBackend, ProxyConfig};
//! use alloy_primitives::Address;
//! use std::time::Duration;
//!
//! let config = ProxyConfig::new("http://localhost:8545", Address::ZERO, "abi/Lending.json")
//!     .with_cache_backend(CacheBackend::Memory)
//!     .with_poll_interval(Duration::from_secs(5));
//! assert_eq!(config.api_port, 3000);
//! ```

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use alloy_chains::Chain;
use alloy_primitives::Address;

use crate::errors::ConfigError;

pub mod constants;

use constants::{
    vars, DEFAULT_API_PORT, DEFAULT_CACHE_PATH, DEFAULT_MAX_SNAPSHOTS, DEFAULT_POLL_INTERVAL,
    DEFAULT_RPC_TIMEOUT,
};

/// Which [`CacheStore`](crate::cache::CacheStore) backend to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheBackend {
    /// [`DiskStore`](crate::cache::DiskStore), persisted across restarts
    #[default]
    Disk,
    /// [`MemoryStore`](crate::cache::MemoryStore), lost on restart
    Memory,
}

impl FromStr for CacheBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disk" => Ok(CacheBackend::Disk),
            "memory" => Ok(CacheBackend::Memory),
            _ => Err("expected `disk` or `memory`".to_string()),
        }
    }
}

impl fmt::Display for CacheBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheBackend::Disk => f.write_str("disk"),
            CacheBackend::Memory => f.write_str("memory"),
        }
    }
}

/// Log output format of the binary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, coloured
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err("expected `pretty` or `json`".to_string()),
        }
    }
}

/// Configuration for the proxy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// JSON-RPC endpoint of the chain node
    pub rpc_url: String,
    /// The contract being proxied
    pub contract_address: Address,
    /// JSON ABI of the contract (bare array or compiler artifact)
    pub abi_path: PathBuf,
    /// Chain the contract lives on, if known
    pub chain: Option<Chain>,
    /// HTTP listen port
    /// Default: 3000
    pub api_port: u16,
    /// Store backend
    /// Default: disk
    pub cache_backend: CacheBackend,
    /// Disk store file
    /// Default: `cache/contract-cache.json`
    pub cache_path: PathBuf,
    /// Cap on retained block-height snapshots, applied by either backend
    /// Default: 1000
    pub max_snapshots: usize,
    /// Block-height poll interval
    /// Default: 10 seconds
    pub poll_interval: Duration,
    /// Per-call upstream timeout
    /// Default: 30 seconds
    pub rpc_timeout: Duration,
    /// Log every RPC call through the transport layer
    /// Default: true
    pub rpc_logging: bool,
    /// Schedule a background refresh after a miss too
    /// Default: false
    pub refresh_after_miss: bool,
    /// CORS origins; empty allows any origin
    pub allowed_origins: Vec<String>,
    /// Log output format
    /// Default: pretty
    pub log_format: LogFormat,
}

impl ProxyConfig {
    /// Creates a configuration with every optional setting at its default.
    pub fn new(
        rpc_url: impl Into<String>,
        contract_address: Address,
        abi_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            contract_address,
            abi_path: abi_path.into(),
            chain: None,
            api_port: DEFAULT_API_PORT,
            cache_backend: CacheBackend::default(),
            cache_path: PathBuf::from(DEFAULT_CACHE_PATH),
            max_snapshots: DEFAULT_MAX_SNAPSHOTS,
            poll_interval: DEFAULT_POLL_INTERVAL,
            rpc_timeout: DEFAULT_RPC_TIMEOUT,
            rpc_logging: true,
            refresh_after_miss: false,
            allowed_origins: Vec::new(),
            log_format: LogFormat::default(),
        }
    }

    /// Loads `.env` if present, then reads the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] for an unset required variable and
    /// [`ConfigError::Invalid`] for any value that cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|var| dotenvy::var(var).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup<L>(lookup: L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| {
            lookup(var)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let require = |var: &str| get(var).ok_or_else(|| ConfigError::missing(var));

        let rpc_url = require(vars::RPC_URL)?;
        url::Url::parse(&rpc_url)
            .map_err(|e| ConfigError::invalid(vars::RPC_URL, &rpc_url, e.to_string()))?;

        let contract_address = parse_value::<Address>(
            vars::CONTRACT_ADDRESS,
            &require(vars::CONTRACT_ADDRESS)?,
        )?;
        let abi_path = PathBuf::from(require(vars::CONTRACT_ABI_PATH)?);

        let mut config = Self::new(rpc_url, contract_address, abi_path);

        if let Some(raw) = get(vars::CHAIN_ID) {
            config.chain = Some(Chain::from_id(parse_value::<u64>(vars::CHAIN_ID, &raw)?));
        }
        if let Some(raw) = get(vars::API_PORT) {
            config.api_port = parse_value(vars::API_PORT, &raw)?;
        }
        if let Some(raw) = get(vars::CACHE_BACKEND) {
            config.cache_backend = parse_value(vars::CACHE_BACKEND, &raw)?;
        }
        if let Some(raw) = get(vars::CACHE_PATH) {
            config.cache_path = PathBuf::from(raw);
        }
        if let Some(raw) = get(vars::CACHE_MAX_SNAPSHOTS) {
            config.max_snapshots = parse_positive(vars::CACHE_MAX_SNAPSHOTS, &raw)? as usize;
        }
        if let Some(raw) = get(vars::BLOCK_POLL_INTERVAL_SECS) {
            config.poll_interval =
                Duration::from_secs(parse_positive(vars::BLOCK_POLL_INTERVAL_SECS, &raw)?);
        }
        if let Some(raw) = get(vars::RPC_TIMEOUT_SECS) {
            config.rpc_timeout = Duration::from_secs(parse_positive(vars::RPC_TIMEOUT_SECS, &raw)?);
        }
        if let Some(raw) = get(vars::RPC_LOGGING) {
            config.rpc_logging = parse_flag(vars::RPC_LOGGING, &raw)?;
        }
        if let Some(raw) = get(vars::REFRESH_AFTER_MISS) {
            config.refresh_after_miss = parse_flag(vars::REFRESH_AFTER_MISS, &raw)?;
        }
        if let Some(raw) = get(vars::ALLOWED_ORIGINS) {
            config.allowed_origins = raw
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(raw) = get(vars::LOG_FORMAT) {
            config.log_format = parse_value(vars::LOG_FORMAT, &raw)?;
        }

        Ok(config)
    }

    /// Set the chain the contract lives on
    #[must_use]
    pub fn with_chain(mut self, chain: Chain) -> Self {
        self.chain = Some(chain);
        self
    }

    /// Set the HTTP listen port
    #[must_use]
    pub fn with_api_port(mut self, port: u16) -> Self {
        self.api_port = port;
        self
    }

    /// Set the store backend
    #[must_use]
    pub fn with_cache_backend(mut self, backend: CacheBackend) -> Self {
        self.cache_backend = backend;
        self
    }

    /// Set the disk store file
    #[must_use]
    pub fn with_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = path.into();
        self
    }

    /// Cap the number of retained block-height snapshots
    #[must_use]
    pub fn with_max_snapshots(mut self, max: usize) -> Self {
        self.max_snapshots = max;
        self
    }

    /// Set the block-height poll interval
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the per-call upstream timeout
    #[must_use]
    pub fn with_rpc_timeout(mut self, timeout: Duration) -> Self {
        self.rpc_timeout = timeout;
        self
    }

    /// Enable or disable RPC call logging
    #[must_use]
    pub fn with_rpc_logging(mut self, enabled: bool) -> Self {
        self.rpc_logging = enabled;
        self
    }

    /// Schedule a background refresh after a miss too
    #[must_use]
    pub fn with_refresh_after_miss(mut self, enabled: bool) -> Self {
        self.refresh_after_miss = enabled;
        self
    }

    /// Restrict CORS to these origins
    #[must_use]
    pub fn with_allowed_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_origins = origins.into_iter().map(Into::into).collect();
        self
    }

    /// Set the log output format
    #[must_use]
    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }
}

fn parse_value<T>(var: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.parse()
        .map_err(|e: T::Err| ConfigError::invalid(var, raw, e.to_string()))
}

fn parse_positive(var: &str, raw: &str) -> Result<u64, ConfigError> {
    match parse_value::<u64>(var, raw)? {
        0 => Err(ConfigError::invalid(var, raw, "must be greater than zero")),
        value => Ok(value),
    }
}

fn parse_flag(var: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(var, raw, "expected a boolean")),
    }
}
