// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Stale-while-revalidate HTTP read cache in front of a single EVM contract.
//!
//! Reads of contract constants and read-only functions are served from a
//! persistent store and refreshed in the background; the first read of a key
//! goes to the chain synchronously. A poller keeps the current block height
//! in the same store.
//!
//! - [`cache`]: keys, records and the store backends
//! - [`resolver`]: the hit / miss / background-refresh protocol
//! - [`poller`]: periodic block-height snapshots
//! - [`gateway`]: chain access and the contract member allow-list
//! - [`service`] and [`api`]: endpoint behaviour and its HTTP routes
//! - [`bootstrap`]: wiring from [`config::ProxyConfig`]

pub mod api;
pub mod bootstrap;
pub mod cache;
pub mod config;
pub mod errors;
pub mod gateway;
pub mod poller;
pub mod provider;
pub mod resolver;
pub mod service;
mod tracing;
pub mod transport;

pub use errors::{ConfigError, ProxyError, RpcError, StoreError};
