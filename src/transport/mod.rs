// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Transport layer utilities for Alloy providers.
//!
//! Tower middleware applied to the RPC client built by
//! [`create_http_provider`](crate::provider::create_http_provider).
//!
//! ```rust,ignore
//! use contract_read_cache::transport::LoggingLayer;
//! use alloy_rpc_client::ClientBuilder;
//! use alloy_provider::ProviderBuilder;
//!
//! let client = ClientBuilder::default()
//!     .layer(LoggingLayer::new())
//!     .http(rpc_url);
//!
//! let provider = ProviderBuilder::new()
//!     .connect_client(client);
//! ```

mod logging;

pub use logging::{LoggingLayer, LoggingService, DEFAULT_SLOW_CALL_THRESHOLD};
