// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for loading [`ProxyConfig`](crate::config::ProxyConfig).

/// Errors that can occur while building the proxy configuration.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required environment variable is not set.
    #[error("Missing required setting `{var}`")]
    Missing {
        /// Name of the variable
        var: String,
    },

    /// A setting is present but could not be parsed.
    #[error("Invalid value `{value}` for `{var}`: {reason}")]
    Invalid {
        /// Name of the variable
        var: String,
        /// The raw value that was rejected
        value: String,
        /// Why it was rejected
        reason: String,
    },
}

impl ConfigError {
    /// Create a `Missing` error.
    pub fn missing(var: impl Into<String>) -> Self {
        ConfigError::Missing { var: var.into() }
    }

    /// Create an `Invalid` error.
    pub fn invalid(
        var: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        ConfigError::Invalid {
            var: var.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}
