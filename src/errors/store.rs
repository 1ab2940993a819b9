// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for cache store backends.

/// Errors raised by a [`CacheStore`](crate::cache::CacheStore) backend.
///
/// The resolver treats these exactly like upstream failures: they fail a
/// synchronous cache-miss request and are logged and swallowed on background
/// refresh and poller paths.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Error reading from or writing to the backing file.
    #[error("Store I/O error at {path}: {details}")]
    Io {
        /// Path of the file that caused the error
        path: String,
        /// Details about the I/O error
        details: String,
        /// The underlying I/O error, if available
        #[source]
        source: Option<std::io::Error>,
    },

    /// Error serializing or deserializing the store document.
    #[error("Store serialization error: {details}")]
    Serialization {
        /// Details about the serialization error
        details: String,
        /// The underlying serialization error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl StoreError {
    /// Create an `Io` error from a path, a description and an optional I/O error.
    pub fn io(
        path: impl Into<String>,
        details: impl Into<String>,
        source: Option<std::io::Error>,
    ) -> Self {
        StoreError::Io {
            path: path.into(),
            details: details.into(),
            source,
        }
    }

    /// Create a `Serialization` error from any serialization error.
    pub fn serialization(
        details: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        StoreError::Serialization {
            details: details.into(),
            source: Box::new(source),
        }
    }
}
