// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Span creation helpers for read-cache operations.
//!
//! Telemetry is kept orthogonal to business logic: instead of `#[instrument]`
//! attributes, each instrumented operation has a span helper here and the
//! operation wraps its future with it.
//!
//! Usage pattern:
//! ```rust,ignore
//! use tracing::Instrument;
//!
//! async move {
//!     // Business logic here
//! }
//! .instrument(spans::resolve(kind, &key))
//! .await
//! ```

use tracing::{Level, Span};

use crate::cache::{CallKey, RecordKind};

/// Create span for resolving one contract read through the cache.
///
/// Parent: HTTP request span
/// Children: store lookups, the synchronous gateway call on a miss
#[inline]
pub(crate) fn resolve(kind: RecordKind, key: &CallKey) -> Span {
    tracing::span!(
        Level::INFO,
        "read_cache.resolve",
        kind = %kind,
        key = %key,
        status = tracing::field::Empty,
    )
}

/// Create span for the background refresh scheduled after a cache hit.
///
/// Parent: None (the refresh outlives the request that scheduled it)
#[inline]
pub(crate) fn background_refresh(kind: RecordKind, key: &CallKey) -> Span {
    tracing::debug_span!(
        parent: None,
        "read_cache.background_refresh",
        kind = %kind,
        key = %key,
    )
}

/// Create span for a single block-height poller tick.
#[inline]
pub(crate) fn poll_tick() -> Span {
    tracing::debug_span!("read_cache.poll_tick", height = tracing::field::Empty)
}

/// Create span for an uncached live block-number read.
#[inline]
pub(crate) fn live_block_number() -> Span {
    tracing::debug_span!("read_cache.live_block_number")
}
