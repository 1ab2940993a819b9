// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Tower-based logging layer for Alloy RPC providers.
//!
//! Every upstream call runs inside an `rpc_call` span carrying the method
//! name and its duration. Successful calls log at DEBUG, calls slower than
//! the configured threshold at WARN, and failed calls at WARN with the error.

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::{Duration, Instant},
};

use alloy_json_rpc::{RequestPacket, ResponsePacket};
use alloy_transport::TransportError;
use tower::Layer;
use tracing::{debug, trace, warn, Instrument};

/// Calls slower than this are logged at WARN by default.
pub const DEFAULT_SLOW_CALL_THRESHOLD: Duration = Duration::from_secs(2);

/// A Tower layer that adds logging/tracing to RPC requests.
///
/// # Example
///
/// ```rust,ignore
/// use contract_read_cache::transport::LoggingLayer;
/// use alloy_rpc_client::ClientBuilder;
///
/// let client = ClientBuilder::default()
///     .layer(LoggingLayer::new().with_slow_call_threshold(Duration::from_secs(1)))
///     .http(rpc_url);
/// ```
#[derive(Clone, Debug)]
pub struct LoggingLayer {
    slow_call_threshold: Duration,
    log_payloads: bool,
}

impl Default for LoggingLayer {
    fn default() -> Self {
        Self {
            slow_call_threshold: DEFAULT_SLOW_CALL_THRESHOLD,
            log_payloads: false,
        }
    }
}

impl LoggingLayer {
    /// Creates a new logging layer with default settings.
    ///
    /// By default, only method names, timing and errors are logged.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the duration above which a call is reported as slow.
    pub fn with_slow_call_threshold(mut self, threshold: Duration) -> Self {
        self.slow_call_threshold = threshold;
        self
    }

    /// Logs request and response payloads at TRACE.
    pub fn with_payloads(mut self) -> Self {
        self.log_payloads = true;
        self
    }
}

impl<S> Layer<S> for LoggingLayer {
    type Service = LoggingService<S>;

    fn layer(&self, service: S) -> Self::Service {
        LoggingService {
            service,
            slow_call_threshold: self.slow_call_threshold,
            log_payloads: self.log_payloads,
        }
    }
}

/// A Tower service that logs RPC requests and responses.
#[derive(Clone, Debug)]
pub struct LoggingService<S> {
    service: S,
    slow_call_threshold: Duration,
    log_payloads: bool,
}

impl<S> tower::Service<RequestPacket> for LoggingService<S>
where
    S: tower::Service<RequestPacket, Response = ResponsePacket, Error = TransportError>
        + Clone
        + Send
        + 'static,
    S::Future: Send,
{
    type Response = ResponsePacket;
    type Error = TransportError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&mut self, request: RequestPacket) -> Self::Future {
        let slow_call_threshold = self.slow_call_threshold;
        let log_payloads = self.log_payloads;
        let method = extract_method(&request);

        // Take the instance that was driven ready and leave a fresh clone behind.
        let clone = self.service.clone();
        let mut service = std::mem::replace(&mut self.service, clone);

        let span = tracing::debug_span!(
            "rpc_call",
            method = %method,
            duration_ms = tracing::field::Empty,
        );

        Box::pin(
            async move {
                if log_payloads {
                    trace!(request = ?request, "RPC request");
                }

                let start = Instant::now();
                let result = service.call(request).await;
                let duration = start.elapsed();
                tracing::Span::current().record("duration_ms", duration.as_millis() as u64);

                match &result {
                    Ok(response) => {
                        if log_payloads {
                            trace!(response = ?response, "RPC response");
                        }
                        if duration > slow_call_threshold {
                            warn!(
                                duration_ms = %duration.as_millis(),
                                threshold_ms = %slow_call_threshold.as_millis(),
                                "Slow RPC call: {method}"
                            );
                        } else {
                            debug!(duration_ms = %duration.as_millis(), "RPC call: {method}");
                        }
                    }
                    Err(e) => {
                        warn!(
                            error = %e,
                            duration_ms = %duration.as_millis(),
                            "RPC error: {method}"
                        );
                    }
                }

                result
            }
            .instrument(span),
        )
    }
}

/// Extract the RPC method name from a request packet.
fn extract_method(request: &RequestPacket) -> String {
    match request {
        RequestPacket::Single(req) => req.method().to_string(),
        RequestPacket::Batch(reqs) => match reqs.as_slice() {
            [] => "batch(empty)".to_string(),
            [only] => only.method().to_string(),
            many => format!("batch({} calls)", many.len()),
        },
    }
}
