// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! HTTP surface.
//!
//! | Route | Body |
//! |---|---|
//! | `GET /v1/blockNumber` | `{"blockNumber": n}` |
//! | `GET /v1/contractAddress` | `{"contractAddress": "0x…"}` |
//! | `GET /v1/constant/{name}` | `{"<name>": value}` |
//! | `GET /v1/request/{function}/{args…}` | `{"result": value}` |
//! | `GET /v1/balance/{token}/{holder}` | `{"balance": "…"}` |
//! | `GET /v1/symbol/{token}` | `{"symbol": "…"}` |
//! | `GET /health` | [`HealthReport`](crate::service::HealthReport) |
//!
//! Cached reads carry an `x-cache-status` header of `HIT` or `MISS`. Errors
//! are `{"error": message}`. A background refresh scheduled by a cached read
//! starts only after the response body has been fully written or dropped.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    body::{Body, Bytes},
    extract::{Path, State},
    http::{
        header::{self, HeaderName},
        HeaderValue, Method, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures::Stream;
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::errors::ProxyError;
use crate::resolver::{PendingRefresh, Resolution};
use crate::service::ContractService;

/// Header reporting whether a cached read was a hit or a miss.
pub static X_CACHE_STATUS: HeaderName = HeaderName::from_static("x-cache-status");

/// Shared handler state.
pub type AppState = Arc<ContractService>;

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = match &self {
            ProxyError::UpstreamCallFailed(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            ProxyError::UpstreamCallFailed(_) | ProxyError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ProxyError::UnknownMember { .. } => StatusCode::NOT_FOUND,
            ProxyError::InvalidArguments { .. } | ProxyError::InvalidAddress { .. } => {
                StatusCode::BAD_REQUEST
            }
        };

        let message = self.report();
        if status.is_server_error() {
            warn!(error = %message, "Request failed");
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Single-chunk body that releases a pending refresh once it is exhausted.
///
/// Hyper polls past the last chunk after writing it, and drops the body when
/// the connection goes away, so either path starts the refresh exactly once.
struct RefreshAfterBody {
    chunk: Option<Bytes>,
    refresh: Option<PendingRefresh>,
}

impl RefreshAfterBody {
    fn release(&mut self) {
        if let Some(refresh) = self.refresh.take() {
            // Detached: the task runs on without the response.
            drop(refresh.start());
        }
    }
}

impl Stream for RefreshAfterBody {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if let Some(chunk) = self.chunk.take() {
            return Poll::Ready(Some(Ok(chunk)));
        }
        self.release();
        Poll::Ready(None)
    }
}

impl Drop for RefreshAfterBody {
    fn drop(&mut self) {
        self.release();
    }
}

/// Builds the JSON body `{ field: value }` with the cache status header.
fn cached_response(field: &str, resolution: Resolution) -> Response {
    let Resolution {
        value,
        status,
        refresh,
    } = resolution;

    let mut object = Map::new();
    object.insert(field.to_string(), Value::String(value));
    let object = Value::Object(object);

    let mut response = match refresh {
        None => Json(object).into_response(),
        Some(refresh) => {
            let bytes = Bytes::from(object.to_string());
            let length = HeaderValue::from(bytes.len());
            let body = Body::from_stream(RefreshAfterBody {
                chunk: Some(bytes),
                refresh: Some(refresh),
            });
            let mut response = body.into_response();
            let headers = response.headers_mut();
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
            headers.insert(header::CONTENT_LENGTH, length);
            response
        }
    };

    response.headers_mut().insert(
        X_CACHE_STATUS.clone(),
        HeaderValue::from_static(status.as_str()),
    );
    response
}

async fn block_number(State(service): State<AppState>) -> Result<Response, ProxyError> {
    let height = service.block_number().await?;
    Ok(Json(json!({ "blockNumber": height })).into_response())
}

async fn contract_address(State(service): State<AppState>) -> Json<Value> {
    Json(json!({ "contractAddress": service.contract_address().to_checksum(None) }))
}

async fn constant(
    State(service): State<AppState>,
    Path(constant_name): Path<String>,
) -> Result<Response, ProxyError> {
    let resolution = service.constant(&constant_name).await?;
    Ok(cached_response(&constant_name, resolution))
}

/// `/v1/request/{function}/{args…}`: the first segment is the function name,
/// the rest are positional arguments.
async fn function_call(
    State(service): State<AppState>,
    Path(path): Path<String>,
) -> Result<Response, ProxyError> {
    let mut segments = path.split('/').filter(|segment| !segment.is_empty());
    let Some(function_name) = segments.next() else {
        return Ok(not_found().await.into_response());
    };
    let args: Vec<&str> = segments.collect();

    let resolution = service.function_call(function_name, &args).await?;
    Ok(cached_response("result", resolution))
}

async fn balance(
    State(service): State<AppState>,
    Path((token, holder)): Path<(String, String)>,
) -> Result<Response, ProxyError> {
    let balance = service.token_balance(&token, &holder).await?;
    Ok(Json(json!({ "balance": balance.to_string() })).into_response())
}

async fn symbol(
    State(service): State<AppState>,
    Path(token): Path<String>,
) -> Result<Response, ProxyError> {
    let symbol = service.token_symbol(&token).await?;
    Ok(Json(json!({ "symbol": symbol })).into_response())
}

async fn health(State(service): State<AppState>) -> Response {
    Json(service.health().await).into_response()
}

async fn not_found() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "API Endpoint Not Found" })),
    )
}

/// CORS restricted to `allowed_origins`, or open when the list is empty.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET])
            .allow_headers(Any)
            .expose_headers([X_CACHE_STATUS.clone()]);
    }

    let allowed: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET])
        .expose_headers([X_CACHE_STATUS.clone()])
}

/// Builds the application router.
pub fn router(service: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/v1/blockNumber", get(block_number))
        .route("/v1/contractAddress", get(contract_address))
        .route("/v1/constant/{constant_name}", get(constant))
        .route("/v1/request/{*path}", get(function_call))
        .route("/v1/balance/{token}/{holder}", get(balance))
        .route("/v1/symbol/{token}", get(symbol))
        .route("/health", get(health))
        .fallback(not_found)
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

/// Serves `app` on `listener` until `shutdown` resolves.
pub async fn serve_api<F>(listener: TcpListener, app: Router, shutdown: F) -> anyhow::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;

    info!(address = ?addr, "Starting server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
