//! HTTP server implementation
//!
//! A single listener carries the V2 inference API, the liveness and
//! readiness probes, and the Prometheus metrics endpoint.

use crate::{Dispatcher, Result, ServerError};

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, error, info};

/// HTTP server for the inference API
pub struct HttpServer {
    bind_addr: SocketAddr,
    dispatcher: Arc<Dispatcher>,
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    dispatcher: Arc<Dispatcher>,
}

impl HttpServer {
    /// Create a new HTTP server
    pub fn new(bind_addr: SocketAddr, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            bind_addr,
            dispatcher,
        }
    }

    /// Serve requests until the process receives a shutdown signal
    pub async fn serve(self) -> Result<()> {
        let app = create_router(self.dispatcher);

        let listener = tokio::net::TcpListener::bind(self.bind_addr)
            .await
            .map_err(|e| {
                ServerError::Server(format!("failed to bind to {}: {}", self.bind_addr, e))
            })?;

        info!("Starting HTTP server on {}", self.bind_addr);

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
        {
            error!("HTTP server error: {}", e);
            return Err(ServerError::Server(format!("HTTP server failed: {}", e)));
        }

        Ok(())
    }
}

/// Create the Axum router with all routes
pub fn create_router(dispatcher: Arc<Dispatcher>) -> Router {
    let state = AppState { dispatcher };

    Router::new()
        .route("/v2/models/:model_name/infer", post(infer_handler))
        .route("/v2/models/:model_name", get(metadata_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Received shutdown signal, draining connections");
}

/// V2 inference endpoint
///
/// The body passes through the dispatcher untouched; error responses carry
/// the message and the stable error kind.
async fn infer_handler(
    State(state): State<AppState>,
    Path(model_name): Path<String>,
    body: Bytes,
) -> Response {
    debug!(model = %model_name, bytes = body.len(), "inference request received");

    match state.dispatcher.dispatch(&body).await {
        Ok(bytes) => (
            StatusCode::OK,
            [("content-type", "application/json")],
            bytes,
        )
            .into_response(),
        Err(e) => {
            let status = StatusCode::from_u16(e.to_http_status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (
                status,
                Json(json!({
                    "error": e.to_string(),
                    "kind": e.kind(),
                })),
            )
                .into_response()
        }
    }
}

/// V2 model metadata endpoint
async fn metadata_handler(
    State(state): State<AppState>,
    Path(model_name): Path<String>,
) -> Response {
    let schema = state.dispatcher.schema();

    if model_name != schema.name {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": format!("model '{}' not found", model_name),
            })),
        )
            .into_response();
    }

    Json(json!({
        "name": schema.name,
        "versions": [schema.version],
        "platform": schema.platform,
        "inputs": schema.inputs,
        "outputs": schema.outputs,
    }))
    .into_response()
}

/// Liveness probe; unhealthy only once the model has terminally failed
async fn health_handler(State(state): State<AppState>) -> Response {
    let health = state.dispatcher.health();
    let body = Json(json!({
        "status": health.snapshot().to_string(),
        "model": state.dispatcher.schema().name,
        "model_loaded": health.is_loaded(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }));

    if health.is_live() {
        (StatusCode::OK, body).into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, body).into_response()
    }
}

/// Readiness probe; ready only while the model accepts traffic
async fn ready_handler(State(state): State<AppState>) -> Response {
    if state.dispatcher.health().is_ready() {
        (
            StatusCode::OK,
            Json(json!({
                "status": "ready",
                "timestamp": chrono::Utc::now().to_rfc3339(),
            })),
        )
            .into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "not ready",
                "timestamp": chrono::Utc::now().to_rfc3339(),
            })),
        )
            .into_response()
    }
}

/// Metrics endpoint (Prometheus text exposition format)
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.dispatcher.metrics().render() {
        Ok(metrics) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            metrics,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to render metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render metrics").into_response()
        }
    }
}
