//! # serve-http
//!
//! HTTP ingress and request dispatch for tensorserve.
//!
//! This crate provides:
//!
//! - The inference dispatcher that orchestrates codec, validation, runtime,
//!   metrics, and health state per request
//! - The axum HTTP surface: V2 inference and metadata endpoints, liveness
//!   and readiness probes, and Prometheus metrics
//! - The `tensorserved` binary

use thiserror::Error;

pub mod dispatch;
pub mod server;

pub use dispatch::Dispatcher;
pub use server::HttpServer;

/// Result type for server operations
pub type Result<T> = std::result::Result<T, ServerError>;

/// Errors that can occur while standing up or running the server
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("server error: {0}")]
    Server(String),

    #[error("metrics error: {0}")]
    Metrics(#[from] serve_metrics::MetricsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serve_core::ConfigError> for ServerError {
    fn from(e: serve_core::ConfigError) -> Self {
        ServerError::Configuration(e.to_string())
    }
}
