//! # serve-metrics
//!
//! Concurrency-safe operational metrics for tensorserve.
//!
//! This crate provides:
//!
//! - Request counters and latency histograms keyed by model and outcome
//! - Lock-free recording built on the `prometheus` crate's atomic primitives
//! - Text exposition rendering for the pull-based `/metrics` endpoint

use thiserror::Error;

pub mod aggregator;

pub use aggregator::{ActiveRequestGuard, MetricsAggregator, SUCCESS_OUTCOME};

/// Result type alias for metrics operations
pub type Result<T> = std::result::Result<T, MetricsError>;

/// Errors that can occur during metrics operations
#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("registry error: {0}")]
    Registry(String),

    #[error("export error: {0}")]
    Export(String),
}

impl From<prometheus::Error> for MetricsError {
    fn from(e: prometheus::Error) -> Self {
        MetricsError::Registry(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MetricsError::Export("encode failed".to_string());
        assert_eq!(err.to_string(), "export error: encode failed");
    }
}
