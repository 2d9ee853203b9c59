//! The metrics aggregator
//!
//! Owns every metric sample in the process. All updates go through
//! prometheus's atomic counter/histogram primitives, so recording from many
//! concurrent request contexts loses no updates and never takes a broad
//! lock; rendering gathers a point-in-time snapshot without blocking
//! writers.

use crate::{MetricsError, Result};
use prometheus::{CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, IntGauge, Opts, Registry, TextEncoder};
use std::time::Duration;

/// Outcome label recorded for successful dispatches
pub const SUCCESS_OUTCOME: &str = "success";

/// Concurrency-safe counters, histograms, and gauges for the dispatch path
#[derive(Debug, Clone)]
pub struct MetricsAggregator {
    registry: Registry,

    /// Completed dispatches by model and outcome (success or error kind)
    requests_total: CounterVec,

    /// End-to-end dispatch latency by model
    request_duration: HistogramVec,

    /// Requests currently inside the dispatcher
    active_requests: IntGauge,

    /// Whether the model holds loaded parameters (1=yes, 0=no)
    model_loaded: GaugeVec,
}

impl MetricsAggregator {
    /// Create an aggregator with the given latency bucket boundaries
    pub fn new(latency_buckets: &[f64]) -> Result<Self> {
        let registry = Registry::new();

        let requests_total = CounterVec::new(
            Opts::new("inference_requests_total", "Total inference requests"),
            &["model", "outcome"],
        )?;

        let request_duration = HistogramVec::new(
            HistogramOpts::new(
                "inference_request_duration_seconds",
                "Inference latency in seconds",
            )
            .buckets(latency_buckets.to_vec()),
            &["model"],
        )?;

        let active_requests = IntGauge::new(
            "inference_active_requests",
            "Currently active inference requests",
        )?;

        let model_loaded = GaugeVec::new(
            Opts::new("model_loaded", "Whether the model is loaded (1=yes, 0=no)"),
            &["model"],
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;
        registry.register(Box::new(active_requests.clone()))?;
        registry.register(Box::new(model_loaded.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            request_duration,
            active_requests,
            model_loaded,
        })
    }

    /// Record one completed dispatch.
    ///
    /// Called exactly once per dispatch, success or failure; `outcome` is
    /// [`SUCCESS_OUTCOME`] or the error kind.
    pub fn record(&self, model: &str, outcome: &str, duration: Duration) {
        self.requests_total
            .with_label_values(&[model, outcome])
            .inc();
        self.request_duration
            .with_label_values(&[model])
            .observe(duration.as_secs_f64());
    }

    /// Track one in-flight request.
    ///
    /// The gauge is decremented when the returned guard drops, so a
    /// cancelled dispatch future releases its slot too.
    pub fn track_request(&self) -> ActiveRequestGuard {
        self.active_requests.inc();
        ActiveRequestGuard {
            gauge: self.active_requests.clone(),
        }
    }

    /// Publish whether the model holds loaded parameters
    pub fn set_model_loaded(&self, model: &str, loaded: bool) {
        self.model_loaded
            .with_label_values(&[model])
            .set(if loaded { 1.0 } else { 0.0 });
    }

    /// Point-in-time counter value for a model/outcome pair
    pub fn request_count(&self, model: &str, outcome: &str) -> u64 {
        self.requests_total
            .with_label_values(&[model, outcome])
            .get() as u64
    }

    /// Render a snapshot in the Prometheus text exposition format
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();

        let mut buffer = Vec::new();
        encoder
            .encode(&families, &mut buffer)
            .map_err(|e| MetricsError::Export(format!("failed to encode metrics: {}", e)))?;

        String::from_utf8(buffer)
            .map_err(|e| MetricsError::Export(format!("metrics are not valid UTF-8: {}", e)))
    }
}

/// Drop guard for the active-request gauge
#[derive(Debug)]
pub struct ActiveRequestGuard {
    gauge: IntGauge,
}

impl Drop for ActiveRequestGuard {
    fn drop(&mut self) {
        self.gauge.dec();
    }
}
