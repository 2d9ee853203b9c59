//! The inference dispatcher
//!
//! Orchestrates one request end to end: decode, validate, readiness gate,
//! predict, encode. Every stage failure maps to a distinct error kind and
//! is recorded in the metrics aggregator before it is returned; prediction
//! outcomes additionally feed the health state machine. Requests are never
//! serialized against each other.

use serve_core::{codec, validate, HealthState, InferenceResponse, ModelSchema, ServeError};
use serve_metrics::{MetricsAggregator, SUCCESS_OUTCOME};
use serve_model::ModelRuntime;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Per-request orchestrator over the serving components
pub struct Dispatcher {
    runtime: Arc<dyn ModelRuntime>,
    schema: ModelSchema,
    health: Arc<HealthState>,
    metrics: MetricsAggregator,
}

impl Dispatcher {
    /// Create a dispatcher; the shared health state and metrics aggregator
    /// are injected explicitly, never reached through globals.
    pub fn new(
        runtime: Arc<dyn ModelRuntime>,
        health: Arc<HealthState>,
        metrics: MetricsAggregator,
    ) -> Self {
        let schema = runtime.describe();
        Self {
            runtime,
            schema,
            health,
            metrics,
        }
    }

    /// Schema of the resident model
    pub fn schema(&self) -> &ModelSchema {
        &self.schema
    }

    /// Shared health state
    pub fn health(&self) -> &Arc<HealthState> {
        &self.health
    }

    /// Shared metrics aggregator
    pub fn metrics(&self) -> &MetricsAggregator {
        &self.metrics
    }

    /// Drive the model lifecycle: `load` bounded by a timeout, then an
    /// optional warm-up prediction.
    ///
    /// On failure or timeout the health state settles in `Failed` and stays
    /// there; the orchestrator owns restart policy.
    pub async fn load_model(&self, load_timeout: Duration, warm_up: bool) {
        self.health.begin_loading();

        match tokio::time::timeout(load_timeout, self.runtime.load()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                self.health.mark_failed(&e.to_string());
                self.metrics.set_model_loaded(&self.schema.name, false);
                return;
            }
            Err(_) => {
                self.health
                    .mark_failed(&format!("load exceeded {:?} timeout", load_timeout));
                self.metrics.set_model_loaded(&self.schema.name, false);
                return;
            }
        }

        if warm_up {
            if let Err(e) = self.runtime.warm_up().await {
                // A cold model still serves; warm-up is best effort.
                warn!("model warm-up failed: {}", e);
            }
        }

        self.health.mark_ready();
        self.metrics.set_model_loaded(&self.schema.name, true);
        info!("model '{}' is ready", self.schema.name);
    }

    /// Handle one raw inference payload and produce raw response bytes.
    ///
    /// The outcome (success or error kind) and latency are recorded exactly
    /// once before this returns.
    pub async fn dispatch(&self, raw: &[u8]) -> Result<Vec<u8>, ServeError> {
        let start = Instant::now();
        // Holds the active-requests slot until this future completes or is
        // dropped by a disconnecting client.
        let _active = self.metrics.track_request();

        let result = self.run(raw).await;
        let elapsed = start.elapsed();

        let outcome = match &result {
            Ok(_) => SUCCESS_OUTCOME,
            Err(e) => e.kind(),
        };
        self.metrics.record(&self.schema.name, outcome, elapsed);

        match &result {
            Ok(_) => info!(
                model = %self.schema.name,
                latency_ms = elapsed.as_secs_f64() * 1000.0,
                "inference ok"
            ),
            Err(e) => debug!(model = %self.schema.name, kind = e.kind(), "inference failed: {}", e),
        }

        result
    }

    async fn run(&self, raw: &[u8]) -> Result<Vec<u8>, ServeError> {
        let request = codec::decode(raw)?;
        validate(&request, &self.schema)?;

        // Fail fast when no loaded parameters exist. Degraded still serves:
        // a successful prediction is the only path back to Ready, while
        // /ready steers new traffic away in the meantime.
        if !self.health.is_loaded() {
            return Err(ServeError::Unavailable);
        }

        match self.runtime.predict(&request.inputs).await {
            Ok(outputs) => {
                self.health.record_success();
                let response = InferenceResponse {
                    id: request.id,
                    model_name: self.schema.name.clone(),
                    model_version: self.schema.version.clone(),
                    outputs,
                };
                Ok(codec::encode(&response))
            }
            Err(e) => {
                self.health.record_failure();
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use serve_core::{DegradedConfig, ModelState};
    use serve_model::MockRuntime;

    const THRESHOLD: u32 = 3;

    fn dispatcher_with(runtime: Arc<MockRuntime>) -> Dispatcher {
        let health = Arc::new(HealthState::new(&DegradedConfig {
            threshold: THRESHOLD,
            window_seconds: 30,
        }));
        let metrics = MetricsAggregator::new(&[0.001, 0.01, 0.1, 1.0]).unwrap();
        Dispatcher::new(runtime, health, metrics)
    }

    async fn ready_dispatcher(runtime: Arc<MockRuntime>) -> Dispatcher {
        let dispatcher = dispatcher_with(runtime);
        dispatcher
            .load_model(Duration::from_secs(5), false)
            .await;
        dispatcher
    }

    fn valid_request() -> &'static [u8] {
        br#"{"id":"req-001","inputs":[{"name":"input","shape":[1,4],"datatype":"FP32","data":[5.1,3.5,1.4,0.2]}]}"#
    }

    #[tokio::test]
    async fn test_successful_dispatch() {
        let runtime = Arc::new(MockRuntime::new());
        let dispatcher = ready_dispatcher(runtime.clone()).await;

        let bytes = dispatcher.dispatch(valid_request()).await.unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value["id"], "req-001");
        assert_eq!(value["model_name"], "mock-model");
        assert!(!value["outputs"].as_array().unwrap().is_empty());
        assert_eq!(runtime.predict_calls(), 1);
        assert_eq!(
            dispatcher.metrics().request_count("mock-model", SUCCESS_OUTCOME),
            1
        );
    }

    #[tokio::test]
    async fn test_shape_mismatch_never_reaches_runtime() {
        let runtime = Arc::new(MockRuntime::new());
        let dispatcher = ready_dispatcher(runtime.clone()).await;

        let raw = br#"{"id":"req-001","inputs":[{"name":"input","shape":[1,3],"datatype":"FP32","data":[5.1,3.5,1.4,0.2]}]}"#;
        let err = dispatcher.dispatch(raw).await.unwrap_err();

        assert_eq!(err.kind(), "shape_mismatch");
        assert_eq!(runtime.predict_calls(), 0);
        assert_eq!(
            dispatcher.metrics().request_count("mock-model", "shape_mismatch"),
            1
        );
    }

    #[tokio::test]
    async fn test_schema_incompatible_shape_is_client_error() {
        let runtime = Arc::new(MockRuntime::new());
        let dispatcher = ready_dispatcher(runtime.clone()).await;

        // Shape and data agree with each other but not with the model.
        let raw = br#"{"inputs":[{"name":"input","shape":[1,3],"datatype":"FP32","data":[5.1,3.5,1.4]}]}"#;
        for _ in 0..THRESHOLD {
            let err = dispatcher.dispatch(raw).await.unwrap_err();
            assert_eq!(err.kind(), "shape_mismatch");
            assert_eq!(err.to_http_status(), 400);
        }

        // Client errors never reach the model or count toward degradation.
        assert_eq!(runtime.predict_calls(), 0);
        assert_eq!(dispatcher.health().snapshot(), ModelState::Ready);
    }

    #[tokio::test]
    async fn test_aborted_dispatch_releases_active_gauge() {
        let runtime = Arc::new(MockRuntime::new().with_latency(Duration::from_secs(60)));
        let dispatcher = Arc::new(ready_dispatcher(runtime.clone()).await);

        let worker = dispatcher.clone();
        let handle = tokio::spawn(async move { worker.dispatch(valid_request()).await });

        // Wait until the dispatch is inside predict, then drop it the way
        // axum drops a handler for a disconnected client.
        while runtime.predict_calls() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());

        let text = dispatcher.metrics().render().unwrap();
        assert!(text.contains("inference_active_requests 0"));
    }

    #[tokio::test]
    async fn test_decode_error_recorded() {
        let runtime = Arc::new(MockRuntime::new());
        let dispatcher = ready_dispatcher(runtime.clone()).await;

        let err = dispatcher.dispatch(b"not json").await.unwrap_err();
        assert_eq!(err.kind(), "malformed_payload");
        assert_eq!(runtime.predict_calls(), 0);
        assert_eq!(
            dispatcher
                .metrics()
                .request_count("mock-model", "malformed_payload"),
            1
        );
    }

    #[tokio::test]
    async fn test_unavailable_before_load() {
        let runtime = Arc::new(MockRuntime::new());
        let dispatcher = dispatcher_with(runtime.clone());

        let err = dispatcher.dispatch(valid_request()).await.unwrap_err();
        assert_eq!(err.kind(), "unavailable");
        assert_eq!(err.to_http_status(), 503);
        assert_eq!(runtime.predict_calls(), 0);
    }

    #[tokio::test]
    async fn test_load_failure_settles_in_failed() {
        let runtime = Arc::new(MockRuntime::new().fail_load());
        let dispatcher = dispatcher_with(runtime);

        dispatcher.load_model(Duration::from_secs(5), false).await;
        assert_eq!(dispatcher.health().snapshot(), ModelState::Failed);
        assert!(!dispatcher.health().is_live());
    }

    #[tokio::test]
    async fn test_prediction_failures_degrade_then_recover() {
        let runtime = Arc::new(MockRuntime::new());
        let dispatcher = ready_dispatcher(runtime.clone()).await;

        runtime.set_failing(true);
        for _ in 0..THRESHOLD {
            let err = dispatcher.dispatch(valid_request()).await.unwrap_err();
            assert_eq!(err.to_http_status(), 500);
        }
        assert_eq!(dispatcher.health().snapshot(), ModelState::Degraded);

        // Degraded requests still reach the model; a failing one stays
        // degraded, a successful one restores Ready.
        let err = dispatcher.dispatch(valid_request()).await.unwrap_err();
        assert_eq!(err.kind(), "prediction_internal");
        assert_eq!(dispatcher.health().snapshot(), ModelState::Degraded);

        runtime.set_failing(false);
        let bytes = dispatcher.dispatch(valid_request()).await.unwrap();
        assert!(!bytes.is_empty());
        assert_eq!(dispatcher.health().snapshot(), ModelState::Ready);
    }

    #[tokio::test]
    async fn test_failed_model_rejects_requests() {
        let runtime = Arc::new(MockRuntime::new().fail_load());
        let dispatcher = dispatcher_with(runtime.clone());
        dispatcher.load_model(Duration::from_secs(5), false).await;

        let err = dispatcher.dispatch(valid_request()).await.unwrap_err();
        assert_eq!(err.kind(), "unavailable");
        assert_eq!(runtime.predict_calls(), 0);
    }

    #[tokio::test]
    async fn test_each_error_kind_recorded_once() {
        let runtime = Arc::new(MockRuntime::new());
        let dispatcher = ready_dispatcher(runtime.clone()).await;

        runtime.set_failing(true);
        let _ = dispatcher.dispatch(valid_request()).await;
        runtime.set_failing(false);

        assert_eq!(
            dispatcher
                .metrics()
                .request_count("mock-model", "prediction_internal"),
            1
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_dispatches_count_exactly() {
        const CALLERS: usize = 1000;

        let runtime = Arc::new(MockRuntime::new());
        let dispatcher = Arc::new(ready_dispatcher(runtime).await);

        let mut handles = Vec::with_capacity(CALLERS);
        for _ in 0..CALLERS {
            let dispatcher = dispatcher.clone();
            handles.push(tokio::spawn(async move {
                dispatcher.dispatch(valid_request()).await
            }));
        }

        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        assert_eq!(
            dispatcher.metrics().request_count("mock-model", SUCCESS_OUTCOME),
            CALLERS as u64
        );
    }
}
