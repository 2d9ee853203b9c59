//! Scriptable mock runtime for testing and development

use crate::runtime::ModelRuntime;
use async_trait::async_trait;
use serve_core::{
    Datatype, LoadError, ModelSchema, PredictionError, Tensor, TensorSpec,
};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// A runtime that echoes a fixed output and records how it was driven
pub struct MockRuntime {
    schema: ModelSchema,
    fail_load: AtomicBool,
    fail_predictions: AtomicBool,
    latency_ms: AtomicU64,
    predict_calls: AtomicUsize,
}

impl MockRuntime {
    /// Create a mock with the iris-compatible default schema
    pub fn new() -> Self {
        Self::with_schema(ModelSchema {
            name: "mock-model".to_string(),
            version: "v0".to_string(),
            platform: "mock".to_string(),
            inputs: vec![TensorSpec::new("input", Datatype::Fp32, vec![-1, 4])],
            outputs: vec![TensorSpec::new("output", Datatype::Fp32, vec![-1])],
        })
    }

    /// Create a mock with a custom schema
    pub fn with_schema(schema: ModelSchema) -> Self {
        Self {
            schema,
            fail_load: AtomicBool::new(false),
            fail_predictions: AtomicBool::new(false),
            latency_ms: AtomicU64::new(0),
            predict_calls: AtomicUsize::new(0),
        }
    }

    /// Make `load` fail
    pub fn fail_load(self) -> Self {
        self.fail_load.store(true, Ordering::Relaxed);
        self
    }

    /// Make every `predict` call sleep before answering
    pub fn with_latency(self, latency: Duration) -> Self {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
        self
    }

    /// Make every subsequent `predict` call fail
    pub fn set_failing(&self, failing: bool) {
        self.fail_predictions.store(failing, Ordering::Relaxed);
    }

    /// Number of `predict` invocations observed so far
    pub fn predict_calls(&self) -> usize {
        self.predict_calls.load(Ordering::Relaxed)
    }
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelRuntime for MockRuntime {
    async fn load(&self) -> Result<(), LoadError> {
        if self.fail_load.load(Ordering::Relaxed) {
            return Err(LoadError("mock load failure".to_string()));
        }
        Ok(())
    }

    async fn predict(&self, inputs: &[Tensor]) -> Result<Vec<Tensor>, PredictionError> {
        self.predict_calls.fetch_add(1, Ordering::Relaxed);

        let latency = self.latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        if self.fail_predictions.load(Ordering::Relaxed) {
            return Err(PredictionError::internal("mock prediction failure"));
        }

        let rows = inputs.first().map(|t| t.shape.first().copied().unwrap_or(1)).unwrap_or(1);
        Ok(vec![Tensor::fp32("output", vec![rows], vec![0.5; rows as usize])])
    }

    fn describe(&self) -> ModelSchema {
        self.schema.clone()
    }
}
