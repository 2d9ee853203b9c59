//! The model runtime interface
//!
//! This trait is the seam the "replace with your own model" workflow
//! targets: one concrete implementation is resident per process, and the
//! rest of the serving stack only ever sees this interface.

use async_trait::async_trait;
use serve_core::{LoadError, ModelSchema, PredictionError, Tensor};

/// Abstraction over a servable model
#[async_trait]
pub trait ModelRuntime: Send + Sync {
    /// Transition backing resources into a usable state.
    ///
    /// Called exactly once at process start. After `load` returns, any
    /// loaded parameters must be read-only so concurrent `predict` calls
    /// need no mutual exclusion.
    async fn load(&self) -> Result<(), LoadError>;

    /// Prime the model after a successful load.
    ///
    /// Optional; the default implementation does nothing.
    async fn warm_up(&self) -> Result<(), PredictionError> {
        Ok(())
    }

    /// Run one prediction over validated input tensors.
    ///
    /// The only operation invoked per request. Must be safe to call
    /// concurrently from many callers. Failures are recoverable per
    /// request, never process-fatal.
    async fn predict(&self, inputs: &[Tensor]) -> Result<Vec<Tensor>, PredictionError>;

    /// Describe the model: name, version, and accepted inputs/outputs.
    ///
    /// Used by the validation engine and by the metadata endpoint.
    fn describe(&self) -> ModelSchema;
}
