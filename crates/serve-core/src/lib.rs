//! # serve-core
//!
//! Core types and logic for tensorserve - a KServe V2 compatible tensor
//! inference server.
//!
//! This crate provides the pieces of the serving stack that carry no I/O:
//!
//! - Typed tensor and request/response structures for the V2 protocol
//! - The wire codec (JSON decode/encode) for inference payloads
//! - The validation engine that checks requests against a model schema
//! - The health/readiness state machine for the resident model
//! - The error taxonomy shared across all server components
//! - Configuration schema and parsing utilities

pub mod codec;
pub mod config;
pub mod error;
pub mod state;
pub mod tensor;
pub mod validate;

// Re-export commonly used types at the crate root
pub use config::{DegradedConfig, MetricsConfig, ServerConfig};
pub use error::{
    ConfigError, DecodeError, LoadError, PredictionError, PredictionKind, ServeError,
    ValidationError,
};
pub use state::{HealthState, ModelState};
pub use tensor::{
    Datatype, InferenceRequest, InferenceResponse, ModelSchema, Tensor, TensorData, TensorSpec,
};
pub use validate::validate;
