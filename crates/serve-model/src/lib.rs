//! # serve-model
//!
//! The model runtime interface for tensorserve and its resident
//! implementation.
//!
//! This crate provides:
//!
//! - [`ModelRuntime`], the capability seam between the serving stack and
//!   "a model": load, warm up, predict, describe
//! - [`IrisClassifier`], the process-resident demo classifier
//! - [`MockRuntime`], a scriptable runtime for tests
//!
//! Swapping the concrete runtime requires no change to the codec, the
//! validation engine, the metrics aggregator, or the health state machine.

pub mod iris;
pub mod mock;
pub mod runtime;

pub use iris::IrisClassifier;
pub use mock::MockRuntime;
pub use runtime::ModelRuntime;
