//! Error taxonomy for tensorserve
//!
//! Each stage of the dispatch pipeline fails with its own error type; the
//! unified [`ServeError`] wraps them at the dispatcher boundary and maps
//! every failure to a stable metric kind and an HTTP status.

use thiserror::Error;

/// Errors produced by the tensor codec while decoding a payload
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// Structurally invalid payload: empty body, missing required field,
    /// wrong field type, or data elements that do not match the datatype
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The request names a datatype outside the supported enum
    #[error("unsupported datatype: {0}")]
    UnsupportedDatatype(String),
}

/// Errors produced by the validation engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Data length does not match the element count implied by the shape
    #[error("shape mismatch for input '{name}': shape {shape:?} implies {expected} elements, data has {actual}")]
    ShapeMismatch {
        name: String,
        shape: Vec<u64>,
        expected: u64,
        actual: usize,
    },

    /// Input shape is incompatible with the shape the model declares
    #[error("shape mismatch for input '{name}': model expects {expected:?}, request sent {actual:?}")]
    IncompatibleShape {
        name: String,
        expected: Vec<i64>,
        actual: Vec<u64>,
    },

    /// Input datatype is not one the model accepts for that input
    #[error("datatype mismatch for input '{name}': model expects {expected}, request sent {actual}")]
    DatatypeMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    /// The model does not declare an input with this name
    #[error("unknown input '{0}'")]
    UnknownInput(String),

    /// A required model input is absent from the request
    #[error("missing required input '{0}'")]
    MissingInput(String),
}

/// Classification of a prediction failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionKind {
    /// Numerical error during computation (overflow, non-finite result)
    Numerical,

    /// Input passed validation but the runtime cannot consume it
    InvalidInput,

    /// Any other runtime failure
    Internal,
}

impl PredictionKind {
    /// Stable label used for the error counter
    pub fn as_str(&self) -> &'static str {
        match self {
            PredictionKind::Numerical => "prediction_numerical",
            PredictionKind::InvalidInput => "prediction_invalid_input",
            PredictionKind::Internal => "prediction_internal",
        }
    }
}

/// A recoverable per-request failure inside `predict`
#[derive(Debug, Clone, PartialEq, Error)]
#[error("prediction failed: {message}")]
pub struct PredictionError {
    pub kind: PredictionKind,
    pub message: String,
}

impl PredictionError {
    pub fn numerical(message: impl Into<String>) -> Self {
        Self {
            kind: PredictionKind::Numerical,
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self {
            kind: PredictionKind::InvalidInput,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: PredictionKind::Internal,
            message: message.into(),
        }
    }
}

/// A fatal model load failure
///
/// Settles the health state machine in `Failed`; restart policy belongs to
/// the external orchestrator.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("model load failed: {0}")]
pub struct LoadError(pub String);

/// Unified error type for the dispatch pipeline
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServeError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The model is not in the Ready state
    #[error("service unavailable: model is not ready")]
    Unavailable,

    #[error(transparent)]
    Prediction(#[from] PredictionError),
}

impl ServeError {
    /// Stable error kind used as the metric label for this failure
    pub fn kind(&self) -> &'static str {
        match self {
            ServeError::Decode(DecodeError::MalformedPayload(_)) => "malformed_payload",
            ServeError::Decode(DecodeError::UnsupportedDatatype(_)) => "unsupported_datatype",
            ServeError::Validation(ValidationError::ShapeMismatch { .. }) => "shape_mismatch",
            ServeError::Validation(ValidationError::IncompatibleShape { .. }) => "shape_mismatch",
            ServeError::Validation(ValidationError::DatatypeMismatch { .. }) => "datatype_mismatch",
            ServeError::Validation(ValidationError::UnknownInput(_)) => "unknown_input",
            ServeError::Validation(ValidationError::MissingInput(_)) => "missing_input",
            ServeError::Unavailable => "unavailable",
            ServeError::Prediction(e) => e.kind.as_str(),
        }
    }

    /// Check if this error indicates a client-side problem
    pub fn is_client_error(&self) -> bool {
        matches!(self, ServeError::Decode(_) | ServeError::Validation(_))
    }

    /// Convert to an HTTP status code
    pub fn to_http_status(&self) -> u16 {
        match self {
            ServeError::Decode(_) | ServeError::Validation(_) => 400,
            ServeError::Unavailable => 503,
            ServeError::Prediction(_) => 500,
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("configuration source error: {0}")]
    Source(#[from] config::ConfigError),
}
