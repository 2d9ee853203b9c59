//! Tensor and protocol data structures for the V2 inference protocol
//!
//! These types represent the decoded, validated form of inference payloads.
//! Tensors are immutable once constructed; the codec is the only component
//! that builds them from raw bytes.

use serde::Serialize;

/// Datatypes supported by the V2 protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Datatype {
    #[serde(rename = "FP32")]
    Fp32,
    #[serde(rename = "FP64")]
    Fp64,
    #[serde(rename = "INT32")]
    Int32,
    #[serde(rename = "INT64")]
    Int64,
    #[serde(rename = "BOOL")]
    Bool,
    #[serde(rename = "BYTES")]
    Bytes,
}

impl Datatype {
    /// Parse a wire datatype string.
    ///
    /// `STRING` is accepted as an alias for `BYTES` since V2 clients use
    /// both spellings interchangeably.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "FP32" => Some(Datatype::Fp32),
            "FP64" => Some(Datatype::Fp64),
            "INT32" => Some(Datatype::Int32),
            "INT64" => Some(Datatype::Int64),
            "BOOL" => Some(Datatype::Bool),
            "BYTES" | "STRING" => Some(Datatype::Bytes),
            _ => None,
        }
    }

    /// Canonical wire name for this datatype
    pub fn as_str(&self) -> &'static str {
        match self {
            Datatype::Fp32 => "FP32",
            Datatype::Fp64 => "FP64",
            Datatype::Int32 => "INT32",
            Datatype::Int64 => "INT64",
            Datatype::Bool => "BOOL",
            Datatype::Bytes => "BYTES",
        }
    }
}

impl std::fmt::Display for Datatype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed flat tensor payload
///
/// `BYTES` tensors carry UTF-8 strings and count elements, not bytes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TensorData {
    Fp32(Vec<f32>),
    Fp64(Vec<f64>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Bool(Vec<bool>),
    Bytes(Vec<String>),
}

impl TensorData {
    /// Number of elements in the payload
    pub fn len(&self) -> usize {
        match self {
            TensorData::Fp32(v) => v.len(),
            TensorData::Fp64(v) => v.len(),
            TensorData::Int32(v) => v.len(),
            TensorData::Int64(v) => v.len(),
            TensorData::Bool(v) => v.len(),
            TensorData::Bytes(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Datatype of this payload
    pub fn datatype(&self) -> Datatype {
        match self {
            TensorData::Fp32(_) => Datatype::Fp32,
            TensorData::Fp64(_) => Datatype::Fp64,
            TensorData::Int32(_) => Datatype::Int32,
            TensorData::Int64(_) => Datatype::Int64,
            TensorData::Bool(_) => Datatype::Bool,
            TensorData::Bytes(_) => Datatype::Bytes,
        }
    }
}

/// A named, typed, shaped flat array of values
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    /// Tensor name (request-supplied for inputs, runtime-supplied for outputs)
    pub name: String,

    /// Ordered dimension sizes; element count is the product of all dims
    pub shape: Vec<u64>,

    /// Flat payload
    pub data: TensorData,
}

impl Tensor {
    /// Create a new tensor
    pub fn new(name: impl Into<String>, shape: Vec<u64>, data: TensorData) -> Self {
        Self {
            name: name.into(),
            shape,
            data,
        }
    }

    /// Convenience constructor for FP32 tensors
    pub fn fp32(name: impl Into<String>, shape: Vec<u64>, data: Vec<f32>) -> Self {
        Self::new(name, shape, TensorData::Fp32(data))
    }

    /// Convenience constructor for BYTES tensors
    pub fn bytes(name: impl Into<String>, shape: Vec<u64>, data: Vec<String>) -> Self {
        Self::new(name, shape, TensorData::Bytes(data))
    }

    /// Datatype of this tensor
    pub fn datatype(&self) -> Datatype {
        self.data.datatype()
    }

    /// Element count implied by the shape, `None` when the product
    /// overflows `u64`. Shapes come off the wire, so the product must not
    /// be trusted to fit.
    pub fn element_count(&self) -> Option<u64> {
        self.shape
            .iter()
            .try_fold(1u64, |count, dim| count.checked_mul(*dim))
    }
}

/// A decoded inference request
///
/// Constructed by the codec from one inbound payload, discarded once the
/// response is produced. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceRequest {
    /// Correlation token, echoed verbatim in the response. Server-generated
    /// when the caller omits it.
    pub id: String,

    /// Ordered input tensors; names are unique within a request
    pub inputs: Vec<Tensor>,
}

/// A successful inference result
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceResponse {
    /// Correlation token copied from the request
    pub id: String,

    pub model_name: String,

    pub model_version: String,

    /// Ordered output tensors
    pub outputs: Vec<Tensor>,
}

/// Shape constraint for a model input or output
///
/// Dimensions of `-1` are dynamic and match any size.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TensorSpec {
    pub name: String,
    pub datatype: Datatype,
    pub shape: Vec<i64>,
}

impl TensorSpec {
    pub fn new(name: impl Into<String>, datatype: Datatype, shape: Vec<i64>) -> Self {
        Self {
            name: name.into(),
            datatype,
            shape,
        }
    }
}

/// The `describe()` output of a model runtime
///
/// Used by the validation engine to check requests and by the metadata
/// endpoint to answer `GET /v2/models/{name}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSchema {
    pub name: String,
    pub version: String,
    pub platform: String,
    pub inputs: Vec<TensorSpec>,
    pub outputs: Vec<TensorSpec>,
}

impl ModelSchema {
    /// Look up the spec for a named input
    pub fn input(&self, name: &str) -> Option<&TensorSpec> {
        self.inputs.iter().find(|spec| spec.name == name)
    }
}
