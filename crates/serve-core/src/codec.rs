//! Wire codec for the V2 inference protocol
//!
//! Decoding parses a self-describing JSON structure into typed tensors
//! without inspecting model semantics. Encoding serializes a response and
//! never fails for well-formed internal tensors. Both directions are pure
//! and safe to call concurrently.

use crate::error::DecodeError;
use crate::tensor::{Datatype, InferenceRequest, InferenceResponse, Tensor, TensorData};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Wire form of an inbound request
#[derive(Debug, Deserialize)]
struct WireRequest {
    id: Option<String>,
    inputs: Vec<WireInput>,
}

/// Wire form of one input tensor
#[derive(Debug, Deserialize)]
struct WireInput {
    name: String,
    shape: Vec<u64>,
    #[serde(default = "default_datatype")]
    datatype: String,
    data: Value,
}

// FP32 is the wire default when the field is omitted.
fn default_datatype() -> String {
    "FP32".to_string()
}

/// Wire form of an outbound response
#[derive(Debug, Serialize)]
struct WireResponse<'a> {
    id: &'a str,
    model_name: &'a str,
    model_version: &'a str,
    outputs: Vec<WireOutput<'a>>,
}

/// Wire form of one output tensor
#[derive(Debug, Serialize)]
struct WireOutput<'a> {
    name: &'a str,
    shape: &'a [u64],
    datatype: &'static str,
    data: &'a TensorData,
}

/// Decode a raw payload into a typed [`InferenceRequest`].
///
/// A server-generated UUID is assigned when the caller omits `id`.
pub fn decode(raw: &[u8]) -> Result<InferenceRequest, DecodeError> {
    if raw.is_empty() {
        return Err(DecodeError::MalformedPayload("empty request body".to_string()));
    }

    let wire: WireRequest = serde_json::from_slice(raw)
        .map_err(|e| DecodeError::MalformedPayload(e.to_string()))?;

    let mut seen = HashSet::new();
    let mut inputs = Vec::with_capacity(wire.inputs.len());
    for input in wire.inputs {
        if !seen.insert(input.name.clone()) {
            return Err(DecodeError::MalformedPayload(format!(
                "duplicate input name '{}'",
                input.name
            )));
        }

        let datatype = Datatype::from_wire(&input.datatype)
            .ok_or_else(|| DecodeError::UnsupportedDatatype(input.datatype.clone()))?;

        let data = decode_data(&input.name, datatype, input.data)?;
        let tensor = Tensor::new(input.name, input.shape, data);
        if tensor.element_count().is_none() {
            return Err(DecodeError::MalformedPayload(format!(
                "input '{}' shape implies an element count that overflows",
                tensor.name
            )));
        }
        inputs.push(tensor);
    }

    let id = wire
        .id
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    Ok(InferenceRequest { id, inputs })
}

/// Extract a typed flat payload from a JSON data array
fn decode_data(name: &str, datatype: Datatype, data: Value) -> Result<TensorData, DecodeError> {
    let elements = match data {
        Value::Array(elements) => elements,
        _ => {
            return Err(DecodeError::MalformedPayload(format!(
                "input '{}' data must be an array",
                name
            )))
        }
    };

    match datatype {
        Datatype::Fp32 => collect(name, &elements, "FP32", |v| {
            v.as_f64().map(|f| f as f32)
        })
        .map(TensorData::Fp32),
        Datatype::Fp64 => collect(name, &elements, "FP64", Value::as_f64).map(TensorData::Fp64),
        Datatype::Int32 => collect(name, &elements, "INT32", |v| {
            v.as_i64().and_then(|i| i32::try_from(i).ok())
        })
        .map(TensorData::Int32),
        Datatype::Int64 => collect(name, &elements, "INT64", Value::as_i64).map(TensorData::Int64),
        Datatype::Bool => collect(name, &elements, "BOOL", Value::as_bool).map(TensorData::Bool),
        Datatype::Bytes => collect(name, &elements, "BYTES", |v| {
            v.as_str().map(str::to_string)
        })
        .map(TensorData::Bytes),
    }
}

fn collect<T>(
    name: &str,
    elements: &[Value],
    expected: &str,
    extract: impl Fn(&Value) -> Option<T>,
) -> Result<Vec<T>, DecodeError> {
    elements
        .iter()
        .enumerate()
        .map(|(index, value)| {
            extract(value).ok_or_else(|| {
                DecodeError::MalformedPayload(format!(
                    "input '{}' data element {} is not a valid {} value",
                    name, index, expected
                ))
            })
        })
        .collect()
}

/// Encode a response as wire bytes.
///
/// Never fails for well-formed internal tensors: every field serializes to
/// plain JSON values.
pub fn encode(response: &InferenceResponse) -> Vec<u8> {
    let wire = WireResponse {
        id: &response.id,
        model_name: &response.model_name,
        model_version: &response.model_version,
        outputs: response
            .outputs
            .iter()
            .map(|tensor| WireOutput {
                name: &tensor.name,
                shape: &tensor.shape,
                datatype: tensor.datatype().as_str(),
                data: &tensor.data,
            })
            .collect(),
    };

    serde_json::to_vec(&wire).expect("wire response serialization is infallible")
}
