//! Validation engine for decoded inference requests
//!
//! Checks shape/datatype/name invariants against the loaded model's schema
//! before any computation happens. Pure, deterministic per input, and
//! first-failure-wins: at most one error is reported per request.

use crate::error::ValidationError;
use crate::tensor::{InferenceRequest, ModelSchema};

/// Validate a request against the model schema.
///
/// For every input, in order: (a) the data length must match the element
/// count implied by the declared shape, (b) the shape must be compatible
/// with what the model declares for that input (fixed dims equal, `-1`
/// matches any size), (c) the datatype must match, (d) the input name must
/// be one the model expects. Finally, every schema-required input must be
/// present.
pub fn validate(request: &InferenceRequest, schema: &ModelSchema) -> Result<(), ValidationError> {
    for input in &request.inputs {
        let expected = input.element_count();
        let actual = input.data.len();
        if expected != Some(actual as u64) {
            return Err(ValidationError::ShapeMismatch {
                name: input.name.clone(),
                shape: input.shape.clone(),
                expected: expected.unwrap_or(u64::MAX),
                actual,
            });
        }

        match schema.input(&input.name) {
            Some(spec) => {
                if !shape_compatible(&spec.shape, &input.shape) {
                    return Err(ValidationError::IncompatibleShape {
                        name: input.name.clone(),
                        expected: spec.shape.clone(),
                        actual: input.shape.clone(),
                    });
                }

                if spec.datatype != input.datatype() {
                    return Err(ValidationError::DatatypeMismatch {
                        name: input.name.clone(),
                        expected: spec.datatype.to_string(),
                        actual: input.datatype().to_string(),
                    });
                }
            }
            None => return Err(ValidationError::UnknownInput(input.name.clone())),
        }
    }

    for spec in &schema.inputs {
        if !request.inputs.iter().any(|input| input.name == spec.name) {
            return Err(ValidationError::MissingInput(spec.name.clone()));
        }
    }

    Ok(())
}

/// Rank must match; a `-1` schema dim matches any size
fn shape_compatible(expected: &[i64], actual: &[u64]) -> bool {
    expected.len() == actual.len()
        && expected.iter().zip(actual).all(|(want, got)| {
            *want == -1 || u64::try_from(*want).map_or(false, |want| want == *got)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::{Datatype, Tensor, TensorData, TensorSpec};

    fn iris_schema() -> ModelSchema {
        ModelSchema {
            name: "iris-classifier".to_string(),
            version: "v1.0.0".to_string(),
            platform: "rust".to_string(),
            inputs: vec![TensorSpec::new("input", Datatype::Fp32, vec![-1, 4])],
            outputs: vec![TensorSpec::new("probabilities", Datatype::Fp32, vec![-1, 3])],
        }
    }

    fn request_with(inputs: Vec<Tensor>) -> InferenceRequest {
        InferenceRequest {
            id: "test".to_string(),
            inputs,
        }
    }

    #[test]
    fn test_valid_request_passes() {
        let request = request_with(vec![Tensor::fp32(
            "input",
            vec![1, 4],
            vec![5.1, 3.5, 1.4, 0.2],
        )]);
        assert!(validate(&request, &iris_schema()).is_ok());
    }

    #[test]
    fn test_shape_mismatch() {
        let request = request_with(vec![Tensor::fp32(
            "input",
            vec![1, 3],
            vec![5.1, 3.5, 1.4, 0.2],
        )]);

        let err = validate(&request, &iris_schema()).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::ShapeMismatch {
                expected: 3,
                actual: 4,
                ..
            }
        ));
    }

    #[test]
    fn test_schema_shape_dims_enforced() {
        // Self-consistent shape and data, but the model wants 4 features.
        let request = request_with(vec![Tensor::fp32("input", vec![1, 3], vec![5.1, 3.5, 1.4])]);

        let err = validate(&request, &iris_schema()).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::IncompatibleShape { ref actual, .. } if *actual == vec![1, 3]
        ));
    }

    #[test]
    fn test_rank_mismatch_rejected() {
        let request = request_with(vec![Tensor::fp32("input", vec![4], vec![0.0; 4])]);

        let err = validate(&request, &iris_schema()).unwrap_err();
        assert!(matches!(err, ValidationError::IncompatibleShape { .. }));
    }

    #[test]
    fn test_dynamic_dim_matches_any_batch() {
        let request = request_with(vec![Tensor::fp32("input", vec![7, 4], vec![0.0; 28])]);
        assert!(validate(&request, &iris_schema()).is_ok());
    }

    #[test]
    fn test_datatype_mismatch() {
        let request = request_with(vec![Tensor::new(
            "input",
            vec![1, 4],
            TensorData::Int64(vec![5, 3, 1, 0]),
        )]);

        let err = validate(&request, &iris_schema()).unwrap_err();
        assert!(matches!(err, ValidationError::DatatypeMismatch { .. }));
    }

    #[test]
    fn test_unknown_input() {
        let request = request_with(vec![
            Tensor::fp32("input", vec![1, 4], vec![5.1, 3.5, 1.4, 0.2]),
            Tensor::fp32("extra", vec![1], vec![1.0]),
        ]);

        let err = validate(&request, &iris_schema()).unwrap_err();
        assert_eq!(err, ValidationError::UnknownInput("extra".to_string()));
    }

    #[test]
    fn test_missing_input() {
        let request = request_with(vec![]);
        let err = validate(&request, &iris_schema()).unwrap_err();
        assert_eq!(err, ValidationError::MissingInput("input".to_string()));
    }

    #[test]
    fn test_shape_checked_before_datatype() {
        // Both the shape and the datatype are wrong; shape wins.
        let request = request_with(vec![Tensor::new(
            "input",
            vec![1, 3],
            TensorData::Int64(vec![5, 3, 1, 0]),
        )]);

        let err = validate(&request, &iris_schema()).unwrap_err();
        assert!(matches!(err, ValidationError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_first_failure_wins() {
        // Two bad inputs; the first one's error is the one reported.
        let request = request_with(vec![
            Tensor::fp32("input", vec![2, 4], vec![1.0]),
            Tensor::fp32("extra", vec![1], vec![1.0]),
        ]);

        let err = validate(&request, &iris_schema()).unwrap_err();
        assert!(matches!(err, ValidationError::ShapeMismatch { .. }));
    }
}
