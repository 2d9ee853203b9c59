//! The resident iris species classifier
//!
//! A small linear classifier over the four iris measurements. The weights
//! are randomly initialized at load time; this is a placeholder model meant
//! to be swapped for a real one behind the same [`ModelRuntime`] seam.

use crate::runtime::ModelRuntime;
use async_trait::async_trait;
use rand::Rng;
use serve_core::{
    Datatype, LoadError, ModelSchema, PredictionError, Tensor, TensorData, TensorSpec,
};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, info};

const MODEL_NAME: &str = "iris-classifier";
const MODEL_VERSION: &str = "v1.0.0";
const CLASSES: [&str; 3] = ["setosa", "versicolor", "virginica"];

const FEATURES: usize = 4;
const NUM_CLASSES: usize = 3;

/// Linear softmax classifier for the iris dataset
pub struct IrisClassifier {
    /// Row-major `FEATURES x NUM_CLASSES` weight matrix, written once by
    /// `load` and read-only afterwards
    weights: OnceLock<Vec<f32>>,
}

impl IrisClassifier {
    pub fn new() -> Self {
        Self {
            weights: OnceLock::new(),
        }
    }

    fn softmax_row(logits: &[f32; NUM_CLASSES]) -> Result<[f32; NUM_CLASSES], PredictionError> {
        let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let mut probs = [0.0; NUM_CLASSES];
        let mut sum = 0.0;
        for (prob, logit) in probs.iter_mut().zip(logits) {
            *prob = (logit - max).exp();
            sum += *prob;
        }

        if !sum.is_finite() || sum <= 0.0 {
            return Err(PredictionError::numerical(
                "softmax normalization produced a non-finite sum",
            ));
        }

        for prob in &mut probs {
            *prob /= sum;
        }
        Ok(probs)
    }
}

impl Default for IrisClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelRuntime for IrisClassifier {
    async fn load(&self) -> Result<(), LoadError> {
        info!("loading weights for model '{}'", MODEL_NAME);

        // Placeholder for pulling real weights from a repository.
        tokio::time::sleep(Duration::from_millis(300)).await;

        let mut rng = rand::thread_rng();
        let weights: Vec<f32> = (0..FEATURES * NUM_CLASSES)
            .map(|_| rng.gen_range(-1.0..1.0))
            .collect();

        self.weights
            .set(weights)
            .map_err(|_| LoadError("model weights were already loaded".to_string()))?;

        info!("model '{}' loaded", MODEL_NAME);
        Ok(())
    }

    async fn warm_up(&self) -> Result<(), PredictionError> {
        let probe = Tensor::fp32("input", vec![1, FEATURES as u64], vec![0.0; FEATURES]);
        self.predict(&[probe]).await?;
        debug!("model '{}' warmed up", MODEL_NAME);
        Ok(())
    }

    async fn predict(&self, inputs: &[Tensor]) -> Result<Vec<Tensor>, PredictionError> {
        let weights = self
            .weights
            .get()
            .ok_or_else(|| PredictionError::internal("model parameters are not loaded"))?;

        let input = inputs
            .first()
            .ok_or_else(|| PredictionError::invalid_input("no input tensor supplied"))?;

        let values = match &input.data {
            TensorData::Fp32(values) => values,
            other => {
                return Err(PredictionError::invalid_input(format!(
                    "expected FP32 input, got {}",
                    other.datatype()
                )))
            }
        };

        if values.is_empty() || values.len() % FEATURES != 0 {
            return Err(PredictionError::invalid_input(format!(
                "input length {} is not a multiple of {} features",
                values.len(),
                FEATURES
            )));
        }

        let rows = values.len() / FEATURES;
        let mut probabilities = Vec::with_capacity(rows * NUM_CLASSES);
        let mut predicted = Vec::with_capacity(rows);
        let mut confidence = Vec::with_capacity(rows);

        for row in values.chunks_exact(FEATURES) {
            let mut logits = [0.0f32; NUM_CLASSES];
            for (class, logit) in logits.iter_mut().enumerate() {
                *logit = row
                    .iter()
                    .enumerate()
                    .map(|(feature, x)| x * weights[feature * NUM_CLASSES + class])
                    .sum();
            }

            let probs = Self::softmax_row(&logits)?;
            let (best, best_prob) = probs
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .unwrap_or((0, &probs[0]));

            probabilities.extend_from_slice(&probs);
            predicted.push(CLASSES[best].to_string());
            confidence.push(*best_prob);
        }

        Ok(vec![
            Tensor::fp32(
                "probabilities",
                vec![rows as u64, NUM_CLASSES as u64],
                probabilities,
            ),
            Tensor::bytes("predicted_class", vec![rows as u64], predicted),
            Tensor::fp32("confidence", vec![rows as u64], confidence),
        ])
    }

    fn describe(&self) -> ModelSchema {
        ModelSchema {
            name: MODEL_NAME.to_string(),
            version: MODEL_VERSION.to_string(),
            platform: "rust".to_string(),
            inputs: vec![TensorSpec::new("input", Datatype::Fp32, vec![-1, 4])],
            outputs: vec![
                TensorSpec::new("probabilities", Datatype::Fp32, vec![-1, 3]),
                TensorSpec::new("predicted_class", Datatype::Bytes, vec![-1]),
                TensorSpec::new("confidence", Datatype::Fp32, vec![-1]),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn loaded() -> IrisClassifier {
        let model = IrisClassifier::new();
        model.load().await.unwrap();
        model
    }

    #[tokio::test]
    async fn test_predict_before_load_fails() {
        let model = IrisClassifier::new();
        let input = Tensor::fp32("input", vec![1, 4], vec![5.1, 3.5, 1.4, 0.2]);

        let err = model.predict(&[input]).await.unwrap_err();
        assert_eq!(err.kind, serve_core::PredictionKind::Internal);
    }

    #[tokio::test]
    async fn test_single_sample_prediction() {
        let model = loaded().await;
        let input = Tensor::fp32("input", vec![1, 4], vec![5.1, 3.5, 1.4, 0.2]);

        let outputs = model.predict(&[input]).await.unwrap();
        assert_eq!(outputs.len(), 3);

        let probs = &outputs[0];
        assert_eq!(probs.name, "probabilities");
        assert_eq!(probs.shape, vec![1, 3]);

        let classes = &outputs[1];
        assert_eq!(classes.name, "predicted_class");
        match &classes.data {
            TensorData::Bytes(names) => {
                assert!(CLASSES.contains(&names[0].as_str()));
            }
            other => panic!("expected BYTES output, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_probabilities_sum_to_one() {
        let model = loaded().await;
        let input = Tensor::fp32("input", vec![1, 4], vec![6.7, 3.1, 4.7, 1.5]);

        let outputs = model.predict(&[input]).await.unwrap();
        let probs = match &outputs[0].data {
            TensorData::Fp32(values) => values,
            other => panic!("expected FP32 output, got {:?}", other),
        };

        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-3, "probabilities sum to {}", sum);
    }

    #[tokio::test]
    async fn test_batch_prediction_shapes() {
        let model = loaded().await;
        let input = Tensor::fp32(
            "input",
            vec![3, 4],
            vec![
                5.1, 3.5, 1.4, 0.2, //
                6.7, 3.1, 4.7, 1.5, //
                6.3, 3.3, 6.0, 2.5,
            ],
        );

        let outputs = model.predict(&[input]).await.unwrap();
        assert_eq!(outputs[0].shape, vec![3, 3]);
        assert_eq!(outputs[1].shape, vec![3]);
        assert_eq!(outputs[2].shape, vec![3]);
        assert_eq!(outputs[0].data.len(), 9);
    }

    #[tokio::test]
    async fn test_non_multiple_input_length() {
        let model = loaded().await;
        let input = Tensor::fp32("input", vec![3], vec![1.0, 2.0, 3.0]);

        let err = model.predict(&[input]).await.unwrap_err();
        assert_eq!(err.kind, serve_core::PredictionKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_warm_up_after_load() {
        let model = loaded().await;
        assert!(model.warm_up().await.is_ok());
    }

    #[test]
    fn test_describe_schema() {
        let schema = IrisClassifier::new().describe();
        assert_eq!(schema.name, "iris-classifier");
        assert_eq!(schema.version, "v1.0.0");
        assert_eq!(schema.inputs.len(), 1);
        assert_eq!(schema.inputs[0].shape, vec![-1, 4]);
        assert_eq!(schema.outputs.len(), 3);
    }
}
