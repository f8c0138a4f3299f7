//! Classifier boundary and the ONNX-backed implementation

use crate::config::ModelConfig;
use crate::feature_encoder::{EncodedFeatures, FEATURE_COUNT};
use crate::models::loader::{LoadedModel, ModelLoader};
use anyhow::{Context, Result};
use ort::memory::Allocator;
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, DynValue};
use std::path::Path;
use std::sync::RwLock;
use tracing::{debug, info};

/// Pre-trained binary classifier.
///
/// `predict` returns one raw label per input row, in input order. A raw
/// label of `1` means fraud.
pub trait Classifier {
    /// Name used in logs
    fn name(&self) -> &str;

    fn predict(&self, features: &[EncodedFeatures]) -> Result<Vec<i64>>;
}

/// Classifier running an ONNX export of the trained model
pub struct OnnxClassifier {
    name: String,
    /// ONNX session needs `&mut` to run
    model: RwLock<LoadedModel>,
    /// Class-1 probability at or above which a row is fraud, for models
    /// without a label output
    probability_threshold: f64,
}

impl OnnxClassifier {
    /// Load the classifier described by the configuration
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let loader = ModelLoader::with_threads(config.onnx_threads);
        let name = Path::new(&config.path)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("model")
            .to_string();

        let model = loader.load_model(&config.path, &name, &config.label_output)?;

        info!(
            model = %name,
            probability_threshold = config.probability_threshold,
            "Classifier initialized"
        );

        Ok(Self {
            name,
            model: RwLock::new(model),
            probability_threshold: config.probability_threshold,
        })
    }

    /// Run the model over a `[rows, FEATURE_COUNT]` feature matrix
    fn run_model(&self, model: &mut LoadedModel, features: &[EncodedFeatures]) -> Result<Vec<i64>> {
        use ort::value::Tensor;

        let rows = features.len();
        let shape = vec![rows as i64, FEATURE_COUNT as i64];
        let data: Vec<f32> = features.iter().flat_map(|f| f.to_f32()).collect();
        let input_tensor =
            Tensor::from_array((shape, data)).context("Failed to create input tensor")?;

        let model_name = model.name.clone();
        let label_output = model.label_output.clone();
        let probability_output = model.probability_output.clone();

        let outputs = model
            .session
            .run(ort::inputs![&model.input_name => input_tensor])?;

        // Integer class output (LightGBM / sklearn exports)
        if let Some(name) = label_output.as_deref() {
            if let Some(output) = outputs.get(name) {
                if let Ok((_, labels)) = output.try_extract_tensor::<i64>() {
                    debug!(model = %model_name, rows, "Extracted labels from tensor");
                    return Ok(labels.to_vec());
                }
            }
        }

        // Fall back to thresholding class probabilities
        if let Some(name) = probability_output.as_deref() {
            if let Some(output) = outputs.get(name) {
                let probs = self.extract_probabilities(output, rows, &model_name)?;
                return Ok(probs
                    .into_iter()
                    .map(|p| i64::from(p >= self.probability_threshold))
                    .collect());
            }
        }

        anyhow::bail!("Model {} produced neither labels nor probabilities", model_name)
    }

    /// Extract per-row fraud probabilities.
    /// Handles tensor outputs and seq(map(int64, float)) outputs.
    fn extract_probabilities(
        &self,
        output: &DynValue,
        rows: usize,
        model_name: &str,
    ) -> Result<Vec<f64>> {
        if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
            let dims: Vec<i64> = shape.iter().copied().collect();
            let probs = fraud_probabilities(&dims, data, rows)
                .with_context(|| format!("Bad probability output from model {}", model_name))?;
            debug!(model = %model_name, rows, "Extracted probabilities from tensor");
            return Ok(probs);
        }

        let dtype = output.dtype();
        if DynSequenceValueType::can_downcast(&dtype) {
            return self.extract_from_sequence_map(output, model_name);
        }

        anyhow::bail!("Unsupported probability output for model {}", model_name)
    }

    /// Extract probabilities from seq(map(int64, float)) format, one map per row
    fn extract_from_sequence_map(&self, output: &DynValue, model_name: &str) -> Result<Vec<f64>> {
        let allocator = Allocator::default();

        let sequence = output
            .downcast_ref::<DynSequenceValueType>()
            .map_err(|e| anyhow::anyhow!("Failed to downcast to sequence: {}", e))?;

        let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;

        let mut probs = Vec::with_capacity(maps.len());
        for map_value in &maps {
            let kv_pairs = map_value.try_extract_key_values::<i64, f32>()?;

            let prob = kv_pairs
                .iter()
                .find(|(class_id, _)| *class_id == 1)
                .map(|(_, p)| *p as f64)
                .or_else(|| {
                    kv_pairs
                        .iter()
                        .find(|(class_id, _)| *class_id == 0)
                        .map(|(_, p)| 1.0 - *p as f64)
                })
                .ok_or_else(|| anyhow::anyhow!("No probability found in map"))?;
            probs.push(prob);
        }

        debug!(model = %model_name, rows = probs.len(), "Extracted from seq(map)");
        Ok(probs)
    }
}

/// Fraud-class probability per row from a flat `f32` tensor.
///
/// `[rows, n]` with `n >= 2` holds the fraud class at index 1; `[rows, 1]` or
/// `[rows]` holds the fraud probability directly.
fn fraud_probabilities(dims: &[i64], data: &[f32], rows: usize) -> Result<Vec<f64>> {
    let num_classes = if dims.len() == 2 { dims[1].max(1) as usize } else { 1 };
    let class = if num_classes >= 2 { 1 } else { 0 };

    if data.len() < rows * num_classes {
        anyhow::bail!(
            "expected {} rows of {} classes, got {} values (shape {:?})",
            rows,
            num_classes,
            data.len(),
            dims
        );
    }

    Ok((0..rows)
        .map(|i| data[i * num_classes + class] as f64)
        .collect())
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, features: &[EncodedFeatures]) -> Result<Vec<i64>> {
        if features.is_empty() {
            return Ok(Vec::new());
        }

        let mut model = self
            .model
            .write()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        self.run_model(&mut model, features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_is_an_error() {
        let config = ModelConfig {
            path: "models/missing.onnx".to_string(),
            ..ModelConfig::default()
        };
        assert!(OnnxClassifier::new(&config).is_err());
    }

    #[test]
    fn test_two_class_probabilities_use_fraud_column() {
        let probs = fraud_probabilities(&[3, 2], &[0.9, 0.1, 0.2, 0.8, 0.5, 0.5], 3).unwrap();
        let expected = [0.1f32, 0.8, 0.5].map(f64::from);
        assert_eq!(probs, expected.to_vec());
    }

    #[test]
    fn test_single_column_probabilities() {
        let probs = fraud_probabilities(&[2], &[0.25, 0.75], 2).unwrap();
        assert_eq!(probs, vec![0.25, 0.75]);

        let probs = fraud_probabilities(&[2, 1], &[0.25, 0.75], 2).unwrap();
        assert_eq!(probs, vec![0.25, 0.75]);
    }

    #[test]
    fn test_short_probability_tensor_is_an_error() {
        // One row missing from a [rows, 2] output
        let err = fraud_probabilities(&[2, 2], &[0.4, 0.6, 0.3, 0.7], 3).unwrap_err();
        assert!(err.to_string().contains("expected 3 rows"));

        assert!(fraud_probabilities(&[1], &[0.9], 2).is_err());
    }
}
