//! ONNX model loader

use anyhow::{Context, Result};
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::path::Path;
use tracing::{info, warn};

/// Loaded ONNX model with metadata
pub struct LoadedModel {
    /// Model name
    pub name: String,
    /// ONNX Runtime session
    pub session: Session,
    /// Input name for the feature matrix
    pub input_name: String,
    /// Output holding the predicted class per row
    pub label_output: Option<String>,
    /// Output holding class probabilities per row
    pub probability_output: Option<String>,
}

/// Loader for ONNX models
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with specified number of threads
    pub fn with_threads(onnx_threads: usize) -> Self {
        Self {
            onnx_threads: onnx_threads.max(1),
        }
    }

    /// Load a single ONNX model from file.
    ///
    /// `label_output` names the integer class output; when the model has no
    /// output of that name, any output containing "label" is used instead.
    pub fn load_model<P: AsRef<Path>>(
        &self,
        path: P,
        name: &str,
        label_output: &str,
    ) -> Result<LoadedModel> {
        let path = path.as_ref();

        if !path.exists() {
            anyhow::bail!("Model file not found: {}", path.display());
        }

        info!(model = %name, path = %path.display(), threads = self.onnx_threads, "Loading ONNX model");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(self.onnx_threads)?
            .commit_from_file(path)
            .context(format!("Failed to load model from {:?}", path))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let output_names: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();

        let label_output = output_names
            .iter()
            .find(|n| n.as_str() == label_output)
            .or_else(|| output_names.iter().find(|n| n.contains("label")))
            .cloned();

        let probability_output = output_names
            .iter()
            .find(|n| n.contains("prob"))
            .or_else(|| {
                output_names
                    .iter()
                    .rev()
                    .find(|n| Some(*n) != label_output.as_ref())
            })
            .cloned();

        if label_output.is_none() && probability_output.is_none() {
            warn!(model = %name, outputs = ?output_names, "No usable output found");
        }

        info!(
            model = %name,
            input = %input_name,
            label_output = ?label_output,
            probability_output = ?probability_output,
            "Model loaded successfully"
        );

        Ok(LoadedModel {
            name: name.to_string(),
            session,
            input_name,
            label_output,
            probability_output,
        })
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self { onnx_threads: 1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_file() {
        let loader = ModelLoader::default();
        let err = loader
            .load_model("does/not/exist.onnx", "lightgbm", "label")
            .err()
            .unwrap();
        assert!(err.to_string().contains("Model file not found"));
    }

    #[test]
    fn test_thread_count_is_at_least_one() {
        assert_eq!(ModelLoader::with_threads(0).onnx_threads, 1);
        assert_eq!(ModelLoader::with_threads(4).onnx_threads, 4);
    }
}
