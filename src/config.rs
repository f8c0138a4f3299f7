//! Configuration management for the screening tool

use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::Path;

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Classifier configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Path to the ONNX export of the trained model
    #[serde(default = "default_model_path")]
    pub path: String,
    /// Number of threads for ONNX inference (default: 1)
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
    /// Name of the integer class output
    #[serde(default = "default_label_output")]
    pub label_output: String,
    /// Fraud probability cut-off, used only when the model has no label output
    #[serde(default = "default_probability_threshold")]
    pub probability_threshold: f64,
}

fn default_model_path() -> String {
    "models/lightgbm.onnx".to_string()
}

fn default_onnx_threads() -> usize {
    1
}

fn default_label_output() -> String {
    "label".to_string()
}

fn default_probability_threshold() -> f64 {
    0.5
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: default_model_path(),
            onnx_threads: default_onnx_threads(),
            label_output: default_label_output(),
            probability_threshold: default_probability_threshold(),
        }
    }
}

/// Output file configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    /// Default destination for augmented batch output
    #[serde(default = "default_predictions_file")]
    pub predictions_file: String,
    /// Default destination for the session history export
    #[serde(default = "default_history_file")]
    pub history_file: String,
}

fn default_predictions_file() -> String {
    "predictions.csv".to_string()
}

fn default_history_file() -> String {
    "history.csv".to_string()
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            predictions_file: default_predictions_file(),
            history_file: default_history_file(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Load from `path`, or `None` when the file does not exist
    pub fn load_if_exists<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        let path = path.as_ref();
        if path.exists() {
            Self::load_from_path(path).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Load from `path` if it exists, otherwise use built-in defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::load_if_exists(path)?.unwrap_or_default())
    }
}
