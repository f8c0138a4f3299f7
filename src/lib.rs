//! Payment Fraud Screening Library
//!
//! Screens payment transactions with a pre-trained binary classifier, one
//! record at a time or as a CSV batch, and keeps a per-session history of
//! every verdict.

pub mod batch;
pub mod commands;
pub mod config;
pub mod error;
pub mod feature_encoder;
pub mod metrics;
pub mod models;
pub mod service;
pub mod session;
pub mod types;

pub use batch::{BatchResult, BatchTable, RowIssue};
pub use config::AppConfig;
pub use error::{ScreenError, ScreenResult};
pub use feature_encoder::{EncodedFeatures, FeatureEncoder};
pub use models::inference::{Classifier, OnnxClassifier};
pub use service::PredictionService;
pub use session::{SessionLog, SessionState};
pub use types::{FraudLabel, HistoryEntry, PredictionResult, TransactionRecord, TransactionType};
