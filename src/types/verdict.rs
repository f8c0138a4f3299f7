//! Verdict data structures

use crate::feature_encoder::EncodedFeatures;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary screening verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FraudLabel {
    #[serde(rename = "Fraudulent")]
    Fraudulent,
    #[serde(rename = "Not Fraudulent")]
    NotFraudulent,
}

impl FraudLabel {
    /// Derive a label from the classifier's raw output (`1` is fraud).
    pub fn from_raw(raw: i64) -> Self {
        if raw == 1 {
            FraudLabel::Fraudulent
        } else {
            FraudLabel::NotFraudulent
        }
    }

    pub fn is_fraud(self) -> bool {
        self == FraudLabel::Fraudulent
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FraudLabel::Fraudulent => "Fraudulent",
            FraudLabel::NotFraudulent => "Not Fraudulent",
        }
    }
}

impl fmt::Display for FraudLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of screening a single transaction
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    /// Verdict derived from the classifier output
    pub label: FraudLabel,
    /// Features the classifier was given
    pub features: EncodedFeatures,
}
