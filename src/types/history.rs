//! Session history records

use crate::types::transaction::TransactionRecord;
use crate::types::verdict::FraudLabel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a prediction was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredictionMode {
    Individual,
    Batch,
}

impl PredictionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            PredictionMode::Individual => "Individual",
            PredictionMode::Batch => "Batch",
        }
    }
}

/// Mode-specific content of a history entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode")]
pub enum HistoryDetail {
    /// A single screened transaction
    Individual {
        record: TransactionRecord,
        label: FraudLabel,
    },
    /// Summary of a batch upload
    Batch {
        source: String,
        total_count: usize,
        fraud_count: usize,
    },
}

/// One prediction event recorded in the session log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Unique entry identifier
    pub id: Uuid,

    /// When the prediction was made
    pub timestamp: DateTime<Utc>,

    /// Event content
    pub detail: HistoryDetail,
}

impl HistoryEntry {
    /// Entry for a single-record prediction
    pub fn individual(record: TransactionRecord, label: FraudLabel) -> Self {
        Self::with_detail(HistoryDetail::Individual { record, label })
    }

    /// Entry summarising a batch prediction
    pub fn batch(source: impl Into<String>, total_count: usize, fraud_count: usize) -> Self {
        Self::with_detail(HistoryDetail::Batch {
            source: source.into(),
            total_count,
            fraud_count,
        })
    }

    fn with_detail(detail: HistoryDetail) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            detail,
        }
    }

    pub fn mode(&self) -> PredictionMode {
        match self.detail {
            HistoryDetail::Individual { .. } => PredictionMode::Individual,
            HistoryDetail::Batch { .. } => PredictionMode::Batch,
        }
    }

    /// Verdict of an individual entry; `None` for batch summaries
    pub fn label(&self) -> Option<FraudLabel> {
        match &self.detail {
            HistoryDetail::Individual { label, .. } => Some(*label),
            HistoryDetail::Batch { .. } => None,
        }
    }
}
