//! Type definitions for the screening workflow

pub mod history;
pub mod transaction;
pub mod verdict;

pub use history::{HistoryDetail, HistoryEntry, PredictionMode};
pub use transaction::{TransactionRecord, TransactionType};
pub use verdict::{FraudLabel, PredictionResult};
