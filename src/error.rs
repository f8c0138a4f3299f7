//! Error types for the screening workflow

use thiserror::Error;

/// Errors raised by encoding, prediction and export.
///
/// Each error is scoped to the request that produced it; the session log is
/// never modified by a failing call.
#[derive(Error, Debug)]
pub enum ScreenError {
    #[error("Values must not be negative: {field} = {value}")]
    Validation { field: &'static str, value: f64 },

    #[error("Invalid input: {field} - {message}")]
    InvalidInput { field: String, message: String },

    #[error("Dataset must contain columns: type, amount, oldbalanceOrg, newbalanceDest (missing: {})", .missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("Unknown transaction type: {0:?}")]
    UnknownCategory(String),

    #[error("Classifier error: {0}")]
    Classifier(String),

    #[error("Classifier returned {got} labels for {expected} rows")]
    LabelCount { expected: usize, got: usize },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for screening operations
pub type ScreenResult<T> = Result<T, ScreenError>;

impl ScreenError {
    /// Whether the error was caused by the caller's input rather than by
    /// the classifier or I/O.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            ScreenError::Validation { .. }
                | ScreenError::InvalidInput { .. }
                | ScreenError::Schema { .. }
                | ScreenError::UnknownCategory(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_message_lists_missing_columns() {
        let err = ScreenError::Schema {
            missing: vec!["amount".to_string(), "newbalanceDest".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("missing: amount, newbalanceDest"));
    }

    #[test]
    fn test_input_error_classification() {
        assert!(ScreenError::UnknownCategory("REFUND".into()).is_input_error());
        assert!(!ScreenError::Classifier("boom".into()).is_input_error());
        assert!(!ScreenError::LabelCount { expected: 2, got: 1 }.is_input_error());
    }
}
