//! Feature encoding for fraud model inference.
//!
//! Transforms transaction records into the four-feature vector the trained
//! model expects. Both the form path and the batch path go through the same
//! category encoding; the batch path additionally accepts legacy fractional
//! category codes.

use crate::error::{ScreenError, ScreenResult};
use crate::types::transaction::{TransactionRecord, TransactionType};

/// Number of features produced per record
pub const FEATURE_COUNT: usize = 4;

/// Feature names in model input order (the batch file column names).
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = ["type", "amount", "oldbalanceOrg", "newbalanceDest"];

/// Encoded model input: `[type_code, amount, old_balance, new_balance]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodedFeatures([f64; FEATURE_COUNT]);

impl EncodedFeatures {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn type_code(&self) -> f64 {
        self.0[0]
    }

    /// Single-precision copy for tensor construction
    pub fn to_f32(&self) -> [f32; FEATURE_COUNT] {
        self.0.map(|v| v as f32)
    }
}

/// Feature encoder that transforms transaction records into model input features.
pub struct FeatureEncoder;

impl FeatureEncoder {
    /// Create a new feature encoder.
    pub fn new() -> Self {
        Self
    }

    /// Encode a transaction record.
    ///
    /// Fails with `InvalidInput` for negative or non-finite amounts; callers
    /// are expected to have validated the record already.
    pub fn encode(&self, record: &TransactionRecord) -> ScreenResult<EncodedFeatures> {
        for (field, value) in record.numeric_fields() {
            if !value.is_finite() || value < 0.0 {
                return Err(ScreenError::InvalidInput {
                    field: field.to_string(),
                    message: format!("must be a non-negative number, got {value}"),
                });
            }
        }

        Ok(EncodedFeatures([
            record.transaction_type.code() as f64,
            record.amount,
            record.old_balance,
            record.new_balance,
        ]))
    }

    /// Map a batch `type` cell to a category.
    ///
    /// Accepts category names first, then the legacy codes `0, 0.25, 0.5,
    /// 0.75, 1` (CASH_IN..TRANSFER). Anything else is `UnknownCategory`.
    pub fn decode_batch_type(&self, raw: &str) -> ScreenResult<TransactionType> {
        if let Ok(t) = raw.parse::<TransactionType>() {
            return Ok(t);
        }

        raw.trim()
            .parse::<f64>()
            .ok()
            .and_then(TransactionType::from_legacy_code)
            .ok_or_else(|| ScreenError::UnknownCategory(raw.to_string()))
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        FEATURE_COUNT
    }

    /// Get feature names (matching model input order).
    pub fn feature_names(&self) -> &'static [&'static str] {
        &FEATURE_NAMES
    }
}

impl Default for FeatureEncoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_transfer() {
        let encoder = FeatureEncoder::new();
        let record = TransactionRecord::new(TransactionType::Transfer, 5000.0, 10000.0, 5000.0);

        let features = encoder.encode(&record).unwrap();

        assert_eq!(features.as_slice(), &[4.0, 5000.0, 10000.0, 5000.0]);
        assert_eq!(features.to_f32(), [4.0, 5000.0, 10000.0, 5000.0]);
    }

    #[test]
    fn test_type_code_matches_enum_position() {
        let encoder = FeatureEncoder::new();
        for (i, t) in TransactionType::ALL.into_iter().enumerate() {
            let features = encoder.encode(&TransactionRecord::new(t, 1.0, 2.0, 3.0)).unwrap();
            assert_eq!(features.type_code(), i as f64);
        }
    }

    #[test]
    fn test_encode_rejects_negative() {
        let encoder = FeatureEncoder::new();
        let record = TransactionRecord::new(TransactionType::CashIn, 1.0, -5.0, 0.0);

        match encoder.encode(&record) {
            Err(ScreenError::InvalidInput { field, .. }) => assert_eq!(field, "old_balance"),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_legacy_codes_match_names() {
        let encoder = FeatureEncoder::new();
        let pairs = [
            ("CASH_IN", "0"),
            ("CASH_OUT", "0.25"),
            ("DEBIT", "0.5"),
            ("PAYMENT", "0.75"),
            ("TRANSFER", "1"),
        ];

        for (name, code) in pairs {
            let by_name = encoder.decode_batch_type(name).unwrap();
            let by_code = encoder.decode_batch_type(code).unwrap();
            assert_eq!(by_name, by_code, "{name} vs {code}");
        }

        // Alternative numeric spellings of the same values
        assert_eq!(encoder.decode_batch_type("1.0").unwrap(), TransactionType::Transfer);
        assert_eq!(encoder.decode_batch_type("0.50").unwrap(), TransactionType::Debit);
    }

    #[test]
    fn test_unmapped_batch_type() {
        let encoder = FeatureEncoder::new();
        for raw in ["REFUND", "0.3", "4", "", "transfer"] {
            assert!(matches!(
                encoder.decode_batch_type(raw),
                Err(ScreenError::UnknownCategory(_))
            ));
        }
    }

    #[test]
    fn test_feature_count() {
        let encoder = FeatureEncoder::new();
        assert_eq!(encoder.feature_count(), 4);
        assert_eq!(encoder.feature_names().len(), 4);
        assert_eq!(encoder.feature_names()[2], "oldbalanceOrg");
    }
}
