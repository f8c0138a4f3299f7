//! Transaction data structures for payment fraud screening

use crate::error::{ScreenError, ScreenResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Payment transaction category.
///
/// Declaration order is the model's category encoding and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    CashIn,
    CashOut,
    Debit,
    Payment,
    Transfer,
}

impl TransactionType {
    /// All categories in encoding order
    pub const ALL: [TransactionType; 5] = [
        TransactionType::CashIn,
        TransactionType::CashOut,
        TransactionType::Debit,
        TransactionType::Payment,
        TransactionType::Transfer,
    ];

    /// Position in the fixed category ordering
    pub fn code(self) -> u8 {
        match self {
            TransactionType::CashIn => 0,
            TransactionType::CashOut => 1,
            TransactionType::Debit => 2,
            TransactionType::Payment => 3,
            TransactionType::Transfer => 4,
        }
    }

    /// Upper-case name as it appears in forms and batch files
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::CashIn => "CASH_IN",
            TransactionType::CashOut => "CASH_OUT",
            TransactionType::Debit => "DEBIT",
            TransactionType::Payment => "PAYMENT",
            TransactionType::Transfer => "TRANSFER",
        }
    }

    /// Legacy fractional code used by older batch exports.
    pub fn legacy_code(self) -> f64 {
        self.code() as f64 / 4.0
    }

    /// Map a legacy fractional code (`0, 0.25, 0.5, 0.75, 1`) to its category.
    pub fn from_legacy_code(value: f64) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.legacy_code() == value)
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = ScreenError;

    fn from_str(s: &str) -> ScreenResult<Self> {
        let name = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == name)
            .ok_or_else(|| ScreenError::UnknownCategory(s.to_string()))
    }
}

/// A single payment transaction submitted for screening
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Transaction category
    pub transaction_type: TransactionType,

    /// Transaction amount
    pub amount: f64,

    /// Originating account balance before the transaction
    pub old_balance: f64,

    /// Balance after the transaction
    pub new_balance: f64,
}

impl TransactionRecord {
    /// Create a new transaction record
    pub fn new(
        transaction_type: TransactionType,
        amount: f64,
        old_balance: f64,
        new_balance: f64,
    ) -> Self {
        Self {
            transaction_type,
            amount,
            old_balance,
            new_balance,
        }
    }

    /// Numeric fields with their names, in feature order
    pub fn numeric_fields(&self) -> [(&'static str, f64); 3] {
        [
            ("amount", self.amount),
            ("old_balance", self.old_balance),
            ("new_balance", self.new_balance),
        ]
    }

    /// Reject records with a negative or non-finite numeric field.
    pub fn validate(&self) -> ScreenResult<()> {
        for (field, value) in self.numeric_fields() {
            if !value.is_finite() || value < 0.0 {
                return Err(ScreenError::Validation { field, value });
            }
        }
        Ok(())
    }
}

impl Default for TransactionRecord {
    fn default() -> Self {
        Self::new(TransactionType::CashIn, 0.0, 0.0, 0.0)
    }
}
