//! Prediction service: encode, classify, record.

use crate::batch::{BatchResult, BatchTable};
use crate::error::{ScreenError, ScreenResult};
use crate::feature_encoder::{EncodedFeatures, FeatureEncoder};
use crate::models::inference::Classifier;
use crate::session::SessionState;
use crate::types::history::HistoryEntry;
use crate::types::transaction::TransactionRecord;
use crate::types::verdict::{FraudLabel, PredictionResult};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Runs screening requests against a classifier and records them in the
/// caller's session.
pub struct PredictionService<C: Classifier> {
    classifier: C,
    encoder: FeatureEncoder,
}

impl<C: Classifier> PredictionService<C> {
    pub fn new(classifier: C) -> Self {
        Self {
            classifier,
            encoder: FeatureEncoder::new(),
        }
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    /// Screen a single transaction.
    ///
    /// Negative amounts are rejected with `Validation` before anything else
    /// happens. On success exactly one Individual entry is appended.
    pub fn predict_one(
        &self,
        session: &mut SessionState,
        record: &TransactionRecord,
    ) -> ScreenResult<PredictionResult> {
        let start_time = Instant::now();

        record.validate()?;

        let features = self.encoder.encode(record)?;
        let raw = self.classify(std::slice::from_ref(&features))?;
        let label = FraudLabel::from_raw(raw[0]);

        session
            .log_mut()
            .append(HistoryEntry::individual(record.clone(), label));

        let processing_time = start_time.elapsed();
        session
            .metrics_mut()
            .record_individual(processing_time, label.is_fraud());

        info!(
            session_id = %session.id(),
            transaction_type = %record.transaction_type,
            amount = record.amount,
            label = %label,
            processing_time_us = processing_time.as_micros(),
            "Transaction screened"
        );

        Ok(PredictionResult { label, features })
    }

    /// Screen a CSV batch read from `input`.
    pub fn predict_batch<R: Read>(
        &self,
        session: &mut SessionState,
        input: R,
        source_name: &str,
    ) -> ScreenResult<BatchResult> {
        let table = BatchTable::from_reader(input, &self.encoder)?;
        self.predict_table(session, table, source_name)
    }

    /// Screen a CSV batch file; the file name is recorded as the source.
    pub fn predict_batch_file<P: AsRef<Path>>(
        &self,
        session: &mut SessionState,
        path: P,
    ) -> ScreenResult<BatchResult> {
        let path = path.as_ref();
        let source_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let file = File::open(path)?;
        self.predict_batch(session, BufReader::new(file), &source_name)
    }

    /// Screen an already parsed batch.
    ///
    /// Flagged rows are skipped by the classifier and keep an empty verdict.
    /// Valid rows are classified in a single call. On success exactly one
    /// Batch entry is appended.
    pub fn predict_table(
        &self,
        session: &mut SessionState,
        table: BatchTable,
        source_name: &str,
    ) -> ScreenResult<BatchResult> {
        let start_time = Instant::now();
        let total_count = table.len();

        let mut features: Vec<EncodedFeatures> = Vec::with_capacity(total_count);
        let mut flagged = Vec::new();
        for row in table.rows() {
            match &row.record {
                Ok(record) => features.push(self.encoder.encode(record)?),
                Err(issue) => {
                    debug!(source = %source_name, issue = %issue, "Row flagged");
                    flagged.push(issue.clone());
                }
            }
        }

        if !flagged.is_empty() {
            warn!(
                source = %source_name,
                flagged = flagged.len(),
                total = total_count,
                "Batch contains rows that could not be encoded"
            );
        }

        let raw = if features.is_empty() {
            Vec::new()
        } else {
            self.classify(&features)?
        };

        let mut verdicts = raw.into_iter().map(FraudLabel::from_raw);
        let labels: Vec<Option<FraudLabel>> = table
            .rows()
            .iter()
            .map(|row| match row.record {
                Ok(_) => verdicts.next(),
                Err(_) => None,
            })
            .collect();

        let fraud_count = labels
            .iter()
            .filter(|l| matches!(l, Some(FraudLabel::Fraudulent)))
            .count();

        let result = BatchResult {
            table: table.augment(&labels),
            total_count,
            fraud_count,
            flagged,
        };

        session
            .log_mut()
            .append(HistoryEntry::batch(source_name, total_count, fraud_count));

        let processing_time = start_time.elapsed();
        session.metrics_mut().record_batch(
            processing_time,
            result.classified_count(),
            result.flagged.len(),
            fraud_count,
        );

        info!(
            session_id = %session.id(),
            source = %source_name,
            total = total_count,
            fraud = fraud_count,
            flagged = result.flagged.len(),
            processing_time_us = processing_time.as_micros(),
            "Batch screened"
        );

        Ok(result)
    }

    /// Invoke the classifier and check it returned one label per row
    fn classify(&self, features: &[EncodedFeatures]) -> ScreenResult<Vec<i64>> {
        let raw = self
            .classifier
            .predict(features)
            .map_err(|e| ScreenError::Classifier(format!("{}: {:#}", self.classifier.name(), e)))?;

        if raw.len() != features.len() {
            return Err(ScreenError::LabelCount {
                expected: features.len(),
                got: raw.len(),
            });
        }

        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::history::{HistoryDetail, PredictionMode};
    use crate::types::transaction::TransactionType;
    use std::cell::RefCell;

    /// Returns queued labels in order and remembers what it was given
    struct ScriptedClassifier {
        labels: RefCell<Vec<i64>>,
        seen: RefCell<Vec<Vec<f64>>>,
    }

    impl ScriptedClassifier {
        fn new(labels: &[i64]) -> Self {
            Self {
                labels: RefCell::new(labels.to_vec()),
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl Classifier for ScriptedClassifier {
        fn name(&self) -> &str {
            "scripted"
        }

        fn predict(&self, features: &[EncodedFeatures]) -> anyhow::Result<Vec<i64>> {
            self.seen
                .borrow_mut()
                .extend(features.iter().map(|f| f.as_slice().to_vec()));
            let mut labels = self.labels.borrow_mut();
            let n = features.len().min(labels.len());
            Ok(labels.drain(..n).collect())
        }
    }

    struct FailingClassifier;

    impl Classifier for FailingClassifier {
        fn name(&self) -> &str {
            "failing"
        }

        fn predict(&self, _features: &[EncodedFeatures]) -> anyhow::Result<Vec<i64>> {
            anyhow::bail!("session closed")
        }
    }

    const BATCH_HEADER: &str = "type,amount,oldbalanceOrg,newbalanceDest\n";

    #[test]
    fn test_predict_one_fraudulent_transfer() {
        let service = PredictionService::new(ScriptedClassifier::new(&[1]));
        let mut session = SessionState::new();
        let record = TransactionRecord::new(TransactionType::Transfer, 5000.0, 10000.0, 5000.0);

        let result = service.predict_one(&mut session, &record).unwrap();

        assert_eq!(result.label, FraudLabel::Fraudulent);
        assert_eq!(result.features.as_slice(), &[4.0, 5000.0, 10000.0, 5000.0]);
        assert_eq!(session.log().len(), 1);

        let entry = &session.log().list()[0];
        assert_eq!(entry.mode(), PredictionMode::Individual);
        assert_eq!(entry.label(), Some(result.label));
        assert_eq!(session.metrics().fraud_verdicts, 1);
    }

    #[test]
    fn test_predict_one_rejects_negative_without_side_effects() {
        let classifier = ScriptedClassifier::new(&[1]);
        let service = PredictionService::new(classifier);
        let mut session = SessionState::new();
        let record = TransactionRecord::new(TransactionType::CashIn, -10.0, 0.0, 0.0);

        let err = service.predict_one(&mut session, &record).unwrap_err();

        assert!(matches!(err, ScreenError::Validation { field: "amount", .. }));
        assert!(session.log().is_empty());
        assert!(service.classifier().seen.borrow().is_empty());
    }

    #[test]
    fn test_predict_one_classifier_failure_is_not_logged() {
        let service = PredictionService::new(FailingClassifier);
        let mut session = SessionState::new();
        let record = TransactionRecord::new(TransactionType::Payment, 1.0, 1.0, 0.0);

        let err = service.predict_one(&mut session, &record).unwrap_err();

        assert!(matches!(err, ScreenError::Classifier(msg) if msg.contains("session closed")));
        assert!(session.log().is_empty());
    }

    #[test]
    fn test_predict_one_label_count_mismatch() {
        let service = PredictionService::new(ScriptedClassifier::new(&[]));
        let mut session = SessionState::new();
        let record = TransactionRecord::new(TransactionType::Debit, 1.0, 1.0, 0.0);

        let err = service.predict_one(&mut session, &record).unwrap_err();
        assert!(matches!(err, ScreenError::LabelCount { expected: 1, got: 0 }));
        assert!(session.log().is_empty());
    }

    #[test]
    fn test_batch_three_rows() {
        let service = PredictionService::new(ScriptedClassifier::new(&[0, 1, 0]));
        let mut session = SessionState::new();
        let csv = format!("{BATCH_HEADER}PAYMENT,10,100,0\nTRANSFER,5000,5000,0\nCASH_IN,20,0,0\n");

        let result = service
            .predict_batch(&mut session, csv.as_bytes(), "three.csv")
            .unwrap();

        assert_eq!(result.total_count, 3);
        assert_eq!(result.fraud_count, 1);
        assert_eq!(
            result.table.label_column(),
            vec!["Not Fraudulent", "Fraudulent", "Not Fraudulent"]
        );

        assert_eq!(session.log().len(), 1);
        match &session.log().list()[0].detail {
            HistoryDetail::Batch {
                source,
                total_count,
                fraud_count,
            } => {
                assert_eq!(source, "three.csv");
                assert_eq!(*total_count, 3);
                assert_eq!(*fraud_count, 1);
            }
            other => panic!("expected batch entry, got {other:?}"),
        }
    }

    #[test]
    fn test_batch_schema_error_leaves_log_unchanged() {
        let service = PredictionService::new(ScriptedClassifier::new(&[0]));
        let mut session = SessionState::new();

        let err = service
            .predict_batch(&mut session, "type,amount\nPAYMENT,1\n".as_bytes(), "bad.csv")
            .unwrap_err();

        assert!(matches!(err, ScreenError::Schema { .. }));
        assert!(session.log().is_empty());
        assert!(service.classifier().seen.borrow().is_empty());
    }

    #[test]
    fn test_batch_flagged_rows_skip_classifier() {
        let service = PredictionService::new(ScriptedClassifier::new(&[1, 0]));
        let mut session = SessionState::new();
        let csv = format!("{BATCH_HEADER}1,900,1000,0\nREFUND,1,1,1\n0.5,10,20,10\n");

        let result = service
            .predict_batch(&mut session, csv.as_bytes(), "mixed.csv")
            .unwrap();

        assert_eq!(result.total_count, 3);
        assert_eq!(result.flagged.len(), 1);
        assert_eq!(result.flagged[0].row, 2);
        assert_eq!(result.classified_count(), 2);
        assert_eq!(result.legitimate_count(), 1);
        assert_eq!(result.table.label_column(), vec!["Fraudulent", "", "Not Fraudulent"]);

        // Legacy codes reach the classifier already normalised
        let seen = service.classifier().seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], vec![4.0, 900.0, 1000.0, 0.0]);
        assert_eq!(seen[1], vec![2.0, 10.0, 20.0, 10.0]);
    }

    #[test]
    fn test_batch_with_no_valid_rows_does_not_call_classifier() {
        let service = PredictionService::new(FailingClassifier);
        let mut session = SessionState::new();
        let csv = format!("{BATCH_HEADER}REFUND,1,1,1\n");

        let result = service
            .predict_batch(&mut session, csv.as_bytes(), "none.csv")
            .unwrap();

        assert_eq!(result.total_count, 1);
        assert_eq!(result.fraud_count, 0);
        assert_eq!(result.fraud_rate(), 0.0);
        assert_eq!(session.log().len(), 1);
    }

    #[test]
    fn test_batch_with_ragged_and_undecodable_rows_is_logged() {
        let service = PredictionService::new(ScriptedClassifier::new(&[0, 1]));
        let mut session = SessionState::new();
        let mut csv = b"type,amount,oldbalanceOrg,newbalanceDest,note\n\
            PAYMENT,1,2,3,x\n\
            DEBIT,1,2,3\n"
            .to_vec();
        csv.extend_from_slice(b"\xff\xfe,1,2,3,y\n");

        let result = service
            .predict_batch(&mut session, csv.as_slice(), "ragged.csv")
            .unwrap();

        assert_eq!(result.total_count, 3);
        assert_eq!(result.fraud_count, 1);
        assert_eq!(result.flagged.len(), 1);
        assert_eq!(result.flagged[0].row, 3);
        assert_eq!(result.table.label_column(), vec!["Not Fraudulent", "Fraudulent", ""]);
        assert_eq!(result.table.rows()[1], vec!["DEBIT", "1", "2", "3", "", "Fraudulent"]);
        assert_eq!(session.log().len(), 1);
    }

    #[test]
    fn test_failures_keep_prior_history() {
        let service = PredictionService::new(ScriptedClassifier::new(&[0]));
        let mut session = SessionState::new();
        let record = TransactionRecord::new(TransactionType::CashOut, 10.0, 10.0, 0.0);
        service.predict_one(&mut session, &record).unwrap();

        let bad = TransactionRecord::new(TransactionType::CashOut, 10.0, -1.0, 0.0);
        assert!(service.predict_one(&mut session, &bad).is_err());
        assert!(service
            .predict_batch(&mut session, "nope\n1\n".as_bytes(), "x.csv")
            .is_err());

        assert_eq!(session.log().len(), 1);
        assert_eq!(session.log().list()[0].label(), Some(FraudLabel::NotFraudulent));
    }
}
