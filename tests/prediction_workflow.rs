//! End-to-end screening workflow through the public API

use fraud_screen::{
    feature_encoder::EncodedFeatures, types::PredictionMode, Classifier, FraudLabel,
    PredictionService, ScreenError, SessionState, TransactionRecord, TransactionType,
};

/// Flags a transaction as fraud when it empties the originating account
struct DrainRule;

impl Classifier for DrainRule {
    fn name(&self) -> &str {
        "drain-rule"
    }

    fn predict(&self, features: &[EncodedFeatures]) -> anyhow::Result<Vec<i64>> {
        Ok(features
            .iter()
            .map(|f| {
                let [_, amount, old_balance, _] = f.as_slice() else {
                    return 0;
                };
                i64::from(*amount > 0.0 && *amount >= *old_balance)
            })
            .collect())
    }
}

#[test]
fn test_session_history_across_modes() {
    let service = PredictionService::new(DrainRule);
    let mut session = SessionState::new();

    let drained = TransactionRecord::new(TransactionType::Transfer, 181.0, 181.0, 0.0);
    let routine = TransactionRecord::new(TransactionType::Payment, 9839.64, 170136.0, 160296.36);
    let negative = TransactionRecord::new(TransactionType::CashIn, -10.0, 0.0, 0.0);

    assert_eq!(
        service.predict_one(&mut session, &drained).unwrap().label,
        FraudLabel::Fraudulent
    );
    assert_eq!(
        service.predict_one(&mut session, &routine).unwrap().label,
        FraudLabel::NotFraudulent
    );
    assert!(matches!(
        service.predict_one(&mut session, &negative),
        Err(ScreenError::Validation { .. })
    ));
    assert_eq!(session.log().len(), 2);

    let csv = "\
step,type,amount,nameOrig,oldbalanceOrg,newbalanceOrig,nameDest,oldbalanceDest,newbalanceDest,isFraud
1,PAYMENT,9839.64,C1231006815,170136.0,160296.36,M1979787155,0.0,0.0,0
1,TRANSFER,181.0,C1305486145,181.0,0.0,C553264065,0.0,0.0,1
1,0.25,181.0,C840083671,181.0,0.0,C38997010,21182.0,0.0,1
1,CASH_BACK,11668.14,C2048537720,41554.0,29885.86,M1230701703,0.0,0.0,0
";

    let result = service
        .predict_batch(&mut session, csv.as_bytes(), "paysim_head.csv")
        .unwrap();

    assert_eq!(result.total_count, 4);
    assert_eq!(result.fraud_count, 2);
    assert_eq!(result.flagged.len(), 1);
    assert_eq!(result.flagged[0].row, 4);

    let labels = result.table.label_column();
    assert_eq!(labels, vec!["Not Fraudulent", "Fraudulent", "Fraudulent", ""]);
    assert_eq!(
        labels.iter().filter(|l| **l == "Fraudulent").count(),
        result.fraud_count
    );

    // Existing isFraud column is replaced, not duplicated
    let header = result.table.headers();
    assert_eq!(header.iter().filter(|h| *h == "isFraud").count(), 1);
    assert_eq!(result.table.rows()[2][3], "C840083671");

    let entries = session.log().list();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].mode(), PredictionMode::Individual);
    assert_eq!(entries[2].mode(), PredictionMode::Batch);

    let history = String::from_utf8(session.log().export_csv().unwrap()).unwrap();
    assert_eq!(history.lines().count(), 4);
    assert!(history.lines().nth(3).unwrap().contains("paysim_head.csv,4,2"));

    let log = session.end();
    assert_eq!(log.len(), 3);
}
