//! Sample Batch Generator
//!
//! Writes a synthetic batch CSV for exercising the batch screening path.
//!
//! Usage: sample-batch [OUTPUT] [COUNT] [FRAUD_RATE] [--legacy]

use anyhow::{Context, Result};
use fraud_screen::TransactionType;
use rand::Rng;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use tracing::info;

/// One batch row; `type` is written either as a name or as a legacy code
#[derive(Debug, Serialize)]
struct SampleRow {
    #[serde(rename = "type")]
    transaction_type: String,
    amount: f64,
    #[serde(rename = "oldbalanceOrg")]
    old_balance_org: f64,
    #[serde(rename = "newbalanceOrig")]
    new_balance_orig: f64,
    #[serde(rename = "oldbalanceDest")]
    old_balance_dest: f64,
    #[serde(rename = "newbalanceDest")]
    new_balance_dest: f64,
}

/// Row generator for testing
struct RowGenerator {
    rng: rand::rngs::ThreadRng,
    legacy_codes: bool,
}

impl RowGenerator {
    fn new(legacy_codes: bool) -> Self {
        Self {
            rng: rand::thread_rng(),
            legacy_codes,
        }
    }

    /// Generate an everyday payment or deposit
    fn generate_legitimate(&mut self) -> SampleRow {
        let kind = self.random_choice(&[
            TransactionType::Payment,
            TransactionType::CashIn,
            TransactionType::Debit,
            TransactionType::CashOut,
        ]);
        let amount = round2(self.rng.gen_range(5.0..2_000.0));
        let old_balance_org = round2(self.rng.gen_range(amount..amount + 50_000.0));
        let old_balance_dest = round2(self.rng.gen_range(0.0..100_000.0));

        let (new_balance_orig, new_balance_dest) = match kind {
            TransactionType::CashIn => (old_balance_org + amount, (old_balance_dest - amount).max(0.0)),
            _ => (old_balance_org - amount, old_balance_dest + amount),
        };

        self.row(kind, amount, old_balance_org, new_balance_orig, old_balance_dest, new_balance_dest)
    }

    /// Generate an account-draining transfer or cash-out
    fn generate_suspicious(&mut self) -> SampleRow {
        let kind = self.random_choice(&[TransactionType::Transfer, TransactionType::CashOut]);
        let amount = round2(self.rng.gen_range(50_000.0..5_000_000.0));

        // Whole balance moved out, destination balance left untouched
        self.row(kind, amount, amount, 0.0, 0.0, 0.0)
    }

    fn row(
        &self,
        kind: TransactionType,
        amount: f64,
        old_balance_org: f64,
        new_balance_orig: f64,
        old_balance_dest: f64,
        new_balance_dest: f64,
    ) -> SampleRow {
        let transaction_type = if self.legacy_codes {
            kind.legacy_code().to_string()
        } else {
            kind.to_string()
        };

        SampleRow {
            transaction_type,
            amount,
            old_balance_org,
            new_balance_orig: round2(new_balance_orig),
            old_balance_dest,
            new_balance_dest: round2(new_balance_dest),
        }
    }

    fn random_choice(&mut self, choices: &[TransactionType]) -> TransactionType {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sample_batch=info".parse()?),
        )
        .init();

    let legacy_codes = std::env::args().any(|a| a == "--legacy");
    let args: Vec<String> = std::env::args().filter(|a| a != "--legacy").collect();
    let output = args.get(1).map(|s| s.as_str()).unwrap_or("sample_batch.csv");
    let count: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(100);
    let fraud_rate: f64 = args
        .get(3)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.1_f64)
        .clamp(0.0, 1.0);

    info!(
        output = %output,
        count = count,
        fraud_rate = fraud_rate,
        legacy_codes = legacy_codes,
        "Configuration loaded"
    );

    let file = File::create(output).with_context(|| format!("Failed to create {output}"))?;
    let mut wtr = csv::Writer::from_writer(BufWriter::new(file));

    let mut generator = RowGenerator::new(legacy_codes);
    let mut rng = rand::thread_rng();

    let mut legitimate_count = 0;
    let mut suspicious_count = 0;

    for _ in 0..count {
        let row = if rng.gen_bool(fraud_rate) {
            suspicious_count += 1;
            generator.generate_suspicious()
        } else {
            legitimate_count += 1;
            generator.generate_legitimate()
        };
        wtr.serialize(&row)?;
    }
    wtr.flush()?;

    info!(
        "Completed! Wrote {} rows to {} ({} legitimate, {} suspicious)",
        count, output, legitimate_count, suspicious_count
    );

    Ok(())
}
