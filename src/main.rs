//! Fraud Screening - Main Entry Point
//!
//! Loads the classifier, opens a session and screens transactions given on
//! the command line, from a batch file, or interactively from stdin.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fraud_screen::{
    batch::BatchResult,
    commands::{Command, HELP},
    config::{AppConfig, LoggingConfig, DEFAULT_CONFIG_PATH},
    types::HistoryDetail,
    Classifier, FraudLabel, OnnxClassifier, PredictionResult, PredictionService, SessionLog,
    SessionState, TransactionRecord, TransactionType,
};
use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Flagged rows listed before the output is truncated
const MAX_LISTED_ISSUES: usize = 20;

#[derive(Parser, Debug)]
#[command(author, version, about = "Screen payment transactions for fraud", long_about = None)]
struct Cli {
    /// Configuration file (built-in defaults are used when it does not exist)
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// ONNX model path, overrides the configuration
    #[arg(long)]
    model: Option<String>,

    /// Write the session history as CSV to this path on exit
    #[arg(long)]
    history: Option<PathBuf>,

    #[command(subcommand)]
    command: Mode,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Screen a single transaction
    Predict {
        /// CASH_IN, CASH_OUT, DEBIT, PAYMENT or TRANSFER
        #[arg(long = "type")]
        transaction_type: TransactionType,

        #[arg(long, allow_negative_numbers = true)]
        amount: f64,

        /// Originating balance before the transaction
        #[arg(long, allow_negative_numbers = true)]
        old_balance: f64,

        /// Balance after the transaction
        #[arg(long, allow_negative_numbers = true)]
        new_balance: f64,
    },

    /// Screen a CSV batch file
    Batch {
        /// CSV with columns type, amount, oldbalanceOrg, newbalanceDest
        file: PathBuf,

        /// Where to write the predictions (default from configuration)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Interactive session reading commands from stdin
    Session,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = AppConfig::load_if_exists(&cli.config)?;
    let from_file = loaded.is_some();
    let mut config = loaded.unwrap_or_default();
    if let Some(model) = &cli.model {
        config.model.path = model.clone();
    }

    init_logging(&config.logging)?;
    info!("Starting fraud screening");
    if !from_file {
        info!(path = %cli.config.display(), "No configuration file, using defaults");
    }

    let classifier = OnnxClassifier::new(&config.model)?;
    info!(model = %classifier.name(), "Classifier ready");

    let service = PredictionService::new(classifier);
    let mut session = SessionState::new();

    let outcome = match cli.command {
        Mode::Predict {
            transaction_type,
            amount,
            old_balance,
            new_balance,
        } => {
            let record = TransactionRecord::new(transaction_type, amount, old_balance, new_balance);
            service
                .predict_one(&mut session, &record)
                .map(|result| print_verdict(&result))
                .map_err(anyhow::Error::from)
        }
        Mode::Batch { file, output } => {
            let output = output.unwrap_or_else(|| PathBuf::from(&config.export.predictions_file));
            run_batch(&service, &mut session, &file, &output)
        }
        Mode::Session => run_session(&service, &mut session, &config),
    };

    let log = session.end();
    if let Some(path) = &cli.history {
        write_history(&log, path)?;
    }

    outcome
}

fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("fraud_screen={}", config.level).parse()?);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);

    if config.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }

    Ok(())
}

fn run_batch<C: Classifier>(
    service: &PredictionService<C>,
    session: &mut SessionState,
    file: &Path,
    output: &Path,
) -> Result<()> {
    // Destination must be writable before the batch is logged
    let out = File::create(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;

    let result = match service.predict_batch_file(session, file) {
        Ok(result) => result,
        Err(e) => {
            drop(out);
            let _ = std::fs::remove_file(output);
            return Err(e).with_context(|| format!("Failed to screen {}", file.display()));
        }
    };

    result.table.write_csv(BufWriter::new(out)).with_context(|| {
        format!(
            "Batch screened and logged, but writing {} failed",
            output.display()
        )
    })?;

    print_batch(&result, output);
    Ok(())
}

fn run_session<C: Classifier>(
    service: &PredictionService<C>,
    session: &mut SessionState,
    config: &AppConfig,
) -> Result<()> {
    println!("Online Payment Fraud Detection - session {}", session.id());
    println!("{HELP}");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;

        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };

        match command {
            Command::Predict(record) => match service.predict_one(session, &record) {
                Ok(result) => print_verdict(&result),
                Err(e) => {
                    warn!(error = %e, "Prediction rejected");
                    println!("{e}");
                }
            },
            Command::Batch { path, output } => {
                let output =
                    output.unwrap_or_else(|| PathBuf::from(&config.export.predictions_file));
                if let Err(e) = run_batch(service, session, &path, &output) {
                    error!(error = %e, "Batch failed");
                    println!("Upload Error: {e:#}");
                }
            }
            Command::History => print_history(session.log()),
            Command::Export(path) => {
                if let Err(e) = write_history(session.log(), &path) {
                    println!("{e:#}");
                }
            }
            Command::Help => println!("{HELP}"),
            Command::Quit => break,
        }
    }

    Ok(())
}

fn write_history(log: &SessionLog, path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    log.write_csv(BufWriter::new(file))?;
    info!(path = %path.display(), entries = log.len(), "History exported");
    println!("History ({} entries) written to {}", log.len(), path.display());
    Ok(())
}

fn print_verdict(result: &PredictionResult) {
    match result.label {
        FraudLabel::Fraudulent => {
            println!("Fraudulent Transaction Detected");
            println!("  This transaction has been flagged as potentially fraudulent.");
        }
        FraudLabel::NotFraudulent => {
            println!("Safe Transaction");
            println!("  This transaction appears to be legitimate.");
        }
    }
}

fn print_batch(result: &BatchResult, output: &Path) {
    println!("Total Transactions:      {}", result.total_count);
    println!("Fraudulent Transactions: {}", result.fraud_count);

    let classified = result.classified_count();
    if classified > 0 {
        let fraud_pct = result.fraud_rate() * 100.0;
        println!(
            "Transaction Fraud Distribution: Fraudulent {:.1}% | Legitimate {:.1}%",
            fraud_pct,
            100.0 - fraud_pct
        );
    }

    if !result.flagged.is_empty() {
        println!("Rows not classified: {}", result.flagged.len());
        for issue in result.flagged.iter().take(MAX_LISTED_ISSUES) {
            println!("  {issue}");
        }
        if result.flagged.len() > MAX_LISTED_ISSUES {
            println!("  ... and {} more", result.flagged.len() - MAX_LISTED_ISSUES);
        }
    }

    println!("Predictions written to {}", output.display());
}

fn print_history(log: &SessionLog) {
    if log.is_empty() {
        println!("No history available.");
        return;
    }

    for entry in log.list() {
        let when = entry.timestamp.format("%Y-%m-%d %H:%M:%S");
        match &entry.detail {
            HistoryDetail::Individual { record, label } => println!(
                "{when}  Individual  {:<8} amount={:.2} old={:.2} new={:.2}  {label}",
                record.transaction_type, record.amount, record.old_balance, record.new_balance
            ),
            HistoryDetail::Batch {
                source,
                total_count,
                fraud_count,
            } => println!(
                "{when}  Batch       {source}  records={total_count} fraudulent={fraud_count}"
            ),
        }
    }
}
