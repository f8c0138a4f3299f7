//! Line commands accepted by the interactive session.

use crate::error::ScreenError;
use crate::types::transaction::{TransactionRecord, TransactionType};
use std::path::PathBuf;
use thiserror::Error;

pub const HELP: &str = "\
Commands:
  predict <TYPE> <AMOUNT> <OLD_BALANCE> <NEW_BALANCE>   screen one transaction
  batch <FILE> [OUTPUT]                                  screen a CSV batch file
  history                                                show the session history
  export <PATH>                                          write the history as CSV
  help                                                   show this message
  quit                                                   end the session

TYPE is one of CASH_IN, CASH_OUT, DEBIT, PAYMENT, TRANSFER.";

const PREDICT_USAGE: &str = "predict <TYPE> <AMOUNT> <OLD_BALANCE> <NEW_BALANCE>";
const BATCH_USAGE: &str = "batch <FILE> [OUTPUT]";
const EXPORT_USAGE: &str = "export <PATH>";

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Unknown command: {0} (type 'help' for a list)")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("{field} must be a number, got {value:?}")]
    NotANumber { field: &'static str, value: String },

    #[error(transparent)]
    Screen(#[from] ScreenError),
}

/// A parsed session command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Predict(TransactionRecord),
    Batch {
        path: PathBuf,
        output: Option<PathBuf>,
    },
    History,
    Export(PathBuf),
    Help,
    Quit,
}

impl Command {
    /// Parse one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = words.collect();

        let command = match verb.to_ascii_lowercase().as_str() {
            "predict" => {
                let [kind, amount, old, new] = args[..] else {
                    return Err(CommandError::Usage(PREDICT_USAGE));
                };
                Command::Predict(TransactionRecord::new(
                    kind.parse::<TransactionType>()?,
                    parse_number("amount", amount)?,
                    parse_number("old_balance", old)?,
                    parse_number("new_balance", new)?,
                ))
            }
            "batch" => match args[..] {
                [path] => Command::Batch {
                    path: PathBuf::from(path),
                    output: None,
                },
                [path, output] => Command::Batch {
                    path: PathBuf::from(path),
                    output: Some(PathBuf::from(output)),
                },
                _ => return Err(CommandError::Usage(BATCH_USAGE)),
            },
            "history" => Command::History,
            "export" => match args[..] {
                [path] => Command::Export(PathBuf::from(path)),
                _ => return Err(CommandError::Usage(EXPORT_USAGE)),
            },
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            _ => return Err(CommandError::Unknown(verb.to_string())),
        };

        Ok(Some(command))
    }
}

fn parse_number(field: &'static str, raw: &str) -> Result<f64, CommandError> {
    raw.parse().map_err(|_| CommandError::NotANumber {
        field,
        value: raw.to_string(),
    })
}
