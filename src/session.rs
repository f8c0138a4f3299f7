//! Session state and the session history log.
//!
//! A `SessionState` is created when a user session starts and consumed when
//! it ends. It is passed explicitly into every prediction call; nothing about
//! a session lives in process-wide state, and nothing is persisted.

use crate::error::ScreenResult;
use crate::metrics::SessionMetrics;
use crate::types::history::{HistoryDetail, HistoryEntry};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::io::Write;
use tracing::info;
use uuid::Uuid;

/// Column order of the history export
pub const HISTORY_COLUMNS: [&str; 10] = [
    "timestamp",
    "type",
    "transaction_type",
    "amount",
    "old_balance_orig",
    "new_balance_orig",
    "prediction",
    "file_name",
    "num_records",
    "fraud_count",
];

/// Flattened history entry; fields that do not apply to the entry's mode stay empty.
#[derive(Serialize)]
struct HistoryRow<'a> {
    timestamp: String,
    #[serde(rename = "type")]
    mode: &'static str,
    transaction_type: Option<&'static str>,
    amount: Option<f64>,
    old_balance_orig: Option<f64>,
    new_balance_orig: Option<f64>,
    prediction: Option<&'static str>,
    file_name: Option<&'a str>,
    num_records: Option<usize>,
    fraud_count: Option<usize>,
}

impl<'a> From<&'a HistoryEntry> for HistoryRow<'a> {
    fn from(entry: &'a HistoryEntry) -> Self {
        let mut row = HistoryRow {
            timestamp: entry.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
            mode: entry.mode().as_str(),
            transaction_type: None,
            amount: None,
            old_balance_orig: None,
            new_balance_orig: None,
            prediction: None,
            file_name: None,
            num_records: None,
            fraud_count: None,
        };

        match &entry.detail {
            HistoryDetail::Individual { record, label } => {
                row.transaction_type = Some(record.transaction_type.as_str());
                row.amount = Some(record.amount);
                row.old_balance_orig = Some(record.old_balance);
                row.new_balance_orig = Some(record.new_balance);
                row.prediction = Some(label.as_str());
            }
            HistoryDetail::Batch {
                source,
                total_count,
                fraud_count,
            } => {
                row.file_name = Some(source.as_str());
                row.num_records = Some(*total_count);
                row.fraud_count = Some(*fraud_count);
            }
        }

        row
    }
}

/// Append-only, insertion-ordered log of prediction events
#[derive(Debug, Default)]
pub struct SessionLog {
    entries: Vec<HistoryEntry>,
}

impl SessionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
    }

    /// Entries oldest first
    pub fn list(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write all entries as CSV. The header is written even when the log is empty.
    pub fn write_csv<W: Write>(&self, writer: W) -> ScreenResult<()> {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);

        wtr.write_record(HISTORY_COLUMNS)?;
        for entry in &self.entries {
            wtr.serialize(HistoryRow::from(entry))?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn export_csv(&self) -> ScreenResult<Vec<u8>> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf)?;
        Ok(buf)
    }

    /// JSON array of entries, oldest first
    pub fn export_json(&self) -> ScreenResult<String> {
        Ok(serde_json::to_string_pretty(&self.entries)?)
    }
}

/// State owned by one user session
#[derive(Debug)]
pub struct SessionState {
    id: Uuid,
    started_at: DateTime<Utc>,
    log: SessionLog,
    metrics: SessionMetrics,
}

impl SessionState {
    /// Start a new session
    pub fn new() -> Self {
        let state = Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            log: SessionLog::new(),
            metrics: SessionMetrics::new(),
        };
        info!(session_id = %state.id, "Session started");
        state
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn log(&self) -> &SessionLog {
        &self.log
    }

    pub fn metrics(&self) -> &SessionMetrics {
        &self.metrics
    }

    pub(crate) fn log_mut(&mut self) -> &mut SessionLog {
        &mut self.log
    }

    pub(crate) fn metrics_mut(&mut self) -> &mut SessionMetrics {
        &mut self.metrics
    }

    /// End the session, returning its log for a final export
    pub fn end(self) -> SessionLog {
        info!(
            session_id = %self.id,
            entries = self.log.len(),
            "Session ended"
        );
        self.metrics.print_summary();
        self.log
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
