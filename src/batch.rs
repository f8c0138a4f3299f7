//! Batch file parsing and the augmented prediction table.
//!
//! A batch upload is parsed once into a typed row sequence. Rows that cannot
//! be encoded are kept in place (so the output preserves input order) but are
//! flagged and never reach the classifier.

use crate::error::{ScreenError, ScreenResult};
use crate::feature_encoder::{FeatureEncoder, FEATURE_NAMES};
use crate::types::transaction::TransactionRecord;
use crate::types::verdict::FraudLabel;
use std::fmt;
use std::io::{Read, Write};

/// Columns a batch file must contain
pub const REQUIRED_COLUMNS: [&str; 4] = FEATURE_NAMES;

/// Column holding the derived verdict in the output table
pub const LABEL_COLUMN: &str = "isFraud";

/// Why a batch row was not classified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowIssueKind {
    /// `type` is neither a category name nor a legacy code
    UnknownCategory,
    /// Empty or non-numeric cell
    NotANumber,
    /// Negative or non-finite number
    OutOfRange,
}

impl fmt::Display for RowIssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RowIssueKind::UnknownCategory => "unknown transaction type",
            RowIssueKind::NotANumber => "not a number",
            RowIssueKind::OutOfRange => "must be a non-negative number",
        };
        f.write_str(s)
    }
}

/// A flagged batch row
#[derive(Debug, Clone, PartialEq)]
pub struct RowIssue {
    /// 1-based data row number (header excluded)
    pub row: usize,
    pub column: &'static str,
    pub value: String,
    pub kind: RowIssueKind,
}

impl fmt::Display for RowIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}: {} = {:?} ({})", self.row, self.column, self.value, self.kind)
    }
}

/// One input row: the raw cells and the parsed record, or why parsing failed.
#[derive(Debug, Clone)]
pub struct BatchRow {
    pub cells: Vec<String>,
    pub record: Result<TransactionRecord, RowIssue>,
}

/// Schema-checked batch input
#[derive(Debug, Clone)]
pub struct BatchTable {
    headers: Vec<String>,
    rows: Vec<BatchRow>,
}

impl BatchTable {
    /// Parse a CSV batch file.
    ///
    /// Fails with `Schema` before reading any row when a required column is
    /// missing. Row-level problems are recorded on the row instead.
    pub fn from_reader<R: Read>(reader: R, encoder: &FeatureEncoder) -> ScreenResult<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = decode_cells(rdr.byte_headers()?);

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|col| !headers.iter().any(|h| h == *col))
            .map(|col| col.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ScreenError::Schema { missing });
        }

        let index: Vec<usize> = REQUIRED_COLUMNS
            .iter()
            .filter_map(|col| headers.iter().position(|h| h == col))
            .collect();

        let mut rows = Vec::new();
        for (i, result) in rdr.byte_records().enumerate() {
            let cells = decode_cells(&result?);
            let parsed = parse_row(i + 1, &cells, &index, encoder);
            rows.push(BatchRow {
                cells,
                record: parsed,
            });
        }

        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[BatchRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Attach one verdict per row (`None` for flagged rows).
    ///
    /// An existing `isFraud` column is overwritten in place; otherwise the
    /// column is appended. Rows are padded or cut to the header width first.
    pub fn augment(self, labels: &[Option<FraudLabel>]) -> AugmentedTable {
        let mut headers = self.headers;
        let width = headers.len();
        let label_index = match headers.iter().position(|h| h == LABEL_COLUMN) {
            Some(idx) => idx,
            None => {
                headers.push(LABEL_COLUMN.to_string());
                headers.len() - 1
            }
        };

        let rows = self
            .rows
            .into_iter()
            .zip(labels.iter())
            .map(|(row, label)| {
                let mut cells = row.cells;
                cells.resize(width, String::new());
                let value = label.map(|l| l.as_str().to_string()).unwrap_or_default();
                if label_index < cells.len() {
                    cells[label_index] = value;
                } else {
                    cells.push(value);
                }
                cells
            })
            .collect();

        AugmentedTable {
            headers,
            rows,
            label_index,
        }
    }
}

/// Cells that are not valid UTF-8 are decoded lossily and fail later as
/// unknown categories or non-numbers.
fn decode_cells(record: &csv::ByteRecord) -> Vec<String> {
    record
        .iter()
        .map(|field| String::from_utf8_lossy(field).into_owned())
        .collect()
}

fn parse_row(
    row: usize,
    cells: &[String],
    index: &[usize],
    encoder: &FeatureEncoder,
) -> Result<TransactionRecord, RowIssue> {
    let cell = move |i: usize| cells.get(index[i]).map(String::as_str).unwrap_or("");

    let transaction_type = encoder.decode_batch_type(cell(0)).map_err(|_| RowIssue {
        row,
        column: REQUIRED_COLUMNS[0],
        value: cell(0).to_string(),
        kind: RowIssueKind::UnknownCategory,
    })?;

    let mut amounts = [0.0; 3];
    for (slot, i) in amounts.iter_mut().zip(1..REQUIRED_COLUMNS.len()) {
        *slot = parse_amount(cell(i)).map_err(|kind| RowIssue {
            row,
            column: REQUIRED_COLUMNS[i],
            value: cell(i).to_string(),
            kind,
        })?;
    }

    Ok(TransactionRecord::new(
        transaction_type,
        amounts[0],
        amounts[1],
        amounts[2],
    ))
}

fn parse_amount(raw: &str) -> Result<f64, RowIssueKind> {
    let value: f64 = raw.trim().parse().map_err(|_| RowIssueKind::NotANumber)?;
    if !value.is_finite() || value < 0.0 {
        return Err(RowIssueKind::OutOfRange);
    }
    Ok(value)
}

/// Batch input with the derived `isFraud` column
#[derive(Debug, Clone)]
pub struct AugmentedTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    label_index: usize,
}

impl AugmentedTable {
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of the `isFraud` column in row order (empty for flagged rows)
    pub fn label_column(&self) -> Vec<&str> {
        self.rows
            .iter()
            .map(|r| r.get(self.label_index).map(String::as_str).unwrap_or(""))
            .collect()
    }

    /// Write the table as CSV, header first.
    pub fn write_csv<W: Write>(&self, writer: W) -> ScreenResult<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.headers)?;
        for row in &self.rows {
            wtr.write_record(row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn to_csv(&self) -> ScreenResult<Vec<u8>> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf)?;
        Ok(buf)
    }
}

/// Outcome of a batch prediction
#[derive(Debug, Clone)]
pub struct BatchResult {
    /// Input rows with the verdict column
    pub table: AugmentedTable,
    /// Number of input rows
    pub total_count: usize,
    /// Rows labelled Fraudulent
    pub fraud_count: usize,
    /// Rows that were not classified, in row order
    pub flagged: Vec<RowIssue>,
}

impl BatchResult {
    /// Rows that received a verdict
    pub fn classified_count(&self) -> usize {
        self.total_count - self.flagged.len()
    }

    pub fn legitimate_count(&self) -> usize {
        self.classified_count() - self.fraud_count
    }

    /// Share of classified rows labelled Fraudulent (0.0 when none were classified)
    pub fn fraud_rate(&self) -> f64 {
        let classified = self.classified_count();
        if classified > 0 {
            self.fraud_count as f64 / classified as f64
        } else {
            0.0
        }
    }
}
