//! Per-session statistics.

use std::time::{Duration, Instant};
use tracing::info;

/// Counters and timings for one session
#[derive(Debug)]
pub struct SessionMetrics {
    /// Single-record predictions
    pub individual_predictions: u64,
    /// Batch files processed
    pub batch_uploads: u64,
    /// Rows (individual or batch) that received a verdict
    pub rows_classified: u64,
    /// Batch rows that could not be encoded
    pub rows_flagged: u64,
    /// Verdicts that were Fraudulent
    pub fraud_verdicts: u64,
    /// Request processing times (in microseconds)
    processing_times: Vec<u64>,
    /// Session start for rate calculation
    start_time: Instant,
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self {
            individual_predictions: 0,
            batch_uploads: 0,
            rows_classified: 0,
            rows_flagged: 0,
            fraud_verdicts: 0,
            processing_times: Vec::new(),
            start_time: Instant::now(),
        }
    }

    /// Record a single-record prediction
    pub fn record_individual(&mut self, processing_time: Duration, is_fraud: bool) {
        self.individual_predictions += 1;
        self.rows_classified += 1;
        if is_fraud {
            self.fraud_verdicts += 1;
        }
        self.processing_times.push(processing_time.as_micros() as u64);
    }

    /// Record a batch prediction
    pub fn record_batch(
        &mut self,
        processing_time: Duration,
        classified: usize,
        flagged: usize,
        fraud: usize,
    ) {
        self.batch_uploads += 1;
        self.rows_classified += classified as u64;
        self.rows_flagged += flagged as u64;
        self.fraud_verdicts += fraud as u64;
        self.processing_times.push(processing_time.as_micros() as u64);
    }

    /// Get processing time statistics
    pub fn processing_stats(&self) -> ProcessingStats {
        if self.processing_times.is_empty() {
            return ProcessingStats::default();
        }

        let mut sorted = self.processing_times.clone();
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();
        let pct = |p: f64| sorted[((count as f64 * p) as usize).min(count - 1)];

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: pct(0.95),
            p99_us: pct(0.99),
            max_us: *sorted.last().unwrap_or(&0),
        }
    }

    /// Share of classified rows that were Fraudulent
    pub fn fraud_rate(&self) -> f64 {
        if self.rows_classified > 0 {
            self.fraud_verdicts as f64 / self.rows_classified as f64
        } else {
            0.0
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let processing = self.processing_stats();

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║               FRAUD SCREENING - SESSION SUMMARY              ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Individual Predictions: {:>8}  │  Batch Uploads: {:>8}  ║",
            self.individual_predictions, self.batch_uploads
        );
        info!(
            "║ Rows Classified:        {:>8}  │  Rows Flagged:  {:>8}  ║",
            self.rows_classified, self.rows_flagged
        );
        info!(
            "║ Fraudulent Verdicts:    {:>8}  │  Fraud Rate:    {:>7.1}%  ║",
            self.fraud_verdicts,
            self.fraud_rate() * 100.0
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Processing Time (μs): mean={:>5} p50={:>5} p95={:>5} p99={:>5} ║",
            processing.mean_us, processing.p50_us, processing.p95_us, processing.p99_us
        );
        info!(
            "║ Session Duration: {:>8.1}s                                   ║",
            self.elapsed().as_secs_f64()
        );
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

impl Default for SessionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics
#[derive(Debug, Default, PartialEq)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}
