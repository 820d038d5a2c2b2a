//! Per-table outcome accounting for a bulk write.

use chrono::{DateTime, Utc};
use serde::Serialize;
use statload_types::error::FailedRecord;

/// Running tally of a bulk write against one table.
#[derive(Debug, Clone, Serialize)]
pub struct BulkWriteResult {
    pub table_name: String,
    pub succeeded: u64,
    pub failed: u64,
    pub skipped: u64,
    /// Batches actually executed against the writer, whatever their
    /// outcome.
    pub batches_processed: u64,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    #[serde(skip)]
    pub failed_records: Vec<FailedRecord>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl BulkWriteResult {
    #[must_use]
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            succeeded: 0,
            failed: 0,
            skipped: 0,
            batches_processed: 0,
            errors: Vec::new(),
            warnings: Vec::new(),
            failed_records: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn add_success(&mut self, count: u64) {
        self.succeeded += count;
    }

    pub fn add_skipped(&mut self, count: u64) {
        self.skipped += count;
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Record one failed record, counting it toward `failed`.
    pub fn add_failure(&mut self, failure: FailedRecord) {
        self.failed += 1;
        self.failed_records.push(failure);
    }

    /// Stamp the completion time. Later calls keep the first stamp.
    pub fn mark_complete(&mut self) {
        if self.completed_at.is_none() {
            self.completed_at = Some(Utc::now());
        }
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.succeeded + self.failed + self.skipped
    }

    /// Fraction of processed records that succeeded, in percent.
    /// Zero when nothing was processed.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            (self.succeeded as f64 / total as f64) * 100.0
        }
    }

    /// Throughput over the measured window; zero until `mark_complete`
    /// and zero for instantaneous runs.
    #[must_use]
    pub fn records_per_second(&self) -> f64 {
        let Some(completed) = self.completed_at else {
            return 0.0;
        };
        let elapsed = (completed - self.started_at).num_milliseconds();
        if elapsed <= 0 {
            return 0.0;
        }
        self.total() as f64 / (elapsed as f64 / 1000.0)
    }

    /// True when every processed record succeeded and no batch errored.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.errors.is_empty()
    }
}
