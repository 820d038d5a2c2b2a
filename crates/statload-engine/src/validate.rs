//! Pre-write record validation.

use serde::Serialize;
use statload_types::error::{FailedRecord, ValidationIssue};
use statload_types::record::Record;
use tracing::warn;

/// A record that failed validation, with every issue found.
#[derive(Debug)]
pub struct Rejected<R> {
    pub record: R,
    pub issues: Vec<ValidationIssue>,
}

impl<R> Rejected<R> {
    /// All issues joined into one reason line.
    #[must_use]
    pub fn reason(&self) -> String {
        self.issues
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl<R: Serialize> Rejected<R> {
    /// Convert into the persistable failed-record form.
    #[must_use]
    pub fn into_failed(self) -> FailedRecord {
        let reason = self.reason();
        let record = serde_json::to_value(&self.record)
            .unwrap_or_else(|e| serde_json::json!({ "unserializable": e.to_string() }));
        FailedRecord { record, reason }
    }
}

/// Split records into valid and rejected sets, preserving input order
/// within each. Every issue on a record is reported, not just the first.
pub fn validate_records<R: Record>(records: Vec<R>) -> (Vec<R>, Vec<Rejected<R>>) {
    let mut valid = Vec::with_capacity(records.len());
    let mut rejected = Vec::new();
    for record in records {
        let issues = record.validate();
        if issues.is_empty() {
            valid.push(record);
        } else {
            warn!(
                key = %record.key_display(),
                table = record.table().name,
                issues = issues.len(),
                "rejecting invalid record"
            );
            rejected.push(Rejected { record, issues });
        }
    }
    (valid, rejected)
}
