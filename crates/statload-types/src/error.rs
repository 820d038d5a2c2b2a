//! Structured error model for bulk write operations.
//!
//! [`WriteError`] carries classification and retry metadata. Construct
//! via category-specific factory methods; retry decisions pattern-match
//! on [`ErrorCategory`] / the `retryable` flag, never on message text.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Broad classification of a write-path error.
///
/// Determines default retry behavior and operator-facing categorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Invalid bulk-operation configuration; surfaced before any write.
    Config,
    /// A record failed validation rules (record scope, never retried).
    Validation,
    /// Transient network error (retryable).
    TransientNetwork,
    /// Transient database error, e.g. busy/locked (retryable).
    TransientDb,
    /// Constraint violation not covered by the conflict strategy.
    Constraint,
    /// Internal store or engine error.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Config => "config",
            Self::Validation => "validation",
            Self::TransientNetwork => "transient_network",
            Self::TransientDb => "transient_db",
            Self::Constraint => "constraint",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// A single rule violation attached to a rejected record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// A record that could not be written, with the reason.
///
/// Appears in `BulkWriteResult::failed_records` and in the store's
/// failed-record table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedRecord {
    /// JSON rendering of the rejected/failed record.
    pub record: serde_json::Value,
    pub reason: String,
}

/// Structured error from a write operation.
///
/// Construct via category-specific factory methods
/// (e.g. [`WriteError::transient_db`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("[{category}] {code}: {message}")]
pub struct WriteError {
    pub category: ErrorCategory,
    pub code: String,
    pub message: String,
    pub retryable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl WriteError {
    fn new(
        category: ErrorCategory,
        retryable: bool,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            code: code.into(),
            message: message.into(),
            retryable,
            details: None,
        }
    }

    /// Configuration error (not retryable).
    #[must_use]
    pub fn config(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Config, false, code, message)
    }

    /// Record validation error (not retryable).
    #[must_use]
    pub fn validation(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Validation, false, code, message)
    }

    /// Transient network error (retryable).
    #[must_use]
    pub fn transient_network(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::TransientNetwork, true, code, message)
    }

    /// Transient database error (retryable).
    #[must_use]
    pub fn transient_db(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::TransientDb, true, code, message)
    }

    /// Constraint violation (not retryable).
    #[must_use]
    pub fn constraint(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Constraint, false, code, message)
    }

    /// Internal store/engine error (not retryable).
    #[must_use]
    pub fn internal(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Internal, false, code, message)
    }

    /// Attach structured diagnostic details.
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_defaults() {
        let err = WriteError::config("BAD_BATCH_SIZE", "batch size out of bounds");
        assert_eq!(err.category, ErrorCategory::Config);
        assert!(!err.retryable);
    }

    #[test]
    fn transient_errors_are_retryable() {
        assert!(WriteError::transient_db("BUSY", "database is locked").retryable);
        assert!(WriteError::transient_network("RESET", "connection reset").retryable);
    }

    #[test]
    fn constraint_is_fatal() {
        let err = WriteError::constraint("UNIQUE", "duplicate key");
        assert!(!err.retryable);
        assert_eq!(err.category, ErrorCategory::Constraint);
    }

    #[test]
    fn display_format() {
        let err = WriteError::transient_db("BUSY", "database is locked");
        assert_eq!(err.to_string(), "[transient_db] BUSY: database is locked");
    }

    #[test]
    fn serde_roundtrip() {
        let err = WriteError::constraint("UNIQUE", "duplicate key")
            .with_details(serde_json::json!({"table": "players"}));
        let json = serde_json::to_string(&err).unwrap();
        let back: WriteError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, back);
    }

    #[test]
    fn validation_issue_display() {
        let issue = ValidationIssue::new("season", "must be between 1920 and 2030");
        assert_eq!(issue.to_string(), "season: must be between 1920 and 2030");
    }
}
