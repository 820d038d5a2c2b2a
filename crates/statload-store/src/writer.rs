//! Storage traits the engine writes through.

use statload_types::error::{FailedRecord, WriteError};
use statload_types::op::{OperationId, RunStatus};
use statload_types::record::{SqlValue, TableSpec, WriteClause};

/// Destination for bulk row writes.
///
/// Implementations take `&self` and guard interior state themselves so
/// a single writer can be shared across the coordinator and run log.
pub trait TableWriter: Send + Sync {
    /// Open a write transaction for `table`, creating it if needed.
    fn begin_table(&self, table: &TableSpec) -> Result<(), WriteError>;

    /// Write one batch of rows, each in `table.columns` order.
    ///
    /// A batch is atomic: on error no row from it is visible. Returns
    /// the number of rows the store actually changed, which may be
    /// lower than `rows.len()` under conflict-ignoring clauses.
    fn write_batch(
        &self,
        table: &TableSpec,
        clause: &WriteClause,
        rows: &[Vec<SqlValue>],
    ) -> Result<u64, WriteError>;

    /// Make everything written so far durable and reopen the
    /// transaction.
    fn checkpoint(&self, table: &TableSpec) -> Result<(), WriteError>;

    /// Commit the open transaction for `table`.
    fn commit_table(&self, table: &TableSpec) -> Result<(), WriteError>;

    /// Discard the uncommitted tail of the transaction for `table`.
    fn rollback_table(&self, table: &TableSpec) -> Result<(), WriteError>;
}

/// Persistent history of ingest runs and their rejected records.
pub trait RunLog: Send + Sync {
    /// Record the start of a table's sub-operation; returns a run row id.
    fn start_run(&self, op: &OperationId, table: &str) -> Result<i64, WriteError>;

    /// Finalize a run row with its outcome counts.
    fn complete_run(
        &self,
        run_id: i64,
        status: RunStatus,
        succeeded: u64,
        failed: u64,
    ) -> Result<(), WriteError>;

    /// Persist records that were rejected or exhausted their retries,
    /// so they can be inspected and replayed later.
    fn record_failures(&self, run_id: i64, failures: &[FailedRecord]) -> Result<(), WriteError>;
}

/// One row of run history, as read back for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub run_id: i64,
    pub operation_id: String,
    pub table_name: String,
    pub status: String,
    pub succeeded: u64,
    pub failed: u64,
    pub started_at: String,
    pub finished_at: Option<String>,
}
