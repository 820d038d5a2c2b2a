//! In-memory writer used to script failures and observe call patterns
//! in engine tests.

use std::collections::HashMap;
use std::sync::Mutex;

use statload_types::error::{FailedRecord, WriteError};
use statload_types::op::{OperationId, RunStatus};
use statload_types::record::{SqlValue, TableSpec, WriteClause};

use crate::writer::{RunLog, TableWriter};

#[derive(Default)]
struct Inner {
    rows: HashMap<String, Vec<Vec<SqlValue>>>,
    // Errors popped front-first on each write_batch call for the table.
    scripted: HashMap<String, Vec<WriteError>>,
    scripted_begins: HashMap<String, Vec<WriteError>>,
    scripted_checkpoints: HashMap<String, Vec<WriteError>>,
    scripted_commits: HashMap<String, Vec<WriteError>>,
    begins: u64,
    checkpoints: u64,
    commits: u64,
    rollbacks: u64,
    runs: Vec<(String, String, RunStatus, u64, u64)>,
    failures: Vec<(i64, FailedRecord)>,
}

fn pop_scripted(queue: &mut HashMap<String, Vec<WriteError>>, table: &str) -> Option<WriteError> {
    queue
        .get_mut(table)
        .and_then(|q| if q.is_empty() { None } else { Some(q.remove(0)) })
}

/// Scriptable [`TableWriter`] and [`RunLog`] for tests.
#[derive(Default)]
pub struct MemoryWriter {
    inner: Mutex<Inner>,
}

impl MemoryWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an error for the next `write_batch` call against `table`.
    /// Queued errors are consumed in order before any write succeeds.
    pub fn queue_failure(&self, table: &str, err: WriteError) {
        let mut inner = self.lock();
        inner.scripted.entry(table.to_owned()).or_default().push(err);
    }

    /// Queue an error for the next `begin_table` call against `table`.
    pub fn queue_begin_failure(&self, table: &str, err: WriteError) {
        let mut inner = self.lock();
        inner
            .scripted_begins
            .entry(table.to_owned())
            .or_default()
            .push(err);
    }

    /// Queue an error for the next `checkpoint` call against `table`.
    pub fn queue_checkpoint_failure(&self, table: &str, err: WriteError) {
        let mut inner = self.lock();
        inner
            .scripted_checkpoints
            .entry(table.to_owned())
            .or_default()
            .push(err);
    }

    /// Queue an error for the next `commit_table` call against `table`.
    pub fn queue_commit_failure(&self, table: &str, err: WriteError) {
        let mut inner = self.lock();
        inner
            .scripted_commits
            .entry(table.to_owned())
            .or_default()
            .push(err);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // Recover the guard if a test thread panicked mid-write.
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Rows written (and not rolled back) for a table.
    #[must_use]
    pub fn rows(&self, table: &str) -> Vec<Vec<SqlValue>> {
        self.lock().rows.get(table).cloned().unwrap_or_default()
    }

    #[must_use]
    pub fn begin_count(&self) -> u64 {
        self.lock().begins
    }

    #[must_use]
    pub fn checkpoint_count(&self) -> u64 {
        self.lock().checkpoints
    }

    #[must_use]
    pub fn commit_count(&self) -> u64 {
        self.lock().commits
    }

    #[must_use]
    pub fn rollback_count(&self) -> u64 {
        self.lock().rollbacks
    }

    /// Completed run rows as (operation, table, status, succeeded, failed).
    #[must_use]
    pub fn completed_runs(&self) -> Vec<(String, String, RunStatus, u64, u64)> {
        self.lock().runs.clone()
    }

    /// Failures persisted through the run log.
    #[must_use]
    pub fn logged_failures(&self) -> Vec<(i64, FailedRecord)> {
        self.lock().failures.clone()
    }
}

impl TableWriter for MemoryWriter {
    fn begin_table(&self, table: &TableSpec) -> Result<(), WriteError> {
        let mut inner = self.lock();
        if let Some(err) = pop_scripted(&mut inner.scripted_begins, table.name) {
            return Err(err);
        }
        inner.begins += 1;
        Ok(())
    }

    fn write_batch(
        &self,
        table: &TableSpec,
        _clause: &WriteClause,
        rows: &[Vec<SqlValue>],
    ) -> Result<u64, WriteError> {
        let mut inner = self.lock();
        if let Some(queue) = inner.scripted.get_mut(table.name) {
            if !queue.is_empty() {
                return Err(queue.remove(0));
            }
        }
        inner
            .rows
            .entry(table.name.to_owned())
            .or_default()
            .extend(rows.iter().cloned());
        Ok(rows.len() as u64)
    }

    fn checkpoint(&self, table: &TableSpec) -> Result<(), WriteError> {
        let mut inner = self.lock();
        if let Some(err) = pop_scripted(&mut inner.scripted_checkpoints, table.name) {
            return Err(err);
        }
        inner.checkpoints += 1;
        Ok(())
    }

    fn commit_table(&self, table: &TableSpec) -> Result<(), WriteError> {
        let mut inner = self.lock();
        if let Some(err) = pop_scripted(&mut inner.scripted_commits, table.name) {
            return Err(err);
        }
        inner.commits += 1;
        Ok(())
    }

    fn rollback_table(&self, table: &TableSpec) -> Result<(), WriteError> {
        let mut inner = self.lock();
        inner.rollbacks += 1;
        inner.rows.remove(table.name);
        Ok(())
    }
}

impl RunLog for MemoryWriter {
    fn start_run(&self, op: &OperationId, table: &str) -> Result<i64, WriteError> {
        let mut inner = self.lock();
        inner.runs.push((
            op.as_str().to_owned(),
            table.to_owned(),
            RunStatus::Running,
            0,
            0,
        ));
        Ok(inner.runs.len() as i64)
    }

    fn complete_run(
        &self,
        run_id: i64,
        status: RunStatus,
        succeeded: u64,
        failed: u64,
    ) -> Result<(), WriteError> {
        let mut inner = self.lock();
        let idx = usize::try_from(run_id.max(1) - 1)
            .map_err(|_| WriteError::internal("RUN_LOG", "bad run id"))?;
        let run = inner
            .runs
            .get_mut(idx)
            .ok_or_else(|| WriteError::internal("RUN_LOG", format!("unknown run id {run_id}")))?;
        run.2 = status;
        run.3 = succeeded;
        run.4 = failed;
        Ok(())
    }

    fn record_failures(&self, run_id: i64, failures: &[FailedRecord]) -> Result<(), WriteError> {
        let mut inner = self.lock();
        for failure in failures {
            inner.failures.push((run_id, failure.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use statload_types::record::PLAYERS;

    #[test]
    fn scripted_failures_pop_in_order() {
        let writer = MemoryWriter::new();
        writer.queue_failure("players", WriteError::transient_db("BUSY", "busy 1"));
        writer.queue_failure("players", WriteError::transient_db("BUSY", "busy 2"));
        let row = vec![vec![SqlValue::Integer(1)]];
        let e1 = writer
            .write_batch(&PLAYERS, &WriteClause::default(), &row)
            .unwrap_err();
        assert!(e1.message.contains("busy 1"));
        let e2 = writer
            .write_batch(&PLAYERS, &WriteClause::default(), &row)
            .unwrap_err();
        assert!(e2.message.contains("busy 2"));
        assert_eq!(
            writer
                .write_batch(&PLAYERS, &WriteClause::default(), &row)
                .unwrap(),
            1
        );
        assert_eq!(writer.rows("players").len(), 1);
    }

    #[test]
    fn rollback_clears_table_rows() {
        let writer = MemoryWriter::new();
        writer
            .write_batch(&PLAYERS, &WriteClause::default(), &[vec![SqlValue::Null]])
            .unwrap();
        writer.rollback_table(&PLAYERS).unwrap();
        assert!(writer.rows("players").is_empty());
    }
}
