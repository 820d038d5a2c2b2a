//! SQLite-backed table writer and run log.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, params_from_iter, Connection, ErrorCode};
use tracing::debug;

use statload_types::error::{FailedRecord, WriteError};
use statload_types::op::{OperationId, RunStatus};
use statload_types::record::{SqlValue, TableSpec, WriteClause};

use crate::writer::{RunLog, RunSummary, TableWriter};

/// SQLite caps a statement at 999 bound parameters by default; stay
/// under it when packing rows into one multi-value insert.
const MAX_INSERT_PARAMS: usize = 900;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS players (
    player_id      TEXT PRIMARY KEY,
    name           TEXT NOT NULL,
    profile_url    TEXT,
    position       TEXT,
    height_inches  INTEGER,
    weight_lbs     INTEGER,
    college        TEXT,
    scraped_at     TEXT NOT NULL,
    updated_at     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS passing_seasons (
    player_id             TEXT NOT NULL,
    season                INTEGER NOT NULL,
    team                  TEXT,
    games                 INTEGER,
    games_started         INTEGER,
    completions           INTEGER,
    attempts              INTEGER,
    completion_pct        REAL,
    yards                 INTEGER,
    touchdowns            INTEGER,
    interceptions         INTEGER,
    longest_pass          INTEGER,
    rating                REAL,
    sacks                 INTEGER,
    sack_yards            INTEGER,
    net_yards_per_attempt REAL,
    scraped_at            TEXT NOT NULL,
    updated_at            TEXT NOT NULL,
    PRIMARY KEY (player_id, season)
);

CREATE TABLE IF NOT EXISTS passing_splits (
    player_id       TEXT NOT NULL,
    season          INTEGER NOT NULL,
    split_kind      TEXT NOT NULL,
    split_value     TEXT NOT NULL,
    games           INTEGER,
    wins            INTEGER,
    losses          INTEGER,
    ties            INTEGER,
    completions     INTEGER,
    attempts        INTEGER,
    completion_pct  REAL,
    yards           INTEGER,
    touchdowns      INTEGER,
    interceptions   INTEGER,
    rating          REAL,
    sacks           INTEGER,
    rush_attempts   INTEGER,
    rush_yards      INTEGER,
    rush_touchdowns INTEGER,
    scraped_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    PRIMARY KEY (player_id, season, split_kind, split_value)
);

CREATE TABLE IF NOT EXISTS ingest_runs (
    run_id       INTEGER PRIMARY KEY AUTOINCREMENT,
    operation_id TEXT NOT NULL,
    table_name   TEXT NOT NULL,
    status       TEXT NOT NULL,
    succeeded    INTEGER NOT NULL DEFAULT 0,
    failed       INTEGER NOT NULL DEFAULT 0,
    started_at   TEXT NOT NULL DEFAULT (datetime('now')),
    finished_at  TEXT
);

CREATE TABLE IF NOT EXISTS failed_records (
    id       INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id   INTEGER NOT NULL,
    record   TEXT NOT NULL,
    reason   TEXT NOT NULL,
    added_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_failed_records_run ON failed_records(run_id);
";

/// Writer backed by a single SQLite connection.
///
/// Tables are written one at a time; the open transaction always
/// belongs to the table most recently passed to `begin_table`.
pub struct SqliteWriter {
    conn: Mutex<Connection>,
}

impl SqliteWriter {
    /// Open (or create) a database file and ensure the schema exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, WriteError> {
        let conn = Connection::open(path.as_ref()).map_err(classify)?;
        Self::init(conn)
    }

    /// In-memory database, used by tests and dry runs.
    pub fn open_in_memory() -> Result<Self, WriteError> {
        let conn = Connection::open_in_memory().map_err(classify)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, WriteError> {
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        conn.pragma_update(None, "synchronous", "NORMAL").ok();
        conn.execute_batch(SCHEMA).map_err(classify)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Wait this long for a locked database before statements fail
    /// with `DB_BUSY`.
    pub fn set_busy_timeout(&self, timeout: std::time::Duration) -> Result<(), WriteError> {
        let conn = self.lock()?;
        conn.busy_timeout(timeout).map_err(classify)
    }

    fn exec(&self, sql: &str) -> Result<(), WriteError> {
        let conn = self.lock()?;
        conn.execute_batch(sql).map_err(classify)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, WriteError> {
        self.conn
            .lock()
            .map_err(|_| WriteError::internal("LOCK_POISONED", "connection mutex poisoned"))
    }

    /// Most recent run history rows, newest first.
    pub fn recent_runs(&self, limit: usize) -> Result<Vec<RunSummary>, WriteError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT run_id, operation_id, table_name, status, succeeded, failed,
                        started_at, finished_at
                 FROM ingest_runs ORDER BY run_id DESC LIMIT ?1",
            )
            .map_err(classify)?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok(RunSummary {
                    run_id: row.get(0)?,
                    operation_id: row.get(1)?,
                    table_name: row.get(2)?,
                    status: row.get(3)?,
                    succeeded: row.get::<_, i64>(4)?.max(0) as u64,
                    failed: row.get::<_, i64>(5)?.max(0) as u64,
                    started_at: row.get(6)?,
                    finished_at: row.get(7)?,
                })
            })
            .map_err(classify)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(classify)?;
        Ok(rows)
    }

    /// Rejected records persisted for a run, as (json, reason) pairs.
    pub fn failed_records(&self, run_id: i64) -> Result<Vec<(String, String)>, WriteError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT record, reason FROM failed_records WHERE run_id = ?1 ORDER BY id")
            .map_err(classify)?;
        let rows = stmt
            .query_map(params![run_id], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(classify)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(classify)?;
        Ok(rows)
    }

    /// Row count of an arbitrary table, for tests and reporting.
    pub fn count_rows(&self, table: &str) -> Result<u64, WriteError> {
        let conn = self.lock()?;
        let n: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })
            .map_err(classify)?;
        Ok(n.max(0) as u64)
    }
}

impl TableWriter for SqliteWriter {
    fn begin_table(&self, table: &TableSpec) -> Result<(), WriteError> {
        debug!(table = table.name, "opening write transaction");
        self.exec("BEGIN")
    }

    fn write_batch(
        &self,
        table: &TableSpec,
        clause: &WriteClause,
        rows: &[Vec<SqlValue>],
    ) -> Result<u64, WriteError> {
        if rows.is_empty() {
            return Ok(0);
        }
        let conn = self.lock()?;
        conn.execute_batch("SAVEPOINT batch").map_err(classify)?;
        match insert_rows(&conn, table, clause, rows) {
            Ok(changed) => {
                conn.execute_batch("RELEASE batch").map_err(classify)?;
                Ok(changed)
            }
            Err(err) => {
                // Undo the partial batch before surfacing the error.
                conn.execute_batch("ROLLBACK TO batch; RELEASE batch")
                    .map_err(classify)?;
                Err(err)
            }
        }
    }

    fn checkpoint(&self, table: &TableSpec) -> Result<(), WriteError> {
        debug!(table = table.name, "checkpointing");
        self.exec("COMMIT; BEGIN")
    }

    fn commit_table(&self, _table: &TableSpec) -> Result<(), WriteError> {
        self.exec("COMMIT")
    }

    fn rollback_table(&self, _table: &TableSpec) -> Result<(), WriteError> {
        self.exec("ROLLBACK")
    }
}

impl RunLog for SqliteWriter {
    fn start_run(&self, op: &OperationId, table: &str) -> Result<i64, WriteError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO ingest_runs (operation_id, table_name, status) VALUES (?1, ?2, ?3)",
            params![op.as_str(), table, RunStatus::Running.as_str()],
        )
        .map_err(classify)?;
        Ok(conn.last_insert_rowid())
    }

    fn complete_run(
        &self,
        run_id: i64,
        status: RunStatus,
        succeeded: u64,
        failed: u64,
    ) -> Result<(), WriteError> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE ingest_runs
             SET status = ?1, succeeded = ?2, failed = ?3, finished_at = datetime('now')
             WHERE run_id = ?4",
            params![status.as_str(), succeeded as i64, failed as i64, run_id],
        )
        .map_err(classify)?;
        Ok(())
    }

    fn record_failures(&self, run_id: i64, failures: &[FailedRecord]) -> Result<(), WriteError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("INSERT INTO failed_records (run_id, record, reason) VALUES (?1, ?2, ?3)")
            .map_err(classify)?;
        for failure in failures {
            let json = serde_json::to_string(&failure.record)
                .map_err(|e| WriteError::internal("SERIALIZE", format!("failed record not serializable: {e}")))?;
            stmt.execute(params![run_id, json, failure.reason])
                .map_err(classify)?;
        }
        Ok(())
    }
}

fn insert_rows(
    conn: &Connection,
    table: &TableSpec,
    clause: &WriteClause,
    rows: &[Vec<SqlValue>],
) -> Result<u64, WriteError> {
    let cols = table.columns.len();
    let rows_per_stmt = (MAX_INSERT_PARAMS / cols).max(1);
    let mut changed = 0u64;
    for chunk in rows.chunks(rows_per_stmt) {
        let sql = build_insert_sql(table, clause, chunk.len());
        let mut stmt = conn.prepare_cached(&sql).map_err(classify)?;
        let flat = chunk.iter().flatten().map(to_sql_value);
        changed += stmt.execute(params_from_iter(flat)).map_err(classify)? as u64;
    }
    Ok(changed)
}

fn build_insert_sql(table: &TableSpec, clause: &WriteClause, row_count: usize) -> String {
    let cols = table.columns.join(", ");
    let one_row = format!(
        "({})",
        (0..table.columns.len())
            .map(|_| "?")
            .collect::<Vec<_>>()
            .join(", ")
    );
    let values = std::iter::repeat(one_row.as_str())
        .take(row_count)
        .collect::<Vec<_>>()
        .join(", ");
    let mut sql = format!("INSERT INTO {} ({cols}) VALUES {values}", table.name);
    if let Some(suffix) = &clause.on_conflict {
        sql.push(' ');
        sql.push_str(suffix);
    }
    sql
}

fn to_sql_value(value: &SqlValue) -> rusqlite::types::Value {
    match value {
        SqlValue::Integer(i) => rusqlite::types::Value::Integer(*i),
        SqlValue::Real(r) => rusqlite::types::Value::Real(*r),
        SqlValue::Text(s) => rusqlite::types::Value::Text(s.clone()),
        SqlValue::Null => rusqlite::types::Value::Null,
    }
}

fn classify(err: rusqlite::Error) -> WriteError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _) => match failure.code {
            ErrorCode::ConstraintViolation => {
                WriteError::constraint("CONSTRAINT_VIOLATION", format!("{err}"))
            }
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => {
                WriteError::transient_db("DB_BUSY", format!("{err}"))
            }
            _ => WriteError::internal("SQLITE", format!("{err}")),
        },
        _ => WriteError::internal("SQLITE", format!("{err}")),
    }
}
