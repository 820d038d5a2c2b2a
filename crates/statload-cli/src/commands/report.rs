use std::path::Path;

use anyhow::{Context, Result};

use statload_engine::config::parser;
use statload_store::SqliteWriter;

/// Execute the `report` command: print recent ingest runs.
pub fn execute(job_path: &Path, limit: usize) -> Result<()> {
    let job = parser::parse_job(job_path)
        .with_context(|| format!("Failed to parse job: {}", job_path.display()))?;
    let writer = SqliteWriter::open(&job.database)
        .with_context(|| format!("Failed to open database: {}", job.database))?;

    let runs = writer
        .recent_runs(limit)
        .map_err(|e| anyhow::anyhow!("Failed to read run history: {e}"))?;
    if runs.is_empty() {
        println!("No runs recorded yet.");
        return Ok(());
    }

    println!(
        "{:>6}  {:16}  {:16}  {:>9}  {:>7}  {:>7}  {}",
        "run", "operation", "table", "status", "ok", "failed", "started"
    );
    for run in runs {
        println!(
            "{:>6}  {:16}  {:16}  {:>9}  {:>7}  {:>7}  {}",
            run.run_id,
            run.operation_id,
            run.table_name,
            run.status,
            run.succeeded,
            run.failed,
            run.started_at
        );
    }
    Ok(())
}
