use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use statload_engine::config::parser;
use statload_engine::{run_operation, CancelToken, OperationOptions, TableLoad};
use statload_store::{RunLog, SqliteWriter};
use statload_types::record::{PassingSeason, PassingSplit, PlayerRecord};

/// Input file shape: any subset of the three record kinds.
#[derive(Debug, Deserialize)]
struct LoadFile {
    #[serde(default)]
    players: Vec<PlayerRecord>,
    #[serde(default)]
    seasons: Vec<PassingSeason>,
    #[serde(default)]
    splits: Vec<PassingSplit>,
}

/// Execute the `load` command: ingest a JSON record file per a job config.
pub fn execute(job_path: &Path, input_path: &Path, fail_fast: bool) -> Result<()> {
    let job = parser::parse_job(job_path)
        .with_context(|| format!("Failed to parse job: {}", job_path.display()))?;

    let content = std::fs::read_to_string(input_path)
        .with_context(|| format!("Failed to read input file: {}", input_path.display()))?;
    let input: LoadFile = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse input file: {}", input_path.display()))?;

    let mut loads = Vec::new();
    if !input.players.is_empty() {
        loads.push(TableLoad::Players(input.players));
    }
    if !input.seasons.is_empty() {
        loads.push(TableLoad::Seasons(input.seasons));
    }
    if !input.splits.is_empty() {
        loads.push(TableLoad::Splits(input.splits));
    }
    if loads.is_empty() {
        anyhow::bail!("Input file contains no records");
    }

    let writer = SqliteWriter::open(&job.database)
        .with_context(|| format!("Failed to open database: {}", job.database))?;
    writer
        .set_busy_timeout(std::time::Duration::from_secs(job.bulk.timeout_seconds))
        .context("Failed to apply busy timeout")?;

    let cancel = CancelToken::new();
    let options = OperationOptions {
        fail_fast: fail_fast || job.fail_fast,
        warn_unresolved_refs: job.warn_unresolved_refs,
    };
    info!(database = %job.database, "starting load");
    let report = run_operation(
        &writer,
        Some(&writer as &dyn RunLog),
        loads,
        &job.bulk,
        &options,
        &cancel,
    )?;

    for result in &report.results {
        println!(
            "{:16} {:>7} ok {:>7} failed {:>7} skipped  ({:.1}%, {:.0} rec/s)",
            result.table_name,
            result.succeeded,
            result.failed,
            result.skipped,
            result.success_rate(),
            result.records_per_second()
        );
        for warning in &result.warnings {
            println!("  warning: {warning}");
        }
    }

    if report.cancelled {
        anyhow::bail!("Load cancelled; committed progress was kept")
    }
    if report.total_failed() > 0 {
        anyhow::bail!(
            "{} record(s) failed; see the failed_records table for details",
            report.total_failed()
        )
    }
    println!("\nLoad complete: {} record(s).", report.total_succeeded());
    Ok(())
}
