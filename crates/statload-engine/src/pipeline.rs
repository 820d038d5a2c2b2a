//! Per-table write pipeline: validate, size, batch, and write with
//! retries and periodic durability checkpoints.

use std::time::Duration;

use serde::Serialize;
use statload_store::TableWriter;
use statload_types::config::BulkConfig;
use statload_types::error::{FailedRecord, WriteError};
use statload_types::record::{Record, TableSpec};
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::config::validator::{optimize_batch_size, DEFAULT_RECORD_SIZE_BYTES};
use crate::conflict::build_conflict_clause;
use crate::planner::plan_batches;
use crate::result::BulkWriteResult;
use crate::retry::{run_with_retry, BatchOutcome};
use crate::validate::validate_records;

fn record_failure<R: Serialize>(record: &R, reason: String) -> FailedRecord {
    let json = serde_json::to_value(record)
        .unwrap_or_else(|e| serde_json::json!({ "unserializable": e.to_string() }));
    FailedRecord {
        record: json,
        reason,
    }
}

/// Write one table's records through `writer`.
///
/// Invalid records are rejected up front; each surviving batch is
/// retried per the config and, on terminal failure, recorded without
/// aborting later batches unless `fail_fast` is set. Progress that
/// reached a checkpoint stays durable regardless of later failures.
///
/// Never surfaces a fault as a bare error: transaction-level failures
/// (opening, checkpointing, or committing the table) are folded into
/// the returned [`BulkWriteResult`], with any rows rolled back since
/// the last checkpoint recounted as failed.
pub fn write_table<R: Record + Serialize>(
    writer: &dyn TableWriter,
    table: &'static TableSpec,
    records: Vec<R>,
    config: &BulkConfig,
    fail_fast: bool,
    cancel: &CancelToken,
    sleep: &mut dyn FnMut(Duration),
) -> BulkWriteResult {
    let mut result = BulkWriteResult::new(table.name);
    let total_in = records.len();

    let (valid, rejected) = validate_records(records);
    for reject in rejected {
        result.add_failure(reject.into_failed());
    }

    if valid.is_empty() {
        debug!(table = table.name, "no valid records to write");
        result.mark_complete();
        return result;
    }

    let batch_size = optimize_batch_size(config, valid.len(), DEFAULT_RECORD_SIZE_BYTES);
    let clause = build_conflict_clause(config.conflict_strategy, table);
    let batches = plan_batches(valid, batch_size);
    let batch_count = batches.len();
    info!(
        table = table.name,
        records = total_in,
        rejected = result.failed,
        batch_size,
        batches = batch_count,
        strategy = %config.conflict_strategy,
        "starting bulk write"
    );

    if let Err(err) = writer.begin_table(table) {
        result.add_error(format!("failed to open table transaction: {err}"));
        for batch in batches {
            for record in &batch.records {
                result.add_failure(record_failure(record, format!("not attempted: {err}")));
            }
        }
        result.mark_complete();
        return result;
    }

    let base_delay = Duration::from_secs_f64(config.retry_delay_secs.max(0.0));
    let mut batches_since_checkpoint = 0usize;
    // Successful rows not yet covered by a checkpoint; lost if the
    // transaction fails before the next checkpoint or the commit.
    let mut rows_since_checkpoint = 0u64;
    let mut infra_error: Option<WriteError> = None;

    let mut remaining = batches.into_iter();
    for batch in remaining.by_ref() {
        if cancel.is_cancelled() {
            result.add_warning(format!(
                "cancelled before batch {} of {batch_count}",
                batch.index + 1
            ));
            break;
        }

        let rows: Vec<_> = batch.records.iter().map(Record::values).collect();
        let outcome = run_with_retry(config.retry_attempts, base_delay, sleep, &mut |_| {
            writer.write_batch(table, &clause, &rows)
        });
        result.batches_processed += 1;

        match outcome {
            BatchOutcome::Succeeded {
                rows_changed,
                attempts,
            } => {
                let batch_len = batch.records.len() as u64;
                let written = rows_changed.min(batch_len);
                result.add_success(written);
                result.add_skipped(batch_len - written);
                rows_since_checkpoint += written;
                if config.progress_tracking {
                    info!(
                        table = table.name,
                        batch = batch.index + 1,
                        of = batch_count,
                        rows = batch_len,
                        attempts,
                        "batch written"
                    );
                }
                batches_since_checkpoint += 1;
                if batches_since_checkpoint >= config.checkpoint_interval_batches {
                    if let Err(err) = writer.checkpoint(table) {
                        infra_error = Some(err);
                        break;
                    }
                    batches_since_checkpoint = 0;
                    rows_since_checkpoint = 0;
                }
            }
            BatchOutcome::Failed { error, attempts } => {
                result.add_error(format!(
                    "batch {} failed after {attempts} attempt(s): {error}",
                    batch.index + 1
                ));
                for record in &batch.records {
                    result.add_failure(record_failure(record, error.to_string()));
                }
                if fail_fast {
                    result.add_warning(format!(
                        "stopping after batch {}: fail_fast is set",
                        batch.index + 1
                    ));
                    break;
                }
            }
        }
    }

    if infra_error.is_none() {
        if let Err(err) = writer.commit_table(table) {
            infra_error = Some(err);
        }
    }

    if let Some(err) = infra_error {
        if let Err(rb) = writer.rollback_table(table) {
            warn!(table = table.name, error = %rb, "rollback after transaction failure also failed");
        }
        result.succeeded = result.succeeded.saturating_sub(rows_since_checkpoint);
        result.failed += rows_since_checkpoint;
        result.add_error(format!(
            "table transaction failed, {rows_since_checkpoint} row(s) rolled back: {err}"
        ));
        for batch in remaining {
            for record in &batch.records {
                result.add_failure(record_failure(record, format!("not attempted: {err}")));
            }
        }
    }

    result.mark_complete();
    info!(
        table = table.name,
        succeeded = result.succeeded,
        failed = result.failed,
        skipped = result.skipped,
        batches = result.batches_processed,
        rate = format!("{:.1}%", result.success_rate()),
        "bulk write finished"
    );
    result
}
