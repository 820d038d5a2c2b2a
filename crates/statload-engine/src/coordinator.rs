//! Multi-table operation coordination.
//!
//! Tables are written in reference order (players before their season
//! lines, season lines before their splits) so child rows never land
//! ahead of the rows they point at.

use std::collections::HashSet;
use std::time::Duration;

use statload_store::{RunLog, TableWriter};
use statload_types::config::BulkConfig;
use statload_types::error::WriteError;
use statload_types::op::{OperationId, RunStatus};
use statload_types::record::{
    PassingSeason, PassingSplit, PlayerRecord, TableSpec, PASSING_SEASONS, PASSING_SPLITS, PLAYERS,
};
use tracing::{info, warn};

use crate::cancel::CancelToken;
use crate::config::validator::validate_bulk_config;
use crate::pipeline::write_table;
use crate::result::BulkWriteResult;

/// One table's worth of records to load.
#[derive(Debug)]
pub enum TableLoad {
    Players(Vec<PlayerRecord>),
    Seasons(Vec<PassingSeason>),
    Splits(Vec<PassingSplit>),
}

impl TableLoad {
    fn table(&self) -> &'static TableSpec {
        match self {
            Self::Players(_) => &PLAYERS,
            Self::Seasons(_) => &PASSING_SEASONS,
            Self::Splits(_) => &PASSING_SPLITS,
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::Players(r) => r.len(),
            Self::Seasons(r) => r.len(),
            Self::Splits(r) => r.len(),
        }
    }

    /// Position in the fixed reference order.
    fn rank(&self) -> u8 {
        match self {
            Self::Players(_) => 0,
            Self::Seasons(_) => 1,
            Self::Splits(_) => 2,
        }
    }

    /// Player ids this load references in its parent table.
    fn referenced_players(&self) -> Vec<&str> {
        match self {
            Self::Players(_) => Vec::new(),
            Self::Seasons(r) => r.iter().map(|s| s.player_id.as_str()).collect(),
            Self::Splits(r) => r.iter().map(|s| s.player_id.as_str()).collect(),
        }
    }
}

/// Knobs for one coordinated operation.
#[derive(Debug, Clone)]
pub struct OperationOptions {
    /// Stop the whole operation at the first failed batch.
    pub fail_fast: bool,
    /// Warn when a child record references a player whose row failed.
    pub warn_unresolved_refs: bool,
}

impl Default for OperationOptions {
    fn default() -> Self {
        Self {
            fail_fast: false,
            warn_unresolved_refs: true,
        }
    }
}

/// Outcome of a coordinated multi-table operation.
#[derive(Debug)]
pub struct OperationReport {
    pub operation_id: OperationId,
    pub results: Vec<BulkWriteResult>,
    pub cancelled: bool,
}

impl OperationReport {
    #[must_use]
    pub fn total_succeeded(&self) -> u64 {
        self.results.iter().map(|r| r.succeeded).sum()
    }

    #[must_use]
    pub fn total_failed(&self) -> u64 {
        self.results.iter().map(|r| r.failed).sum()
    }

    /// True when every table finished with no failures or errors.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        !self.cancelled && self.results.iter().all(BulkWriteResult::is_clean)
    }
}

/// Run a coordinated load across the given tables.
///
/// Loads are reordered so parents always precede children. A table
/// whose batches fail does not stop later tables unless `fail_fast` is
/// set; run history, when a [`RunLog`] is supplied, is best-effort and
/// never fails the operation. Transaction-level faults are reported
/// inside the affected table's result, so completed tables always
/// survive in the report.
///
/// # Errors
///
/// Returns an error only when the bulk configuration is invalid.
pub fn run_operation(
    writer: &dyn TableWriter,
    run_log: Option<&dyn RunLog>,
    loads: Vec<TableLoad>,
    config: &BulkConfig,
    options: &OperationOptions,
    cancel: &CancelToken,
) -> Result<OperationReport, WriteError> {
    run_operation_with_sleep(
        writer,
        run_log,
        loads,
        config,
        options,
        cancel,
        &mut std::thread::sleep,
    )
}

/// [`run_operation`] with an injectable sleep, so tests can observe
/// backoff without waiting for it.
#[allow(clippy::too_many_arguments)]
pub fn run_operation_with_sleep(
    writer: &dyn TableWriter,
    run_log: Option<&dyn RunLog>,
    mut loads: Vec<TableLoad>,
    config: &BulkConfig,
    options: &OperationOptions,
    cancel: &CancelToken,
    sleep: &mut dyn FnMut(Duration),
) -> Result<OperationReport, WriteError> {
    validate_bulk_config(config)?;

    let op = OperationId::generate();
    loads.sort_by_key(TableLoad::rank);
    info!(
        operation = %op,
        tables = loads.len(),
        records = loads.iter().map(TableLoad::len).sum::<usize>(),
        "starting coordinated load"
    );

    let mut report = OperationReport {
        operation_id: op.clone(),
        results: Vec::with_capacity(loads.len()),
        cancelled: false,
    };
    let mut failed_players: HashSet<String> = HashSet::new();
    let mut abort = false;

    for load in loads {
        let table = load.table();

        if abort || cancel.is_cancelled() {
            let mut result = BulkWriteResult::new(table.name);
            result.add_warning(if abort {
                "skipped: an earlier table failed with fail_fast set".to_string()
            } else {
                "skipped: operation cancelled".to_string()
            });
            result.mark_complete();
            report.results.push(result);
            continue;
        }

        let unresolved = if options.warn_unresolved_refs && !failed_players.is_empty() {
            load.referenced_players()
                .into_iter()
                .filter(|id| failed_players.contains(*id))
                .count()
        } else {
            0
        };
        if unresolved > 0 {
            warn!(
                table = table.name,
                unresolved, "records reference players that failed to load"
            );
        }

        let run_id = run_log.and_then(|log| match log.start_run(&op, table.name) {
            Ok(id) => Some(id),
            Err(err) => {
                warn!(table = table.name, error = %err, "failed to open run history row");
                None
            }
        });

        let mut result = match load {
            TableLoad::Players(records) => write_table(
                writer,
                &PLAYERS,
                records,
                config,
                options.fail_fast,
                cancel,
                sleep,
            ),
            TableLoad::Seasons(records) => write_table(
                writer,
                &PASSING_SEASONS,
                records,
                config,
                options.fail_fast,
                cancel,
                sleep,
            ),
            TableLoad::Splits(records) => write_table(
                writer,
                &PASSING_SPLITS,
                records,
                config,
                options.fail_fast,
                cancel,
                sleep,
            ),
        };

        if unresolved > 0 {
            result.add_warning(format!(
                "{unresolved} record(s) reference players that failed to load"
            ));
        }

        if table.name == PLAYERS.name {
            for failure in &result.failed_records {
                if let Some(id) = failure.record.get("player_id").and_then(|v| v.as_str()) {
                    failed_players.insert(id.to_owned());
                }
            }
        }

        if let (Some(log), Some(run_id)) = (run_log, run_id) {
            let status = if result.is_clean() {
                RunStatus::Completed
            } else {
                RunStatus::Failed
            };
            if let Err(err) = log.record_failures(run_id, &result.failed_records) {
                warn!(table = table.name, error = %err, "failed to persist rejected records");
            }
            if let Err(err) = log.complete_run(run_id, status, result.succeeded, result.failed) {
                warn!(table = table.name, error = %err, "failed to close run history row");
            }
        }

        if options.fail_fast && !result.is_clean() {
            abort = true;
        }
        report.results.push(result);
    }

    report.cancelled = cancel.is_cancelled();
    info!(
        operation = %op,
        succeeded = report.total_succeeded(),
        failed = report.total_failed(),
        cancelled = report.cancelled,
        "coordinated load finished"
    );
    Ok(report)
}
