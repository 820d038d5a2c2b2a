//! Conflict strategy resolution into store-level write clauses.

use statload_types::config::ConflictStrategy;
use statload_types::record::{TableSpec, WriteClause};

/// Build the conflict clause for one table under a strategy.
///
/// `Update` upserts every non-key column from the incoming row,
/// `Ignore` keeps the existing row, and `Fail` attaches nothing so the
/// store surfaces the constraint violation.
#[must_use]
pub fn build_conflict_clause(strategy: ConflictStrategy, table: &TableSpec) -> WriteClause {
    match strategy {
        ConflictStrategy::Update => {
            let keys = table.key_columns.join(", ");
            let assignments = table
                .updatable_columns()
                .iter()
                .map(|col| format!("{col} = excluded.{col}"))
                .collect::<Vec<_>>()
                .join(", ");
            WriteClause {
                on_conflict: Some(format!("ON CONFLICT ({keys}) DO UPDATE SET {assignments}")),
            }
        }
        ConflictStrategy::Ignore => {
            let keys = table.key_columns.join(", ");
            WriteClause {
                on_conflict: Some(format!("ON CONFLICT ({keys}) DO NOTHING")),
            }
        }
        ConflictStrategy::Fail => WriteClause::default(),
    }
}
