//! Job configuration: file format, parsing, and semantic validation.

pub mod parser;
pub mod validator;

use serde::{Deserialize, Serialize};
use statload_types::config::BulkConfig;

/// Top-level job file describing one ingest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    /// Path to the SQLite database file. Supports `${VAR}` expansion.
    pub database: String,
    #[serde(default)]
    pub bulk: BulkConfig,
    /// Abort the whole operation on the first failed batch.
    #[serde(default)]
    pub fail_fast: bool,
    /// Warn when child-table records reference a player whose own row
    /// failed to load earlier in the run.
    #[serde(default = "default_true")]
    pub warn_unresolved_refs: bool,
}

fn default_true() -> bool {
    true
}
