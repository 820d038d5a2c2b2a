//! Bulk write tuning parameters.
//!
//! Every field carries a serde default so partial configs deserialize
//! cleanly; validation of the resulting values lives in the engine.

use serde::{Deserialize, Serialize};

/// How to resolve a row whose unique key already exists in the target
/// table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConflictStrategy {
    /// Overwrite the non-key columns of the existing row.
    #[default]
    Update,
    /// Keep the existing row and silently skip the incoming one.
    Ignore,
    /// Surface the constraint violation as a batch failure.
    Fail,
}

impl std::fmt::Display for ConflictStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Update => "update",
            Self::Ignore => "ignore",
            Self::Fail => "fail",
        };
        f.write_str(s)
    }
}

/// Tuning knobs for a bulk write operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BulkConfig {
    /// Target number of records per batch, before sizing heuristics.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Lower bound the sizing heuristics will never go below.
    #[serde(default = "default_min_batch_size")]
    pub min_batch_size: usize,
    /// Upper bound the sizing heuristics will never exceed.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    /// How long the store waits on a locked database before a
    /// statement fails, in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Maximum total attempts per batch, including the first.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    /// Base delay before the first retry, doubled on each subsequent one.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: f64,
    #[serde(default)]
    pub conflict_strategy: ConflictStrategy,
    /// Budget used to shrink batches when records are large.
    #[serde(default = "default_memory_limit_mb")]
    pub memory_limit_mb: usize,
    /// Durability checkpoint cadence, in batches.
    #[serde(default = "default_checkpoint_interval_batches")]
    pub checkpoint_interval_batches: usize,
    /// Emit per-batch progress at info level.
    #[serde(default = "default_true")]
    pub progress_tracking: bool,
}

fn default_batch_size() -> usize {
    100
}

fn default_min_batch_size() -> usize {
    10
}

fn default_max_batch_size() -> usize {
    1000
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay_secs() -> f64 {
    1.0
}

fn default_memory_limit_mb() -> usize {
    512
}

fn default_checkpoint_interval_batches() -> usize {
    8
}

fn default_true() -> bool {
    true
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            min_batch_size: default_min_batch_size(),
            max_batch_size: default_max_batch_size(),
            timeout_seconds: default_timeout_seconds(),
            retry_attempts: default_retry_attempts(),
            retry_delay_secs: default_retry_delay_secs(),
            conflict_strategy: ConflictStrategy::default(),
            memory_limit_mb: default_memory_limit_mb(),
            checkpoint_interval_batches: default_checkpoint_interval_batches(),
            progress_tracking: default_true(),
        }
    }
}
