//! Semantic validation and batch sizing for bulk write settings.

use statload_types::config::BulkConfig;
use statload_types::error::WriteError;
use tracing::debug;

/// Fallback per-record size used when the caller has no estimate.
pub const DEFAULT_RECORD_SIZE_BYTES: usize = 1024;

/// Collect every problem with a bulk configuration.
///
/// Returns an empty vector when the configuration is usable.
#[must_use]
pub fn check_bulk_config(config: &BulkConfig) -> Vec<String> {
    let mut errors = Vec::new();

    if config.min_batch_size == 0 {
        errors.push("min_batch_size must be > 0".to_string());
    }
    if config.min_batch_size > config.max_batch_size {
        errors.push(format!(
            "min_batch_size {} cannot exceed max_batch_size {}",
            config.min_batch_size, config.max_batch_size
        ));
    }
    if config.batch_size < config.min_batch_size {
        errors.push(format!(
            "Batch size {} is below minimum {}",
            config.batch_size, config.min_batch_size
        ));
    }
    if config.batch_size > config.max_batch_size {
        errors.push(format!(
            "Batch size {} exceeds maximum {}",
            config.batch_size, config.max_batch_size
        ));
    }
    if config.timeout_seconds == 0 {
        errors.push("timeout_seconds must be > 0".to_string());
    }
    if config.retry_delay_secs <= 0.0 || !config.retry_delay_secs.is_finite() {
        errors.push(format!(
            "retry_delay_secs {} must be a positive number",
            config.retry_delay_secs
        ));
    }
    if config.memory_limit_mb == 0 {
        errors.push("memory_limit_mb must be > 0".to_string());
    }
    if config.checkpoint_interval_batches == 0 {
        errors.push("checkpoint_interval_batches must be > 0".to_string());
    }

    errors
}

/// Validate a bulk configuration, folding all problems into one error.
///
/// # Errors
///
/// Returns a config-category error listing every violation.
pub fn validate_bulk_config(config: &BulkConfig) -> Result<(), WriteError> {
    let errors = check_bulk_config(config);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(WriteError::config(
            "INVALID_BULK_CONFIG",
            format!("Invalid bulk configuration: {}", errors.join("; ")),
        ))
    }
}

/// Pick an effective batch size for a workload.
///
/// Shrinks the configured size when the memory budget cannot hold a
/// full batch of `estimated_record_size`-byte records, and again when
/// the workload itself is small, always staying within the configured
/// bounds.
#[must_use]
pub fn optimize_batch_size(
    config: &BulkConfig,
    record_count: usize,
    estimated_record_size: usize,
) -> usize {
    let record_size = estimated_record_size.max(1);
    let memory_bytes = config.memory_limit_mb.saturating_mul(1024 * 1024);
    let memory_based = (memory_bytes / record_size).max(config.min_batch_size);

    let mut optimal = config
        .batch_size
        .min(memory_based)
        .min(config.max_batch_size);

    if record_count < optimal {
        optimal = (record_count / 4).max(config.min_batch_size);
    }

    debug!(
        record_count,
        record_size, optimal, "resolved effective batch size"
    );
    optimal
}
