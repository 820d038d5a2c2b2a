use std::path::Path;

use anyhow::{Context, Result};

use statload_engine::config::parser;
use statload_engine::config::validator;

/// Execute the `check` command: validate a job file without writing.
pub fn execute(job_path: &Path) -> Result<()> {
    let job = parser::parse_job(job_path)
        .with_context(|| format!("Failed to parse job: {}", job_path.display()))?;
    println!("Job structure:      OK");

    let errors = validator::check_bulk_config(&job.bulk);
    if errors.is_empty() {
        println!("Bulk configuration: OK");
    } else {
        println!("Bulk configuration: FAILED");
        for error in &errors {
            println!("  - {error}");
        }
        anyhow::bail!("One or more checks failed")
    }

    println!(
        "Strategy: {}, batch size {} ({}..{}), {} attempt(s)",
        job.bulk.conflict_strategy,
        job.bulk.batch_size,
        job.bulk.min_batch_size,
        job.bulk.max_batch_size,
        job.bulk.retry_attempts
    );
    println!("\nAll checks passed.");
    Ok(())
}
