//! Job YAML parsing with environment variable substitution.

use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;

use crate::config::JobConfig;

static ENV_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid env var regex"));

/// Substitute `${VAR_NAME}` patterns with environment variable values.
///
/// # Errors
///
/// Returns an error if any referenced environment variable is not set.
pub fn substitute_env_vars(input: &str) -> Result<String> {
    let mut result = input.to_string();
    let mut missing = Vec::new();

    for cap in ENV_VAR_RE.captures_iter(input) {
        let var_name = &cap[1];
        match std::env::var(var_name) {
            Ok(val) => {
                result = result.replace(&cap[0], &val);
            }
            Err(_) => {
                missing.push(var_name.to_string());
            }
        }
    }

    if !missing.is_empty() {
        anyhow::bail!("Missing environment variable(s): {}", missing.join(", "));
    }

    Ok(result)
}

/// Parse a job YAML string (after env var substitution).
///
/// # Errors
///
/// Returns an error if env var substitution fails or the YAML is invalid.
pub fn parse_job_str(yaml_str: &str) -> Result<JobConfig> {
    let substituted = substitute_env_vars(yaml_str)?;
    let config: JobConfig =
        serde_yaml::from_str(&substituted).context("Failed to parse job YAML")?;
    Ok(config)
}

/// Parse a job YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the YAML is invalid.
pub fn parse_job(path: &Path) -> Result<JobConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read job file: {}", path.display()))?;
    parse_job_str(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use statload_types::config::ConflictStrategy;

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("SL_TEST_DB", "/tmp/stats.db");
        let parsed = parse_job_str("database: ${SL_TEST_DB}\n").unwrap();
        assert_eq!(parsed.database, "/tmp/stats.db");
        std::env::remove_var("SL_TEST_DB");
    }

    #[test]
    fn test_missing_env_var_lists_name() {
        let err = parse_job_str("database: ${SL_DEFINITELY_UNSET_VAR}\n").unwrap_err();
        assert!(err.to_string().contains("SL_DEFINITELY_UNSET_VAR"));
    }

    #[test]
    fn test_minimal_job_uses_defaults() {
        let job = parse_job_str("database: stats.db\n").unwrap();
        assert_eq!(job.bulk.batch_size, 100);
        assert!(!job.fail_fast);
        assert!(job.warn_unresolved_refs);
    }

    #[test]
    fn test_full_job_round_trip() {
        let yaml = "
database: stats.db
fail_fast: true
bulk:
  batch_size: 50
  conflict_strategy: fail
";
        let job = parse_job_str(yaml).unwrap();
        assert!(job.fail_fast);
        assert_eq!(job.bulk.batch_size, 50);
        assert_eq!(job.bulk.conflict_strategy, ConflictStrategy::Fail);
    }

    #[test]
    fn test_unknown_top_level_key_rejected() {
        assert!(parse_job_str("database: x\nbulks: {}\n").is_err());
    }
}
