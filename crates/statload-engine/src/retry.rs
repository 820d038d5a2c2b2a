//! Retried batch execution with exponential backoff.

use std::time::Duration;

use statload_types::error::WriteError;
use tracing::warn;

/// Backoff delays never exceed one minute regardless of attempt count.
const MAX_BACKOFF_MS: u64 = 60_000;

/// Terminal outcome of one batch, with the attempts it consumed.
#[derive(Debug)]
pub enum BatchOutcome {
    Succeeded { rows_changed: u64, attempts: u32 },
    Failed { error: WriteError, attempts: u32 },
}

/// Delay before retry number `attempt` (1-based): the base delay
/// doubled per prior retry, capped at [`MAX_BACKOFF_MS`].
#[must_use]
pub fn compute_backoff(base_delay: Duration, attempt: u32) -> Duration {
    let base_ms = u64::try_from(base_delay.as_millis()).unwrap_or(MAX_BACKOFF_MS);
    let exp = attempt.saturating_sub(1).min(32);
    let delay_ms = base_ms
        .saturating_mul(2u64.saturating_pow(exp))
        .min(MAX_BACKOFF_MS);
    Duration::from_millis(delay_ms)
}

/// Run `write` up to `max_attempts` times (including the first), backing
/// off between retryable failures via `sleep`. Non-retryable errors end
/// the batch immediately.
pub fn run_with_retry(
    max_attempts: u32,
    base_delay: Duration,
    sleep: &mut dyn FnMut(Duration),
    write: &mut dyn FnMut(u32) -> Result<u64, WriteError>,
) -> BatchOutcome {
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match write(attempt) {
            Ok(rows_changed) => {
                return BatchOutcome::Succeeded {
                    rows_changed,
                    attempts: attempt,
                }
            }
            Err(error) if error.retryable && attempt < max_attempts => {
                let delay = compute_backoff(base_delay, attempt);
                warn!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "batch write failed, retrying"
                );
                sleep(delay);
            }
            Err(error) => {
                return BatchOutcome::Failed {
                    error,
                    attempts: attempt,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_sleep() -> impl FnMut(Duration) {
        |_| {}
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let base = Duration::from_millis(100);
        assert_eq!(compute_backoff(base, 1), Duration::from_millis(100));
        assert_eq!(compute_backoff(base, 2), Duration::from_millis(200));
        assert_eq!(compute_backoff(base, 3), Duration::from_millis(400));
        assert_eq!(compute_backoff(base, 30), Duration::from_millis(60_000));
        assert_eq!(
            compute_backoff(Duration::from_secs(90), 1),
            Duration::from_millis(60_000)
        );
    }

    #[test]
    fn succeeds_first_try_without_sleeping() {
        let mut sleeps = Vec::new();
        let outcome = run_with_retry(
            3,
            Duration::from_secs(1),
            &mut |d| sleeps.push(d),
            &mut |_| Ok(5),
        );
        match outcome {
            BatchOutcome::Succeeded {
                rows_changed,
                attempts,
            } => {
                assert_eq!(rows_changed, 5);
                assert_eq!(attempts, 1);
            }
            BatchOutcome::Failed { .. } => panic!("expected success"),
        }
        assert!(sleeps.is_empty());
    }

    #[test]
    fn fail_twice_then_succeed_sleeps_with_doubled_delays() {
        let mut sleeps = Vec::new();
        let mut calls = 0u32;
        let outcome = run_with_retry(
            3,
            Duration::from_millis(100),
            &mut |d| sleeps.push(d),
            &mut |_| {
                calls += 1;
                if calls < 3 {
                    Err(WriteError::transient_db("DEADLOCK", "deadlock"))
                } else {
                    Ok(10)
                }
            },
        );
        assert!(matches!(
            outcome,
            BatchOutcome::Succeeded {
                attempts: 3,
                rows_changed: 10
            }
        ));
        assert_eq!(
            sleeps,
            vec![Duration::from_millis(100), Duration::from_millis(200)]
        );
    }

    #[test]
    fn exhausted_attempts_return_last_error() {
        let outcome = run_with_retry(3, Duration::from_millis(1), &mut no_sleep(), &mut |n| {
            Err(WriteError::transient_network("TIMEOUT", format!("timeout {n}")))
        });
        match outcome {
            BatchOutcome::Failed { error, attempts } => {
                assert_eq!(attempts, 3);
                assert!(error.message.contains("timeout 3"));
            }
            BatchOutcome::Succeeded { .. } => panic!("expected failure"),
        }
    }

    #[test]
    fn non_retryable_error_fails_immediately() {
        let mut calls = 0u32;
        let outcome = run_with_retry(5, Duration::from_millis(1), &mut no_sleep(), &mut |_| {
            calls += 1;
            Err(WriteError::constraint("UNIQUE", "duplicate key"))
        });
        assert!(matches!(outcome, BatchOutcome::Failed { attempts: 1, .. }));
        assert_eq!(calls, 1);
    }

    #[test]
    fn zero_attempts_still_runs_once() {
        let outcome = run_with_retry(0, Duration::from_millis(1), &mut no_sleep(), &mut |_| Ok(1));
        assert!(matches!(outcome, BatchOutcome::Succeeded { attempts: 1, .. }));
    }
}
