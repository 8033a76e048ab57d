//! Lock-contention retry
//!
//! SQLite reports writer contention as `database is locked`. Such failures
//! are retried with exponential backoff (10 ms doubling, capped at 1 s) until
//! a caller-supplied budget is spent; every other error is returned as is.

use crate::Result;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

const INITIAL_BACKOFF_MS: u64 = 10;
const MAX_BACKOFF_MS: u64 = 1000;

/// Runs after a retried success longer than this are logged at WARN
const SLOW_SUCCESS_MS: u128 = 2000;

/// Run `operation` until it succeeds, fails with a non-lock error, or
/// `max_wait_ms` has elapsed since the first attempt.
///
/// The closure is re-invoked from scratch on every attempt, so it must
/// wrap a whole transaction rather than part of one.
pub async fn retry_on_lock<F, Fut, T>(operation_name: &str, max_wait_ms: u64, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let started = Instant::now();
    let budget = Duration::from_millis(max_wait_ms);
    let mut backoff_ms = INITIAL_BACKOFF_MS;
    let mut attempt = 1u32;

    loop {
        let err = match operation().await {
            Ok(value) => {
                log_recovery(operation_name, attempt, started.elapsed().as_millis());
                return Ok(value);
            }
            Err(err) if !err.is_lock_error() => return Err(err),
            Err(err) => err,
        };

        let elapsed = started.elapsed();
        if elapsed >= budget {
            error!(
                operation = operation_name,
                attempt,
                elapsed_ms = elapsed.as_millis(),
                max_wait_ms,
                "Database still locked, giving up"
            );
            return Err(err);
        }

        warn!(
            operation = operation_name,
            attempt,
            backoff_ms,
            remaining_ms = budget.saturating_sub(elapsed).as_millis(),
            "Database locked, backing off"
        );
        tokio::time::sleep(Duration::from_millis(backoff_ms)).await;

        backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
        attempt += 1;
    }
}

fn log_recovery(operation_name: &str, attempt: u32, elapsed_ms: u128) {
    if attempt == 1 {
        return;
    }
    if elapsed_ms > SLOW_SUCCESS_MS {
        warn!(operation = operation_name, attempt, elapsed_ms, "Database operation recovered after long contention");
    } else {
        debug!(operation = operation_name, attempt, elapsed_ms, "Database operation recovered after retry");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn locked() -> Error {
        Error::Database(sqlx::Error::Protocol("database is locked".to_string()))
    }

    #[tokio::test]
    async fn test_retry_succeeds_first_attempt() {
        let result = retry_on_lock("test_op", 5000, || async { Ok::<i32, Error>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_lock_errors() {
        let mut attempts = 0;

        let result = retry_on_lock("test_op", 5000, || {
            attempts += 1;
            let current = attempts;
            async move {
                if current < 3 {
                    Err(locked())
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts, 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_wait() {
        let mut attempts = 0;

        let result = retry_on_lock("test_op", 50, || {
            attempts += 1;
            async { Err::<i32, Error>(locked()) }
        })
        .await;

        assert!(result.unwrap_err().is_lock_error());
        assert!(attempts > 1, "lock errors should be retried at least once");
    }

    #[tokio::test]
    async fn test_non_lock_error_fails_immediately() {
        let mut attempts = 0;

        let result = retry_on_lock("test_op", 5000, || {
            attempts += 1;
            async { Err::<i32, Error>(Error::Internal("other error".to_string())) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts, 1);
    }
}
