//! # Database Retry
//!
//! Exponential backoff around database calls.
//!
//! ```text
//! attempt ──► Ok ─────────────────────────────────► return Ok
//!    │
//!    └──► Err(e) ── e.is_transient()? ── no ──────► return Err(e)
//!                         │
//!                        yes
//!                         │
//!                         ▼
//!          budget left? ── no ──► return Err(e)
//!                │
//!               yes ── sleep (50ms, 100ms, 200ms ... capped) ──► attempt
//! ```
//!
//! Only `Busy`, `PoolExhausted`, `ConnectionFailed` and `TransactionFailed`
//! are retried. Constraint violations, refused transitions and missing rows
//! come back on the first attempt.

use std::future::Future;
use std::time::Duration;

use backoff::ExponentialBackoff;
use brewline_db::{DbError, DbResult};
use tracing::warn;

/// Backoff parameters, built from `[retry]` in the config.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub initial_interval: Duration,
    pub max_interval: Duration,

    /// Total time budget; after it the last error is returned.
    pub max_elapsed: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            initial_interval: Duration::from_millis(50),
            max_interval: Duration::from_secs(1),
            max_elapsed: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.initial_interval,
            initial_interval: self.initial_interval,
            max_interval: self.max_interval,
            multiplier: self.multiplier,
            max_elapsed_time: Some(self.max_elapsed),
            ..Default::default()
        }
    }
}

fn classify(err: DbError) -> backoff::Error<DbError> {
    if err.is_transient() {
        backoff::Error::transient(err)
    } else {
        backoff::Error::permanent(err)
    }
}

/// Runs `op` until it succeeds, fails permanently, or the policy's time
/// budget runs out.
///
/// `operation` names the call in retry logs.
pub async fn with_backoff<T, F, Fut>(policy: &RetryPolicy, operation: &str, mut op: F) -> DbResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = DbResult<T>>,
{
    backoff::future::retry_notify(
        policy.backoff(),
        || {
            let attempt = op();
            async move { attempt.await.map_err(classify) }
        },
        |err: DbError, wait: Duration| {
            warn!(
                operation,
                error = %err,
                wait_ms = wait.as_millis() as u64,
                "Transient database error, retrying"
            );
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            initial_interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(5),
            max_elapsed: Duration::from_millis(200),
            multiplier: 2.0,
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));

        let result = with_backoff(&fast_policy(), "test", || {
            let calls = calls.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(DbError::Busy("database is locked".into()))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));

        let result: DbResult<()> = with_backoff(&fast_policy(), "test", || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(DbError::duplicate("tracking_code", "K7M2X9PQ"))
            }
        })
        .await;

        assert!(matches!(result, Err(DbError::UniqueViolation { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_budget() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy {
            max_elapsed: Duration::from_millis(30),
            ..fast_policy()
        };

        let result: DbResult<()> = with_backoff(&policy, "test", || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(DbError::PoolExhausted)
            }
        })
        .await;

        assert!(matches!(result, Err(DbError::PoolExhausted)));
        assert!(calls.load(Ordering::SeqCst) > 1);
    }
}
