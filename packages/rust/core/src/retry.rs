//! Retry with exponential backoff around external calls.
//!
//! Transient failures (see [`ExternalError::is_transient`]) are retried up to
//! the attempt limit; permanent ones surface immediately. Callers get a
//! [`CallOutcome`] and decide whether a failure is a miss or a skip.

use std::future::Future;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use tracing::warn;

use portscout_shared::{ExternalError, RetryConfig};

/// Backoff schedule for one external call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }
}

impl RetryPolicy {
    /// Exponential schedule: initial, initial * 2, ... capped at `max_backoff`,
    /// with `max_attempts - 1` retries.
    pub fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.initial_backoff)
            .with_max_delay(self.max_backoff)
            .with_factor(2.0)
            .with_max_times(self.max_attempts.saturating_sub(1) as usize)
    }
}

/// Result of a call made under a [`RetryPolicy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome<T> {
    Ok(T),
    /// Every attempt failed transiently; the last failure is kept.
    Exhausted(ExternalError),
    /// Failed with a non-retryable error.
    Permanent(ExternalError),
}

impl<T> CallOutcome<T> {
    /// The value, treating any failure as a miss.
    pub fn ok(self) -> Option<T> {
        match self {
            Self::Ok(value) => Some(value),
            Self::Exhausted(_) | Self::Permanent(_) => None,
        }
    }
}

/// Run `operation` until it succeeds, fails permanently, or runs out of attempts.
///
/// `label` names the call in log lines.
pub async fn with_retry<F, Fut, T>(
    policy: &RetryPolicy,
    label: &str,
    operation: F,
) -> CallOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ExternalError>>,
{
    let result = operation
        .retry(policy.backoff())
        .when(ExternalError::is_transient)
        .notify(|err: &ExternalError, delay: Duration| {
            warn!(
                call = label,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "transient failure, backing off"
            );
        })
        .await;

    match result {
        Ok(value) => CallOutcome::Ok(value),
        Err(err) if err.is_transient() => {
            warn!(call = label, attempts = policy.max_attempts, error = %err, "retries exhausted");
            CallOutcome::Exhausted(err)
        }
        Err(err) => {
            warn!(call = label, error = %err, "permanent failure, not retrying");
            CallOutcome::Permanent(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use tokio::time::Instant;

    use super::*;

    #[test]
    fn policy_from_config() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.initial_backoff, Duration::from_secs(2));
        assert_eq!(policy.max_backoff, Duration::from_secs(60));

        let single = RetryPolicy::from(&RetryConfig {
            max_attempts: 0,
            ..RetryConfig::default()
        });
        assert_eq!(single.max_attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 4,
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(3),
        };
        let calls = Arc::new(AtomicU32::new(0));
        let start = Instant::now();

        let outcome: CallOutcome<()> = with_retry(&policy, "test", || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ExternalError::Connection("reset".into()))
            }
        })
        .await;

        assert!(matches!(outcome, CallOutcome::Exhausted(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        // 2s, then 4s capped to 3s twice.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(8) && elapsed < Duration::from_secs(9));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let start = Instant::now();

        let outcome = with_retry(&RetryPolicy::default(), "test", || {
            let calls = calls.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(ExternalError::RateLimited("slow down".into()))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(outcome, CallOutcome::Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 2s + 4s of virtual backoff.
        assert!(start.elapsed() >= Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_keeps_last_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let start = Instant::now();

        let outcome: CallOutcome<()> = with_retry(&RetryPolicy::default(), "test", || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ExternalError::Timeout("deadline".into()))
            }
        })
        .await;

        assert!(matches!(outcome, CallOutcome::Exhausted(ExternalError::Timeout(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(start.elapsed() >= Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_failures_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));

        let outcome: CallOutcome<()> = with_retry(&RetryPolicy::default(), "test", || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ExternalError::Auth("bad key".into()))
            }
        })
        .await;

        assert!(matches!(outcome, CallOutcome::Permanent(ExternalError::Auth(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(outcome.ok().is_none());
    }
}
