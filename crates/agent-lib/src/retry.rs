//! Fixed-delay retry for remote calls
//!
//! Every remote call in the pipeline is wrapped explicitly at its call site
//! with [`RetryPolicy::run`]. Failures are retried after a constant delay up
//! to a fixed number of attempts; the last error is returned unchanged.

use crate::error::{PollError, Result};
use crate::observability::PollerMetrics;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Default number of attempts per remote call
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default delay between attempts
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Bounded retry with a fixed delay between attempts
#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
    metrics: PollerMetrics,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY)
    }
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("delay", &self.delay)
            .finish()
    }
}

impl RetryPolicy {
    /// Create a policy; an attempt ceiling of 0 is treated as 1
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            metrics: PollerMetrics::new(),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `operation` until it succeeds, fails permanently, or the attempt
    /// ceiling is reached.
    pub async fn run<T, F, Fut>(&self, operation_name: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(
                            operation = %operation_name,
                            attempt = attempt,
                            "Remote call succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(e) if !e.is_retryable() => {
                    debug!(
                        operation = %operation_name,
                        error = %e,
                        "Permanent failure, not retrying"
                    );
                    return Err(e);
                }
                Err(e) if attempt >= self.max_attempts => {
                    warn!(
                        operation = %operation_name,
                        attempts = attempt,
                        error = %e,
                        "Remote call failed, retries exhausted"
                    );
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        operation = %operation_name,
                        attempt = attempt,
                        max_attempts = self.max_attempts,
                        error_kind = e.kind(),
                        error = %e,
                        "Remote call failed, retrying"
                    );
                    self.metrics.inc_retries(operation_name);
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) fn remote_error(message: impl Into<String>) -> PollError {
    PollError::Remote(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn failing_then_ok(failures: u32, calls: &AtomicU32) -> Result<&'static str> {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        if n < failures {
            Err(remote_error(format!("transient failure {}", n + 1)))
        } else {
            Ok("done")
        }
    }

    #[test]
    fn test_retry_policy_default() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 5);
        assert_eq!(policy.delay(), Duration::from_secs(2));
    }

    #[test]
    fn test_zero_attempts_means_one() {
        let policy = RetryPolicy::new(0, Duration::ZERO);
        assert_eq!(policy.max_attempts(), 1);
    }

    #[tokio::test]
    async fn test_succeeds_after_k_failures() {
        let policy = RetryPolicy::new(5, Duration::ZERO);

        for k in 0..5 {
            let counter = AtomicU32::new(0);
            let calls = &counter;
            let result = policy
                .run("retry_test_k", || async move { failing_then_ok(k, calls) })
                .await;

            assert_eq!(result.unwrap(), "done");
            assert_eq!(counter.load(Ordering::SeqCst), k + 1);
        }
    }

    #[tokio::test]
    async fn test_always_failing_stops_after_ceiling() {
        let policy = RetryPolicy::new(5, Duration::ZERO);
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let result: Result<&str> = policy
            .run("retry_test_exhausted", || async move {
                failing_then_ok(u32::MAX, calls)
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(counter.load(Ordering::SeqCst), 5);
        // The last failure surfaces unchanged
        assert_eq!(err.to_string(), "transient failure 5");
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let policy = RetryPolicy::new(5, Duration::ZERO);
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let result: Result<()> = policy
            .run("retry_test_permanent", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(PollError::MalformedLocator {
                    locator: "bad".to_string(),
                    reason: "expected 11 segments, found 1".to_string(),
                })
            })
            .await;

        assert!(matches!(result, Err(PollError::MalformedLocator { .. })));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_delay_between_attempts() {
        let policy = RetryPolicy::default();
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let start = tokio::time::Instant::now();

        let result: Result<&str> = policy
            .run("retry_test_delay", || async move {
                failing_then_ok(u32::MAX, calls)
            })
            .await;

        assert!(result.is_err());
        // Four waits of two seconds between five attempts, no growth
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(8));
        assert!(elapsed < Duration::from_secs(9));
    }

    #[tokio::test]
    async fn test_retries_are_counted() {
        let policy = RetryPolicy::new(3, Duration::ZERO);
        let metrics = PollerMetrics::new();
        let before = metrics.retries("retry_test_counted");
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let _ = policy
            .run("retry_test_counted", || async move { failing_then_ok(2, calls) })
            .await;

        assert_eq!(metrics.retries("retry_test_counted"), before + 2);
    }
}
