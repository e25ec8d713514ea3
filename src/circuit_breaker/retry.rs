use super::types::RetryConfig;
use crate::error::CircuitBreakerError;
use backoff::{backoff::Backoff, ExponentialBackoff, ExponentialBackoffBuilder};
use tracing::{debug, warn};

/// Bounded-retry policy with exponential backoff.
///
/// Composes with a circuit breaker by plain function wrapping, never
/// inheritance: `policy.execute_if(|| breaker.execute(..), transient_only)`.
pub struct RetryPolicy {
    config: RetryConfig,
}

/// Retryability predicate for calls going through a circuit breaker.
///
/// Open-circuit rejections are not retried: the dependency is known bad and
/// hammering it defeats the breaker's backpressure. Whether to back off until
/// the carried `retry_after` instead is the caller's decision. Timeouts and
/// upstream errors are treated as transient.
pub fn transient_only<E>(err: &CircuitBreakerError<E>) -> bool {
    !err.is_open()
}

impl RetryPolicy {
    /// Create a new retry policy
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Execute an operation, retrying every failure up to `max_retries` times.
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        self.execute_if(operation, |_| true).await
    }

    /// Execute an operation, retrying only errors the predicate accepts.
    pub async fn execute_if<F, Fut, T, E, P>(
        &self,
        mut operation: F,
        should_retry: P,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        E: std::fmt::Display,
        P: Fn(&E) -> bool,
    {
        let mut backoff = self.backoff();
        let mut attempt = 0;

        loop {
            attempt += 1;

            let err = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "Operation succeeded after retrying");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            if !should_retry(&err) {
                debug!(attempt, error = %err, "Error is not retryable");
                return Err(err);
            }

            if attempt > self.config.max_retries {
                warn!(
                    attempt,
                    max_retries = self.config.max_retries,
                    error = %err,
                    "Giving up after max retries"
                );
                return Err(err);
            }

            match backoff.next_backoff() {
                Some(delay) => {
                    debug!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Operation failed, retrying after backoff"
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    warn!(attempt, error = %err, "Backoff exhausted");
                    return Err(err);
                }
            }
        }
    }

    fn backoff(&self) -> ExponentialBackoff {
        let randomization = if self.config.jitter { 0.5 } else { 0.0 };
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.config.initial_backoff())
            .with_max_interval(self.config.max_backoff())
            .with_multiplier(self.config.backoff_multiplier)
            .with_randomization_factor(randomization)
            .with_max_elapsed_time(None) // max_retries is the only bound
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn fast_config(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_backoff_ms: 10,
            max_backoff_ms: 100,
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }

    #[tokio::test]
    async fn test_succeeds_without_retrying() {
        let policy = RetryPolicy::new(fast_config(3));
        let result = policy.execute(|| async { Ok::<_, String>("done") }).await;
        assert_eq!(result, Ok("done"));
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let policy = RetryPolicy::new(fast_config(3));
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let result = policy
            .execute(|| {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err("flaky".to_string())
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let policy = RetryPolicy::new(fast_config(2));
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let result = policy
            .execute(|| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>("always down".to_string())
                }
            })
            .await;

        assert!(result.is_err());
        // Initial attempt + 2 retries
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_predicate_short_circuits_permanent_errors() {
        let policy = RetryPolicy::new(fast_config(3));
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let result = policy
            .execute_if(
                || {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Err::<(), _>("permanent".to_string())
                    }
                },
                |e| e != "permanent",
            )
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transient_only_rejects_open_circuit() {
        let open: CircuitBreakerError<String> = CircuitBreakerError::Open {
            name: "dep".to_string(),
            retry_after: Duration::from_secs(1),
        };
        let timeout: CircuitBreakerError<String> = CircuitBreakerError::Timeout {
            elapsed: Duration::from_secs(5),
        };
        let upstream = CircuitBreakerError::Inner("reset by peer".to_string());

        assert!(!transient_only(&open));
        assert!(transient_only(&timeout));
        assert!(transient_only(&upstream));
    }

    #[tokio::test]
    async fn test_backoff_delays_without_jitter() {
        let policy = RetryPolicy::new(RetryConfig {
            max_retries: 3,
            initial_backoff_ms: 50,
            max_backoff_ms: 500,
            backoff_multiplier: 2.0,
            jitter: false,
        });

        let start = std::time::Instant::now();
        let _ = policy
            .execute(|| async { Err::<(), _>("down".to_string()) })
            .await;
        let elapsed = start.elapsed();

        // Waits are 50ms + 100ms + 200ms = 350ms; generous upper bound
        // to tolerate scheduler overhead
        assert!(elapsed >= Duration::from_millis(300));
        assert!(elapsed < Duration::from_secs(2));
    }
}
