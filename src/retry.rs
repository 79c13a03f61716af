//! Retry logic for transient channel failures
//!
//! The deployed policy is deliberately conservative: a timeout-class failure
//! on initiation gets exactly one retry after a short backoff (the trigger
//! service can be slow after several back-to-back calls); every other failure
//! is terminal for that number. Retryability is a structured property of the
//! error value, not a substring match on error text.

use crate::config::RetryConfig;
use crate::error::Error;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (request timeouts, slow trigger service) should return
/// `true`. Permanent failures (invalid number, rejected trigger, unreachable
/// channel) should return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            // The bounded request timeout is the one transient failure class
            Error::RequestTimeout(_) => true,
            Error::Network(e) => e.is_timeout(),
            Error::Io(e) => matches!(e.kind(), std::io::ErrorKind::TimedOut),
            // Connectivity-level failures abort the batch instead of retrying
            Error::Unreachable(_) => false,
            // Application-level rejections are permanent for that number
            Error::Initiation(_) | Error::Termination(_) => false,
            Error::InvalidNumber(_) => false,
            Error::Config { .. } => false,
            Error::ContactList(_) => false,
            Error::Serialization(_) => false,
            Error::NotSupported(_) => false,
            Error::Other(_) => false,
        }
    }
}

/// Execute an async operation with bounded retry and backoff
///
/// Retries only errors that classify retryable via [`IsRetryable`], up to
/// `config.max_attempts` additional tries, sleeping between attempts with
/// exponential backoff capped at `config.max_delay` (plus optional jitter).
/// With the default [`RetryConfig`] this is the deployed "retry a timeout
/// exactly once after 2 seconds" policy.
pub async fn call_with_retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!(attempts = attempt + 1, "operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < config.max_attempts => {
                attempt += 1;

                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis(),
                    "transient failure, retrying"
                );

                let jittered_delay = if config.jitter { add_jitter(delay) } else { delay };
                tokio::time::sleep(jittered_delay).await;

                let next_delay =
                    Duration::from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier);
                delay = next_delay.min(config.max_delay);
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        error = %e,
                        attempts = attempt + 1,
                        "operation failed after all retry attempts exhausted"
                    );
                } else {
                    tracing::error!(error = %e, "operation failed with non-retryable error");
                }
                return Err(e);
            }
        }
    }
}

/// Add random jitter to a delay
///
/// Uniformly distributed between 0% and 100% of the delay, so the actual
/// delay falls between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_config(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(50),
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }

    #[tokio::test]
    async fn success_is_not_retried() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = call_with_retry(&fast_config(1), || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Error>(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 1, "should only call once");
    }

    #[tokio::test]
    async fn timeout_is_retried_exactly_once_by_default() {
        let config = RetryConfig {
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(10),
            ..Default::default()
        };
        assert_eq!(config.max_attempts, 1);

        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = call_with_retry(&config, || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(Error::RequestTimeout(Duration::from_secs(20)))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(
            counter.load(Ordering::SeqCst),
            2,
            "initial try + exactly one retry"
        );
    }

    #[tokio::test]
    async fn retry_after_timeout_can_succeed() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = call_with_retry(&fast_config(1), || {
            let counter = counter_clone.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(Error::RequestTimeout(Duration::from_secs(20)))
                } else {
                    Ok(())
                }
            }
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn non_retryable_error_fails_immediately() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = call_with_retry(&fast_config(3), || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(Error::Initiation("trigger returned status 500".to_string()))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(
            counter.load(Ordering::SeqCst),
            1,
            "application-level rejection must not be retried"
        );
    }

    #[tokio::test]
    async fn backoff_waits_between_attempts() {
        let config = RetryConfig {
            max_attempts: 1,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(50),
            backoff_multiplier: 1.0,
            jitter: false,
        };

        let start = std::time::Instant::now();
        let _result = call_with_retry(&config, || async {
            Err::<i32, _>(Error::RequestTimeout(Duration::from_secs(20)))
        })
        .await;

        assert!(
            start.elapsed() >= Duration::from_millis(50),
            "should back off before the retry, waited {:?}",
            start.elapsed()
        );
    }

    #[test]
    fn request_timeout_is_retryable() {
        assert!(Error::RequestTimeout(Duration::from_secs(20)).is_retryable());
    }

    #[test]
    fn io_timeout_is_retryable() {
        let err = Error::Io(std::io::Error::new(std::io::ErrorKind::TimedOut, "timeout"));
        assert!(err.is_retryable());
    }

    #[test]
    fn unreachable_is_not_retryable() {
        assert!(
            !Error::Unreachable("cannot reach trigger service".to_string()).is_retryable(),
            "connectivity failures abort the batch, they are not retried per-number"
        );
    }

    #[test]
    fn permanent_errors_are_not_retryable() {
        assert!(!Error::InvalidNumber("abc".to_string()).is_retryable());
        assert!(!Error::Initiation("rejected".to_string()).is_retryable());
        assert!(!Error::Termination("keyevent failed".to_string()).is_retryable());
        assert!(
            !Error::Config {
                message: "bad config".to_string(),
                key: None,
            }
            .is_retryable()
        );
        assert!(!Error::NotSupported("no terminate".to_string()).is_retryable());
        assert!(!Error::Other("unknown problem".to_string()).is_retryable());
    }

    #[test]
    fn add_jitter_stays_within_bounds_over_many_iterations() {
        let delay = Duration::from_millis(50);
        for i in 0..200 {
            let jittered = add_jitter(delay);
            assert!(
                jittered >= delay,
                "iteration {i}: jittered {jittered:?} < base delay {delay:?}"
            );
            assert!(
                jittered <= delay * 2,
                "iteration {i}: jittered {jittered:?} > 2x base delay"
            );
        }
    }
}
