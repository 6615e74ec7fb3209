use std::future::Future;
use std::time::Duration;

use indicatif::ProgressBar;
use thiserror::Error;
use tracing::warn;

use crate::config::RetryConfig;

/// Retry exhaustion: every attempt of `operation` failed.
#[derive(Debug, Error)]
#[error("{operation} failed after {attempts} attempt(s): {source}")]
pub struct FetchError<E> {
    pub operation: String,
    pub attempts: u32,
    #[source]
    pub source: E,
}

/// Bounded-retry wrapper around a fallible remote operation.
///
/// `max_retries` counts extra attempts, so the operation runs at most
/// `max_retries + 1` times. Between attempts the task sleeps for
/// `base_delay * 2^(attempt - 1)`, capped at `max_delay`.
#[derive(Debug, Clone, Copy)]
pub struct RetryingFetcher {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryingFetcher {
    /// Policy for commit metadata calls.
    pub fn for_api(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: config.base_delay(),
            max_delay: config.max_delay(),
        }
    }

    /// Policy for raw file content calls.
    pub fn for_content(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.content_max_retries,
            ..Self::for_api(config)
        }
    }

    pub async fn fetch<T, E, F, Fut>(&self, operation: &str, attempt_fn: F) -> Result<T, FetchError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        self.fetch_tracked(operation, &ProgressBar::hidden(), attempt_fn)
            .await
    }

    /// Like [`fetch`](Self::fetch), but retry warnings are printed with
    /// `progress` suspended so they don't tear the bar.
    pub async fn fetch_tracked<T, E, F, Fut>(
        &self,
        operation: &str,
        progress: &ProgressBar,
        mut attempt_fn: F,
    ) -> Result<T, FetchError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match attempt_fn().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt > self.max_retries => {
                    return Err(FetchError {
                        operation: operation.to_string(),
                        attempts: attempt,
                        source: err,
                    });
                }
                Err(err) => {
                    let delay = self.backoff(attempt);
                    progress.suspend(|| {
                        warn!(
                            operation,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %err,
                            "request failed, retrying"
                        )
                    });
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Delay after the given (1-based) failed attempt.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(30);
        self.base_delay
            .saturating_mul(1u32 << exp)
            .min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn immediate(max_retries: u32) -> RetryingFetcher {
        RetryingFetcher {
            max_retries,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_first_attempt_success() {
        let calls = AtomicU32::new(0);
        let value = immediate(3)
            .fetch("op", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(7)
            })
            .await
            .unwrap();
        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let value = immediate(3)
            .fetch("op", || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(format!("503 on attempt {n}"))
                } else {
                    Ok("body")
                }
            })
            .await
            .unwrap();
        assert_eq!(value, "body");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_surfaces_last_error() {
        let calls = AtomicU32::new(0);
        let err = immediate(2)
            .fetch("fetch commit c1", || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Err::<(), _>(format!("failure {n}"))
            })
            .await
            .unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(err.attempts, 3);
        assert_eq!(err.source, "failure 3");
        assert_eq!(err.operation, "fetch commit c1");
    }

    #[tokio::test]
    async fn test_zero_retries_means_single_attempt() {
        let calls = AtomicU32::new(0);
        let result = immediate(0)
            .fetch("op", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>("down")
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_under_active_progress_bar() {
        let progress = ProgressBar::with_draw_target(Some(4), indicatif::ProgressDrawTarget::hidden());
        progress.inc(1);
        let calls = AtomicU32::new(0);

        let value = immediate(3)
            .fetch_tracked("fetch A.java at c2", &progress, || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(format!("timeout {n}"))
                } else {
                    Ok(n)
                }
            })
            .await
            .unwrap();

        assert_eq!(value, 3);
        assert_eq!(progress.position(), 1);
        assert!(!progress.is_finished());
    }

    #[test]
    fn test_backoff_doubles_until_cap() {
        let fetcher = RetryingFetcher {
            max_retries: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
        };
        assert_eq!(fetcher.backoff(1), Duration::from_millis(100));
        assert_eq!(fetcher.backoff(2), Duration::from_millis(200));
        assert_eq!(fetcher.backoff(3), Duration::from_millis(400));
        assert_eq!(fetcher.backoff(4), Duration::from_millis(500));
        assert_eq!(fetcher.backoff(40), Duration::from_millis(500));
    }

    #[test]
    fn test_policies_from_config() {
        let config = RetryConfig::default();
        assert_eq!(RetryingFetcher::for_api(&config).max_retries, 3);
        assert_eq!(RetryingFetcher::for_content(&config).max_retries, 5);
        assert_eq!(
            RetryingFetcher::for_content(&config).base_delay,
            Duration::from_millis(200)
        );
    }
}
