//! Retrying HTTP primitives shared by every adapter.

use std::{fmt::Display, future::Future, time::Duration};

use log::{debug, warn};
use reqwest::Client;
use serde_json::Value as JsonValue;

use crate::error::TransportError;

/// Delay before the retry that follows the given 1-based attempt.
pub type BackoffFn = fn(Duration, u32) -> Duration;

pub fn linear_backoff(base: Duration, attempt: u32) -> Duration {
    base * attempt
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff: BackoffFn,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> RetryPolicy {
        RetryPolicy {
            max_attempts: max_attempts.max(1),
            base_delay,
            backoff: linear_backoff,
        }
    }

    pub fn with_backoff(self, backoff: BackoffFn) -> RetryPolicy {
        RetryPolicy { backoff, ..self }
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(500))
    }
}

/// Runs `op` until it succeeds or the policy's attempts are spent.
///
/// `op` receives the 1-based attempt index. No delay follows the final attempt;
/// the last error is returned as-is.
pub async fn retry_with_backoff<T, E, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, E>
where
    E: Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let attempts = policy.attempts();
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= attempts => return Err(e),
            Err(e) => {
                let delay = (policy.backoff)(policy.base_delay, attempt);
                debug!(
                    "Attempt {}/{} failed: {}, retrying in {:?}",
                    attempt, attempts, e, delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// GETs `url` and parses the body as JSON. Non-2xx statuses count as failures.
pub async fn fetch_json_with_retry(
    client: &Client,
    url: &str,
    policy: &RetryPolicy,
) -> Result<JsonValue, TransportError> {
    retry_with_backoff(policy, |_| async move {
        client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<JsonValue>()
            .await
    })
    .await
    .map_err(|e| {
        let err = TransportError::new(url, policy.attempts(), e.without_url());
        warn!("{}", err);
        err
    })
}

/// GETs `url` and returns the raw body. Non-2xx statuses count as failures.
pub async fn fetch_text_with_retry(
    client: &Client,
    url: &str,
    policy: &RetryPolicy,
) -> Result<String, TransportError> {
    retry_with_backoff(policy, |_| async move {
        client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    })
    .await
    .map_err(|e| {
        let err = TransportError::new(url, policy.attempts(), e.without_url());
        warn!("{}", err);
        err
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use tokio::time::Instant;

    use super::*;

    #[test]
    fn test_linear_backoff() {
        let base = Duration::from_millis(200);
        assert_eq!(linear_backoff(base, 1), Duration::from_millis(200));
        assert_eq!(linear_backoff(base, 3), Duration::from_millis(600));
    }

    #[test]
    fn test_policy_clamps_attempts() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        let started = Instant::now();

        let res: Result<u32, String> = retry_with_backoff(&policy, |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 3 {
                    Err(format!("blip {}", attempt))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(res, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 100ms after attempt 1, 200ms after attempt 2.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(300) && elapsed < Duration::from_millis(350));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_returns_last_error_without_trailing_sleep() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(2, Duration::from_millis(50));
        let started = Instant::now();

        let res: Result<(), String> = retry_with_backoff(&policy, |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Err(format!("failure {}", attempt)) }
        })
        .await;

        assert_eq!(res, Err("failure 2".to_owned()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(50) && elapsed < Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_backoff() {
        let policy = RetryPolicy::new(3, Duration::from_millis(10)).with_backoff(|base, _| base);
        let started = Instant::now();
        let _: Result<(), &str> = retry_with_backoff(&policy, |_| async { Err("down") }).await;
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(20) && elapsed < Duration::from_millis(30));
    }
}
