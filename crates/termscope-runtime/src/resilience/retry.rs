//! Bounded retry policy for analysis stages.

use backon::ConstantBuilder;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Constant-delay retry with a hard attempt cap.
///
/// ```yaml
/// analysis:
///   retry:
///     delay: 500ms
///     max_retries: 1
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Pause before each retry
    #[serde(with = "crate::config::duration_str")]
    pub delay: Duration,

    /// Retries after the first attempt
    pub max_retries: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(500),
            max_retries: 1,
        }
    }
}

impl RetryPolicy {
    pub fn backoff(&self) -> ConstantBuilder {
        ConstantBuilder::default()
            .with_delay(self.delay)
            .with_max_times(self.max_retries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backon::Retryable;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn attempts_for(policy: RetryPolicy) -> usize {
        let calls = AtomicUsize::new(0);
        let result: Result<(), &str> = (|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err("always fails")
        })
        .retry(policy.backoff())
        .sleep(tokio::time::sleep)
        .await;

        assert!(result.is_err());
        calls.load(Ordering::SeqCst)
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_retries_once() {
        assert_eq!(attempts_for(RetryPolicy::default()).await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_retries_makes_one_call() {
        let policy = RetryPolicy {
            max_retries: 0,
            ..Default::default()
        };
        assert_eq!(attempts_for(policy).await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_is_waited_between_attempts() {
        let policy = RetryPolicy {
            delay: Duration::from_secs(3),
            max_retries: 2,
        };
        let start = tokio::time::Instant::now();
        assert_eq!(attempts_for(policy).await, 3);
        assert!(start.elapsed() >= Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_errors_stop_immediately() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), &str> = (|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err("permanent")
        })
        .retry(RetryPolicy::default().backoff())
        .sleep(tokio::time::sleep)
        .when(|e| *e != "permanent")
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_policy_from_yaml() {
        let policy: RetryPolicy = serde_yaml::from_str("delay: 2s\nmax_retries: 3\n").unwrap();
        assert_eq!(policy.delay, Duration::from_secs(2));
        assert_eq!(policy.max_retries, 3);

        let partial: RetryPolicy = serde_yaml::from_str("max_retries: 0\n").unwrap();
        assert_eq!(partial.delay, Duration::from_millis(500));
    }
}
