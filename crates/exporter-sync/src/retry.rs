//! Retry with fixed or exponential delays

use crate::Result;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry policy
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum attempts; `None` retries until success
    pub max_attempts: Option<u32>,
    /// Delay after the first failure
    pub initial_delay: Duration,
    /// Delay multiplier between attempts (1.0 keeps the delay fixed)
    pub multiplier: f64,
    /// Upper bound on the delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Some(5),
            initial_delay: Duration::from_millis(100),
            multiplier: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// `attempts` tries spaced by a constant `delay`
    pub fn fixed(attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: Some(attempts),
            initial_delay: delay,
            multiplier: 1.0,
            max_delay: delay,
        }
    }

    /// Retry forever with a constant `delay`
    pub fn unbounded(delay: Duration) -> Self {
        Self {
            max_attempts: None,
            ..Self::fixed(0, delay)
        }
    }

    fn next_delay(&self, current: Duration) -> Duration {
        if self.multiplier <= 1.0 {
            return current;
        }
        std::cmp::min(
            Duration::from_millis((current.as_millis() as f64 * self.multiplier) as u64),
            self.max_delay,
        )
    }

    fn exhausted(&self, attempt: u32) -> bool {
        matches!(self.max_attempts, Some(max) if attempt >= max)
    }
}

fn jitter_duration(duration: Duration) -> Duration {
    let millis = duration.as_millis() as u64;
    if millis == 0 {
        return duration;
    }
    let jitter = rand::thread_rng().gen_range(0.8..1.2);
    let jittered = (millis as f64 * jitter) as u64;
    Duration::from_millis(jittered.max(1))
}

/// Run `operation` until it succeeds or the policy is exhausted
///
/// Returns the first success or the last error. Exponential policies are
/// jittered; fixed ones sleep exactly `initial_delay`.
pub async fn retry<F, Fut, T>(policy: &RetryPolicy, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    let mut delay = policy.initial_delay;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                attempt += 1;
                if policy.exhausted(attempt) {
                    return Err(e);
                }

                warn!("Attempt {} failed, retrying in {:?}: {}", attempt, delay, e);

                let sleep_for = if policy.multiplier > 1.0 {
                    jitter_duration(delay)
                } else {
                    delay
                };
                tokio::time::sleep(sleep_for).await;
                delay = policy.next_delay(delay);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_returns_last_error_when_exhausted() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::fixed(3, Duration::from_secs(1));
        let result: Result<()> = retry(&policy, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move { Err(Error::Network(format!("attempt {n}"))) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result {
            Err(Error::Network(msg)) => assert_eq!(msg, "attempt 2"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_until_success() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::unbounded(Duration::from_millis(10));
        let value = retry(&policy, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 7 {
                    Err(Error::Network("down".into()))
                } else {
                    Ok(n)
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = RetryPolicy::default();
        let mut delay = policy.initial_delay;
        for _ in 0..20 {
            delay = policy.next_delay(delay);
        }
        assert_eq!(delay, policy.max_delay);
        let fixed = RetryPolicy::fixed(5, Duration::from_secs(1));
        assert_eq!(fixed.next_delay(Duration::from_secs(1)), Duration::from_secs(1));
    }
}
