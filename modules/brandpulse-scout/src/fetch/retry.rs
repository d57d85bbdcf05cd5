use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::FetchError;

/// Bounded retry: at most `max_attempts` tries, sleeping `base_delay *
/// multiplier^(n-1)` after the n-th failure. A multiplier of 1 gives a fixed
/// delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: u32,
}

impl RetryPolicy {
    pub fn exponential(max_attempts: u32, base_delay: Duration, multiplier: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            multiplier: multiplier.max(1),
        }
    }

    /// Delay after the `attempt`-th failure (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1);
        self.base_delay
            .saturating_mul(self.multiplier.saturating_pow(exp))
    }

    /// Run `op` until it succeeds or attempts run out. `op` receives the
    /// 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, FetchError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_attempts => {
                    let delay = self.delay_after(attempt);
                    warn!(
                        target_label = label,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Fetch attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(FetchError::Exhausted {
                        target: label.to_string(),
                        attempts: attempt,
                        last: Box::new(e),
                    })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn failure(n: u32) -> FetchError {
        FetchError::Navigation {
            url: "https://example.com".into(),
            message: format!("boom {n}"),
        }
    }

    #[test]
    fn exponential_delays() {
        let policy = RetryPolicy::exponential(4, Duration::from_secs(3), 3);
        assert_eq!(policy.delay_after(1), Duration::from_secs(3));
        assert_eq!(policy.delay_after(2), Duration::from_secs(9));
        assert_eq!(policy.delay_after(3), Duration::from_secs(27));
    }

    #[test]
    fn multiplier_of_one_is_a_fixed_delay() {
        let policy = RetryPolicy::exponential(3, Duration::from_secs(5), 1);
        assert_eq!(policy.delay_after(1), Duration::from_secs(5));
        assert_eq!(policy.delay_after(2), Duration::from_secs(5));
    }

    #[test]
    fn zero_attempts_and_multiplier_are_clamped_to_one() {
        let policy = RetryPolicy::exponential(0, Duration::from_secs(2), 0);
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.delay_after(3), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::exponential(3, Duration::ZERO, 1);

        let result = policy
            .run("page", |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 3 {
                        Err(failure(attempt))
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::exponential(2, Duration::ZERO, 1);

        let result: Result<(), _> = policy
            .run("page", |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(failure(attempt)) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        match result {
            Err(FetchError::Exhausted { attempts, last, .. }) => {
                assert_eq!(attempts, 2);
                assert!(last.to_string().contains("boom 2"));
            }
            other => panic!("expected Exhausted, got {other:?}"),
        }
    }
}
