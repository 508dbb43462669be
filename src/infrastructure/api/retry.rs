use std::future::Future;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use super::errors::ApiError;
use crate::domain::models::RetryConfig;

/// Hard ceiling on attempts per request, whatever the configuration says.
pub const MAX_ATTEMPTS: u32 = 5;

/// Retry policy with jittered exponential backoff
///
/// Transient failures (connection errors, timeouts, 429, 5xx) are retried;
/// everything else is returned on the first attempt. Retrying stops at the
/// attempt cap or once the elapsed-time budget is spent, whichever is first.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
    max_elapsed: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    /// Attempts are clamped to `1..=MAX_ATTEMPTS`, and the backoff cap never
    /// falls below the initial delay.
    pub fn new(
        max_attempts: u32,
        initial_backoff: Duration,
        max_backoff: Duration,
        max_elapsed: Duration,
    ) -> Self {
        Self {
            max_attempts: max_attempts.clamp(1, MAX_ATTEMPTS),
            initial_backoff,
            max_backoff: max_backoff.max(initial_backoff),
            max_elapsed,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.initial_backoff_ms),
            Duration::from_millis(config.max_backoff_ms),
            Duration::from_secs(config.max_elapsed_secs),
        )
    }

    /// Never retry.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO, Duration::ZERO)
    }

    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_backoff)
            .with_max_interval(self.max_backoff)
            .with_randomization_factor(0.5)
            .with_multiplier(2.0)
            .with_max_elapsed_time(Some(self.max_elapsed))
            .build()
    }

    /// A fresh attempt and time budget for one logical request.
    pub fn budget(&self) -> RetryBudget {
        RetryBudget {
            backoff: self.backoff(),
            attempts: 0,
            started: Instant::now(),
        }
    }

    /// Execute an operation with exponential backoff retry logic
    ///
    /// # Example
    /// ```no_run
    /// # use resim::infrastructure::api::retry::RetryPolicy;
    /// # use resim::infrastructure::api::errors::ApiError;
    /// # async fn example() -> Result<String, ApiError> {
    /// let policy = RetryPolicy::default();
    /// let result = policy.execute(|| async { Ok("success".to_string()) }).await?;
    /// # Ok(result)
    /// # }
    /// ```
    pub async fn execute<F, Fut, T>(&self, operation: F) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut budget = self.budget();
        self.execute_within(&mut budget, operation).await
    }

    /// Like [`execute`](Self::execute), but drawing on a budget that earlier
    /// calls may already have spent. The operation always runs at least once.
    pub async fn execute_within<F, Fut, T>(
        &self,
        budget: &mut RetryBudget,
        mut operation: F,
    ) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let first = budget.attempts + 1;
        loop {
            budget.attempts += 1;
            let attempt = budget.attempts;
            match operation().await {
                Ok(value) => {
                    if attempt > first {
                        debug!(attempt, "request succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    let Some(delay) = self.next_delay(budget, &err) else {
                        warn!(attempt, error = %err, "retry time budget exhausted");
                        return Err(err);
                    };
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "transient error, retrying"
                    );
                    sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// The pause before the next attempt, or `None` once the elapsed-time
    /// budget cannot cover it. A server `Retry-After` longer than what is
    /// left ends the retries.
    fn next_delay(&self, budget: &mut RetryBudget, err: &ApiError) -> Option<Duration> {
        let remaining = self.max_elapsed.saturating_sub(budget.started.elapsed());
        if remaining.is_zero() {
            return None;
        }
        let delay = budget.backoff.next_backoff()?;
        let delay = match err.retry_after() {
            Some(hint) if hint > remaining => return None,
            Some(hint) => hint.max(delay),
            None => delay,
        };
        Some(delay.min(remaining))
    }
}

/// Attempts and time already spent on one logical request.
#[derive(Debug)]
pub struct RetryBudget {
    backoff: ExponentialBackoff,
    attempts: u32,
    started: Instant,
}

impl RetryBudget {
    /// Requests sent so far.
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_policy(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(
            attempts,
            Duration::from_millis(1),
            Duration::from_millis(5),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_retries_transient_errors_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let result = fast_policy(5)
            .execute(|| {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(ApiError::from_status(
                            StatusCode::SERVICE_UNAVAILABLE,
                            "busy".into(),
                            None,
                        ))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let result: Result<(), ApiError> = fast_policy(5)
            .execute(|| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(ApiError::from_status(StatusCode::BAD_REQUEST, "bad".into(), None))
                }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_attempts_are_capped() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let result: Result<(), ApiError> = fast_policy(50)
            .execute(|| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(ApiError::Timeout)
                }
            })
            .await;
        assert!(matches!(result, Err(ApiError::Timeout)));
        assert_eq!(calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }

    fn rate_limited(retry_after: Duration) -> ApiError {
        ApiError::from_status(
            StatusCode::TOO_MANY_REQUESTS,
            "slow down".into(),
            Some(retry_after),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_beyond_budget_is_not_honoured() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let policy = RetryPolicy::new(
            5,
            Duration::from_millis(500),
            Duration::from_secs(10),
            Duration::from_secs(60),
        );
        let started = Instant::now();
        let result: Result<(), ApiError> = policy
            .execute(|| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(rate_limited(Duration::from_secs(3600)))
                }
            })
            .await;
        assert!(matches!(result, Err(ApiError::RateLimited { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_within_budget_stays_under_it() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let policy = RetryPolicy::new(
            5,
            Duration::from_millis(500),
            Duration::from_secs(10),
            Duration::from_secs(60),
        );
        let started = Instant::now();
        let result = policy
            .execute(|| {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 4 {
                        Err(rate_limited(Duration::from_secs(25)))
                    } else {
                        Ok(())
                    }
                }
            })
            .await;
        assert!(started.elapsed() <= Duration::from_secs(60));
        // Two waits of 25 s fit; the third hint exceeds what is left.
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_shared_budget_caps_attempts_across_calls() {
        let policy = fast_policy(3);
        let mut budget = policy.budget();
        let first: Result<(), ApiError> = policy
            .execute_within(&mut budget, || async { Err(ApiError::Timeout) })
            .await;
        assert!(first.is_err());
        assert_eq!(budget.attempts(), 3);

        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let second: Result<(), ApiError> = policy
            .execute_within(&mut budget, || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(ApiError::Timeout)
                }
            })
            .await;
        assert!(second.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
