// Retry logic for store operations issued by the ingestion pipeline
use crate::error::{AppError, Result};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::application::worker::constants::{
    DEFAULT_BACKOFF_FACTOR, DEFAULT_STORE_RETRY_ATTEMPTS, DEFAULT_STORE_RETRY_BASE_DELAY_MS,
};

/// Retry decision result
#[derive(Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the operation (with backoff delay in ms)
    Retry(u64),
    /// Do not retry, the error is final
    GiveUp,
}

/// Bounded retry with exponential backoff
///
/// Determines whether a failed store call should be attempted again based on:
/// - Whether the error is transient
/// - Attempts made so far versus `max_attempts`
/// - Backoff factor for exponential delay
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay_ms: u64,
    backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_STORE_RETRY_ATTEMPTS,
            DEFAULT_STORE_RETRY_BASE_DELAY_MS,
        )
    }
}

impl RetryPolicy {
    /// Create a new retry policy
    ///
    /// # Arguments
    /// * `max_attempts` - Total attempts including the first one (minimum 1)
    /// * `base_delay_ms` - Delay before the first retry
    pub fn new(max_attempts: u32, base_delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay_ms,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
        }
    }

    /// Policy that never retries
    pub fn no_retry() -> Self {
        Self::new(1, 0)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Decide what to do after `attempt` (1-based) failed with `err`
    ///
    /// Backoff formula:
    /// delay = base_delay * (backoff_factor ^ (attempt - 1)) * jitter
    ///
    /// Jitter is in [0.9, 1.1], seeded by the job id so that concurrent jobs hitting the
    /// same fault do not retry in lockstep.
    pub fn decide(&self, job_id: &str, attempt: u32, err: &AppError) -> RetryDecision {
        if !err.is_transient() || attempt >= self.max_attempts {
            return RetryDecision::GiveUp;
        }

        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let base_delay_ms = self.base_delay_ms as f64 * self.backoff_factor.powi(exponent);

        let jitter_seed = job_id.chars().map(|c| c as u32).sum::<u32>();
        let jitter_factor = 0.9 + ((jitter_seed % 21) as f64 / 100.0);

        RetryDecision::Retry((base_delay_ms * jitter_factor) as u64)
    }

    /// Run `op` until it succeeds, fails permanently or attempts run out
    pub async fn run<T, F, Fut>(&self, job_id: &str, op_name: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) => match self.decide(job_id, attempt, &err) {
                    RetryDecision::Retry(delay_ms) => {
                        warn!(
                            job_id = %job_id,
                            op = op_name,
                            attempt,
                            delay_ms,
                            error = %err,
                            "Store operation failed, retrying"
                        );
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                        attempt += 1;
                    }
                    RetryDecision::GiveUp => {
                        debug!(job_id = %job_id, op = op_name, attempt, "Giving up on store operation");
                        return Err(err);
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_backoff_grows_exponentially() {
        let policy = RetryPolicy::new(5, 100);
        let err = AppError::Database("busy".to_string());

        let delays: Vec<u64> = (1..=3)
            .map(|attempt| match policy.decide("job", attempt, &err) {
                RetryDecision::Retry(ms) => ms,
                RetryDecision::GiveUp => panic!("expected retry"),
            })
            .collect();

        assert!(delays[0] >= 90 && delays[0] <= 110);
        assert!(delays[1] >= 180 && delays[1] <= 220);
        assert!(delays[2] >= 360 && delays[2] <= 440);
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let policy = RetryPolicy::new(3, 10);
        let err = AppError::Database("busy".to_string());

        assert!(matches!(policy.decide("job", 2, &err), RetryDecision::Retry(_)));
        assert_eq!(policy.decide("job", 3, &err), RetryDecision::GiveUp);
    }

    #[test]
    fn test_non_transient_errors_not_retried() {
        let policy = RetryPolicy::new(3, 10);
        let err = AppError::NotFound("job".to_string());

        assert_eq!(policy.decide("job", 1, &err), RetryDecision::GiveUp);
    }

    #[tokio::test]
    async fn test_run_retries_until_success() {
        let policy = RetryPolicy::new(3, 1);
        let calls = AtomicU32::new(0);

        let result = policy
            .run("job", "append", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(AppError::Database("busy".to_string()))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_run_returns_last_error() {
        let policy = RetryPolicy::new(2, 1);
        let calls = AtomicU32::new(0);

        let result: Result<()> = policy
            .run("job", "append", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AppError::Database("down".to_string())) }
            })
            .await;

        assert!(matches!(result, Err(AppError::Database(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
