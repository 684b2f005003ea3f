// Retry and timeout handling for store calls
use crate::application::constants::{
    DEFAULT_RETRY_BACKOFF_FACTOR, DEFAULT_RETRY_BASE_DELAY_MS, DEFAULT_RETRY_MAX_ATTEMPTS,
    MAX_RETRY_DELAY,
};
use crate::error::{AppError, Result};
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

/// Retry decision result
#[derive(Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Try again after the given delay
    Retry(Duration),
    /// Stop and surface the last error
    GiveUp,
}

/// Bounded exponential backoff for transient store failures
///
/// Only errors for which [`AppError::is_transient`] holds are retried.
/// Writes never go through this policy: a join or leave whose outcome is
/// unknown is surfaced to the caller instead of being replayed.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    base_delay_ms: u64,
    backoff_factor: f64,
    max_attempts: u32,
}

impl RetryPolicy {
    /// Create a new retry policy
    ///
    /// `max_attempts` counts the first try, so `1` disables retries.
    pub fn new(base_delay_ms: u64, backoff_factor: f64, max_attempts: u32) -> Self {
        Self {
            base_delay_ms,
            backoff_factor: backoff_factor.max(1.0),
            max_attempts: max_attempts.max(1),
        }
    }

    /// Policy that never retries
    pub fn no_retry() -> Self {
        Self::new(0, 1.0, 1)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Decide what to do after `failures` consecutive failed attempts
    ///
    /// delay = base_delay * (backoff_factor ^ (failures - 1)) * (1.0 ± 0.1)
    ///
    /// The jitter is derived from `seed`. Reads pass the destination id so
    /// retries against different destinations do not wake up in lockstep.
    pub fn decide(&self, failures: u32, seed: &str) -> RetryDecision {
        if failures >= self.max_attempts {
            return RetryDecision::GiveUp;
        }

        let exponent = failures.saturating_sub(1).min(i32::MAX as u32) as i32;
        let base_delay_ms = self.base_delay_ms as f64 * self.backoff_factor.powi(exponent);

        let jitter_seed = seed
            .chars()
            .fold(0u32, |h, c| h.wrapping_mul(31).wrapping_add(c as u32));
        let jitter_factor = 0.9 + ((jitter_seed % 21) as f64 / 100.0); // 0.9 to 1.1

        let delay = Duration::from_millis((base_delay_ms * jitter_factor) as u64);
        RetryDecision::Retry(delay.min(MAX_RETRY_DELAY))
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out
    pub async fn run<T, F, Fut>(&self, operation: &str, op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.run_keyed(operation, operation, op).await
    }

    /// Like [`RetryPolicy::run`], with the jitter seeded by `key`
    pub async fn run_keyed<T, F, Fut>(&self, operation: &str, key: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut failures = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() => {
                    failures += 1;
                    match self.decide(failures, key) {
                        RetryDecision::Retry(delay) => {
                            info!(
                                operation,
                                key,
                                attempt = failures,
                                delay_ms = delay.as_millis() as u64,
                                error = %e,
                                "Transient store failure, retrying"
                            );
                            tokio::time::sleep(delay).await;
                        }
                        RetryDecision::GiveUp => {
                            warn!(
                                operation,
                                attempts = failures,
                                error = %e,
                                "Giving up after transient store failures"
                            );
                            return Err(e);
                        }
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_RETRY_BASE_DELAY_MS,
            DEFAULT_RETRY_BACKOFF_FACTOR,
            DEFAULT_RETRY_MAX_ATTEMPTS,
        )
    }
}

/// Bound a store call by `limit`
///
/// An elapsed deadline is reported as [`AppError::TransientStore`].
pub async fn with_timeout<T>(
    limit: Duration,
    operation: &str,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!(
                operation,
                timeout_ms = limit.as_millis() as u64,
                "Store call timed out"
            );
            Err(AppError::TransientStore(format!(
                "{} timed out after {}ms",
                operation,
                limit.as_millis()
            )))
        }
    }
}
