//! Bounded exponential-backoff retry for store reads.
//!
//! `with_retries` runs an async operation up to `max_attempts` times. Between
//! failed attempts it sleeps `base_delay * 2^(attempt-1)`, capped at
//! `max_delay`. Only errors reporting `is_retryable()` are retried; anything
//! else is returned as-is on the first occurrence.
//!
//! Dropping the returned future stops the loop at its next await point, but
//! an abandoned caller has no way to signal the operation itself.

use crate::config::RetrySettings;
use crate::error::{DataError, DataResult};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Retry policy configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// Cap for exponential growth.
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            base_delay: Duration::from_millis(settings.base_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
        }
    }

    /// A policy that gives up after the first failure.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Attempts actually made. A zero setting still runs the operation once.
    pub fn effective_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay after failed attempt number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Whether a failure on attempt number `attempt` deserves another attempt.
    pub fn should_retry(&self, error: &DataError, attempt: u32) -> bool {
        error.is_retryable() && attempt < self.effective_attempts()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(&RetrySettings::default())
    }
}

/// Suspends the retry loop between attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Returns immediately and remembers every requested delay.
#[derive(Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

pub async fn with_retries<T, F, Fut>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    operation: &str,
    mut op: F,
) -> DataResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = DataResult<T>>,
{
    let mut attempt: u32 = 1;
    loop {
        let error = match op().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!("{} succeeded on attempt {}", operation, attempt);
                }
                return Ok(value);
            }
            Err(error) => error,
        };

        if !error.is_retryable() {
            return Err(error);
        }
        if !policy.should_retry(&error, attempt) {
            error!(
                "{} failed after {} attempts: {}",
                operation, attempt, error
            );
            return Err(DataError::RetriesExhausted {
                operation: operation.to_string(),
                attempts: attempt,
                source: Box::new(error),
            });
        }

        let delay = policy.backoff(attempt);
        warn!(
            "{} attempt {}/{} failed: {}. Retrying in {:?}",
            operation,
            attempt,
            policy.effective_attempts(),
            error,
            delay
        );
        sleeper.sleep(delay).await;
        attempt += 1;
    }
}
