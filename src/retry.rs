//! Retry with bounded exponential backoff
//!
//! Every fetch strategy and the transcript façade run through the same
//! executor. An attempt fails when the operation returns an error or when
//! its value does not pass the validity check (an empty list or a blank
//! string counts as a failure even though nothing was thrown).
//!
//! **Backoff Strategy:**
//! - Delay before attempt `n + 1`: `base_delay * factor^(n - 1)`
//! - Default factor: 1.5
//! - A `should_retry` predicate can stop early on non-transient errors

use crate::error::{Result, TranscriptError};
use crate::config::RetryConfig;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default number of attempts
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay before the first retry
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);

/// Default multiplicative growth of the delay per attempt
pub const DEFAULT_BACKOFF_FACTOR: f64 = 1.5;

/// Longest delay slept between two attempts
pub const MAX_BACKOFF: Duration = Duration::from_secs(300);

/// Decides whether an operation's value counts as a usable result
pub trait Validity {
    fn is_valid(&self) -> bool;
}

impl<T> Validity for Vec<T> {
    fn is_valid(&self) -> bool {
        !self.is_empty()
    }
}

impl Validity for String {
    fn is_valid(&self) -> bool {
        !self.trim().is_empty()
    }
}

impl Validity for &str {
    fn is_valid(&self) -> bool {
        !self.trim().is_empty()
    }
}

/// Predicate over the last error and the 1-based attempt number
pub type RetryPredicate = Arc<dyn Fn(&TranscriptError, u32) -> bool + Send + Sync>;

/// Stateless retry-with-backoff executor
#[derive(Clone)]
pub struct RetryExecutor {
    operation: String,
    max_attempts: u32,
    base_delay: Duration,
    backoff_factor: f64,
    should_retry: Option<RetryPredicate>,
}

impl std::fmt::Debug for RetryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryExecutor")
            .field("operation", &self.operation)
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("backoff_factor", &self.backoff_factor)
            .field("should_retry", &self.should_retry.is_some())
            .finish()
    }
}

impl RetryExecutor {
    /// Create an executor for the named operation
    pub fn new(operation: impl Into<String>, max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            operation: operation.into(),
            max_attempts: max_attempts.max(1),
            base_delay,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
            should_retry: None,
        }
    }

    /// Create an executor from the retry section of the configuration
    pub fn from_config(operation: impl Into<String>, max_attempts: u32, config: &RetryConfig) -> Self {
        Self::new(operation, max_attempts, Duration::from_millis(config.base_delay_ms))
            .with_backoff_factor(config.backoff_factor)
    }

    /// Override the delay growth factor (values below 1.0 are clamped to 1.0)
    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = if factor.is_finite() { factor.max(1.0) } else { DEFAULT_BACKOFF_FACTOR };
        self
    }

    /// Only retry when the predicate accepts the last error
    pub fn with_should_retry<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&TranscriptError, u32) -> bool + Send + Sync + 'static,
    {
        self.should_retry = Some(Arc::new(predicate));
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay slept after the given failed attempt, capped at [`MAX_BACKOFF`]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let seconds = self.base_delay.as_secs_f64() * self.backoff_factor.powi(exponent);
        Duration::try_from_secs_f64(seconds)
            .unwrap_or(MAX_BACKOFF)
            .min(MAX_BACKOFF)
    }

    /// Run the operation, treating values that fail [`Validity`] as failures
    pub async fn run<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        T: Validity,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.run_validated(operation, |value: &T| value.is_valid()).await
    }

    /// Run the operation with a caller-supplied validity predicate
    pub async fn run_validated<T, F, Fut, V>(&self, mut operation: F, is_valid: V) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        V: Fn(&T) -> bool,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;

            let error = match operation().await {
                Ok(value) if is_valid(&value) => {
                    if attempt > 1 {
                        debug!(operation = %self.operation, attempt, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Ok(_) => TranscriptError::InvalidResult { attempt },
                Err(err) => err,
            };

            if let Some(should_retry) = &self.should_retry {
                if !should_retry(&error, attempt) {
                    debug!(
                        operation = %self.operation,
                        attempt,
                        error = %error,
                        "Error is not retryable, giving up"
                    );
                    return Err(error);
                }
            }

            if attempt >= self.max_attempts {
                warn!(
                    operation = %self.operation,
                    attempts = attempt,
                    error = %error,
                    "Retries exhausted"
                );
                return Err(TranscriptError::RetryExhausted {
                    attempts: attempt,
                    last_error: Box::new(error),
                });
            }

            let backoff = self.delay_for_attempt(attempt);
            warn!(
                operation = %self.operation,
                attempt,
                backoff_ms = backoff.as_millis() as u64,
                error = %error,
                "Attempt failed, will retry after backoff"
            );
            tokio::time::sleep(backoff).await;
        }
    }
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new("operation", DEFAULT_MAX_ATTEMPTS, DEFAULT_BASE_DELAY)
    }
}
