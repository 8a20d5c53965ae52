//! Retry utilities with exponential backoff for resilient service calls.
//!
//! Retry state lives inside a single [`with_retry`] call; nothing is shared
//! between calls.

use std::time::Duration;
use tokio::time::{sleep, timeout};

use crate::sources::SourceError;

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, the first one included
    pub max_attempts: u32,
    /// Initial delay between retries
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Bound on the whole call, attempts and delays included
    pub max_total_time: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(8),
            backoff_multiplier: 2.0,
            max_total_time: Duration::from_secs(90),
        }
    }
}

impl RetryConfig {
    /// Delay to wait after the given (one-based) failed attempt
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp_delay = self.initial_delay.as_secs_f64()
            * self
                .backoff_multiplier
                .powf(attempt.saturating_sub(1) as f64);
        Duration::from_secs_f64(exp_delay.min(self.max_delay.as_secs_f64()))
    }
}

/// Transient errors that should trigger a retry
#[derive(Debug, Clone, PartialEq)]
pub enum TransientError {
    /// Network connectivity issues
    Network,
    /// Request timeout
    Timeout,
    /// Server error (5xx)
    ServerError(u16),
}

impl TransientError {
    /// Check if a SourceError represents a transient error
    ///
    /// Challenges and 4xx responses are permanent: retrying a challenge only
    /// deepens the block.
    pub fn from_source_error(err: &SourceError) -> Option<Self> {
        match err {
            SourceError::Network(_) => Some(TransientError::Network),
            SourceError::Timeout(_) => Some(TransientError::Timeout),
            SourceError::Http { status, .. } if *status >= 500 => {
                Some(TransientError::ServerError(*status))
            }
            _ => None,
        }
    }
}

/// Execute an async operation with retry logic
///
/// Transient failures are retried with exponential backoff until
/// `max_attempts` is reached; anything else is returned immediately. The
/// whole call, delays included, is bounded by `max_total_time`.
pub async fn with_retry<T, F, Fut>(config: RetryConfig, operation: F) -> Result<T, SourceError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, SourceError>>,
{
    match timeout(config.max_total_time, retry_loop(config, operation)).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!("Call abandoned after {:?}", config.max_total_time);
            Err(SourceError::Timeout(format!(
                "no response within {:?}",
                config.max_total_time
            )))
        }
    }
}

async fn retry_loop<T, F, Fut>(config: RetryConfig, mut operation: F) -> Result<T, SourceError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, SourceError>>,
{
    let mut attempts = 0;

    loop {
        attempts += 1;

        match operation().await {
            Ok(result) => {
                if attempts > 1 {
                    tracing::info!(
                        "Operation succeeded on attempt {} after {} transient failures",
                        attempts,
                        attempts - 1
                    );
                }
                return Ok(result);
            }
            Err(error) => {
                let Some(transient) = TransientError::from_source_error(&error) else {
                    return Err(error);
                };

                if attempts >= config.max_attempts {
                    tracing::warn!("Operation failed after {} attempts: {}", attempts, error);
                    return Err(error);
                }

                let delay = config.delay_for_attempt(attempts);
                tracing::debug!(
                    "Transient error on attempt {}: {:?}, retrying in {:?}",
                    attempts,
                    transient,
                    delay
                );
                sleep(delay).await;
            }
        }
    }
}
