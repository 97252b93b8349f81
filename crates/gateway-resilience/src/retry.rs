//! Same-provider retry with exponential backoff.
//!
//! Moving to the next fallback candidate is the primary recovery path;
//! this policy only re-attempts the *same* provider for transient failures
//! (timeouts, 5xx, transport errors). Client-side rejections are returned
//! immediately.

use gateway_core::GatewayError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Backoff shape; the retry count is chosen per call
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Base delay between retries
    pub base_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Backoff multiplier
    pub multiplier: f64,
    /// Apply up to 25% random jitter
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Retry policy implementation
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Create a new retry policy with the given configuration
    #[must_use]
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Calculate delay for a given attempt (0-indexed)
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.config.base_delay.as_millis() as f64;
        let delay = base * self.config.multiplier.powi(attempt as i32);
        let delay = delay.min(self.config.max_delay.as_millis() as f64);

        let delay = if self.config.jitter && delay > 0.0 {
            let jitter_range = delay * 0.25;
            (delay + rand::thread_rng().gen_range(-jitter_range..=jitter_range)).max(0.0)
        } else {
            delay
        };

        Duration::from_millis(delay as u64)
    }

    /// Check if an error is retryable against the same provider
    #[must_use]
    pub fn is_retryable(&self, error: &GatewayError) -> bool {
        error.is_retryable()
    }

    /// Execute an operation, retrying transient failures up to `max_retries` times
    ///
    /// # Errors
    /// Returns the first non-retryable error, or the last error once retries are exhausted
    pub async fn execute<F, Fut, T>(
        &self,
        max_retries: u32,
        operation: F,
    ) -> Result<T, GatewayError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        debug!(attempt = attempt, "Retry succeeded");
                    }
                    return Ok(result);
                }
                Err(error) => {
                    if attempt >= max_retries || !self.is_retryable(&error) {
                        return Err(error);
                    }

                    let delay = self.delay_for_attempt(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_retries = max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Retrying after error"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Get the configuration
    #[must_use]
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}
