//! Retry utilities for resilient operations
//!
//! This module provides the retry mechanism with exponential backoff and
//! random jitter used by the SPARQL client.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,

    /// Delay in milliseconds before the first retry
    pub initial_backoff_ms: u64,

    /// Maximum delay in milliseconds (caps exponential growth)
    pub max_backoff_ms: u64,

    /// Multiplier applied to the delay after every failed attempt
    pub backoff_factor: f64,

    /// Upper bound of the uniform random jitter added to every delay
    pub jitter_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 7,
            initial_backoff_ms: 800,
            max_backoff_ms: 10_000,
            backoff_factor: 1.9,
            jitter_ms: 600,
        }
    }
}

impl RetryConfig {
    /// Create a retry configuration with a custom attempt ceiling
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// Retry configuration without any waiting, for tests and dry runs
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
            backoff_factor: 1.0,
            jitter_ms: 0,
        }
    }

    /// Calculate the deterministic part of the delay before retry `attempt` (1-based)
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let delay_ms = if attempt == 0 {
            0
        } else {
            let exponential =
                self.initial_backoff_ms as f64 * self.backoff_factor.powi((attempt - 1) as i32);
            (exponential as u64).min(self.max_backoff_ms)
        };

        Duration::from_millis(delay_ms)
    }

    fn jittered_delay(&self, attempt: u32) -> Duration {
        let jitter = if self.jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=self.jitter_ms)
        };
        self.calculate_delay(attempt) + Duration::from_millis(jitter)
    }
}

/// Execute an operation, retrying only the errors `should_retry` accepts
///
/// The operation runs at most `config.max_attempts` times. A rejected error is
/// returned immediately; once the budget is spent the last error is returned.
pub async fn with_retry_if<T, E, F, Fut, P>(
    config: &RetryConfig,
    operation: F,
    should_retry: P,
) -> Result<T, E>
where
    E: Display,
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!(attempt = attempt, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) => {
                if !should_retry(&e) {
                    warn!(error = %e, "Non-retryable error encountered");
                    return Err(e);
                }

                if attempt >= attempts {
                    warn!(
                        attempts = attempts,
                        error = %e,
                        "Retry budget exhausted"
                    );
                    return Err(e);
                }

                let delay = config.jittered_delay(attempt);
                warn!(
                    attempt = attempt,
                    max_attempts = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Operation failed, will retry"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
