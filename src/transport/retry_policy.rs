//! Retry policy for transient transport failures.
//!
//! Implements exponential backoff with configurable parameters.

use std::time::Duration;

use crate::config::TransportSettings;
use crate::transport::TransportError;

/// Retry policy implementing exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Backoff before the first retry, in milliseconds.
    pub initial_backoff_ms: u64,
    /// Cap for exponential growth, in milliseconds.
    pub max_backoff_ms: u64,
    /// Multiplier applied to backoff after each retry.
    pub backoff_multiplier: f64,
}

impl RetryPolicy {
    /// Create a new RetryPolicy from configuration settings.
    pub fn new(settings: &TransportSettings) -> Self {
        Self {
            max_retries: settings.retries,
            initial_backoff_ms: settings.initial_backoff_ms,
            max_backoff_ms: settings.max_backoff_ms,
            backoff_multiplier: settings.backoff_multiplier,
        }
    }

    /// Policy that never waits, for tests and probing tools.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
            backoff_multiplier: 1.0,
        }
    }

    /// Backoff after failed attempt number `attempt` (0-based):
    /// `initial_backoff * multiplier^attempt`, capped at `max_backoff_ms`.
    pub fn backoff_ms(&self, attempt: u32) -> u64 {
        let backoff = self.initial_backoff_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        backoff.min(self.max_backoff_ms as f64) as u64
    }

    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_ms(attempt))
    }

    /// Check if an error should be retried given the number of attempts made.
    ///
    /// Returns true if:
    /// - The error is transient (timeout, connection, 5xx)
    /// - Fewer than `max_retries` retries happened so far
    pub fn should_retry(&self, error: &TransportError, attempt: u32) -> bool {
        error.is_retryable() && attempt < self.max_retries
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff_ms: 600,
            max_backoff_ms: 10_000,
            backoff_multiplier: 2.0,
        }
    }
}
