use crate::config::FeedConfig;
use std::time::Duration;

/// Exponential reconnect schedule: `min(max_delay, base_delay * 2^attempt)`.
///
/// `attempt` counts consecutive failures and is reset by [`Backoff::reset`]
/// whenever a connection is established.
#[derive(Debug, Clone)]
pub struct Backoff {
    base_delay: Duration,
    max_delay: Duration,
    max_attempts: Option<u32>,
    attempt: u32,
}

impl Backoff {
    pub fn new(base_delay: Duration, max_delay: Duration, max_attempts: Option<u32>) -> Self {
        Self {
            base_delay,
            max_delay,
            max_attempts,
            attempt: 0,
        }
    }

    pub fn from_config(config: &FeedConfig) -> Self {
        let max_attempts = if config.auto_reconnect {
            config.max_attempts
        } else {
            Some(0)
        };
        Self::new(config.base_delay, config.max_delay, max_attempts)
    }

    /// Delay for a given zero-based attempt, ignoring the attempt ceiling.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Records a failure and returns the delay before the next retry, or
    /// `None` once the ceiling has been reached.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if let Some(max) = self.max_attempts {
            if self.attempt >= max {
                return None;
            }
        }
        let delay = self.delay_for(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        Some(delay)
    }

    /// Number of retries scheduled since the last successful connection.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}
