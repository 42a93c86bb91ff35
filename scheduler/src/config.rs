//! Configuration for the scheduler.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the rate-limited scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Maximum number of task starts within any single window.
    pub window_cap: usize,

    /// Duration of the rate window.
    pub window_duration: Duration,

    /// Base delay for exponential backoff.
    pub base_delay: Duration,

    /// Upper bound on a single backoff delay.
    pub max_delay: Duration,

    /// Maximum number of times a task is attempted before it is failed.
    pub max_attempts: u32,
}

impl SchedulerConfig {
    /// Set the rate window cap.
    pub fn with_window_cap(mut self, cap: usize) -> Self {
        self.window_cap = cap;
        self
    }

    /// Set the rate window duration.
    pub fn with_window_duration(mut self, duration: Duration) -> Self {
        self.window_duration = duration;
        self
    }

    /// Set the backoff base delay.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set the backoff delay ceiling.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the attempt budget.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Backoff delay after the given zero-based attempt:
    /// `min(max_delay, base_delay * 2^attempt)`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            window_cap: 12,
            window_duration: Duration::from_secs(60),
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            max_attempts: 5,
        }
    }
}
