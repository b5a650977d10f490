//! Retry policy for transient request failures.

use std::time::Duration;

/// Delay strategy between consecutive attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every retry.
    Fixed { delay: Duration },
    /// Delay grows by `base` per completed attempt: `base * attempt`.
    Linear { base: Duration },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Linear {
            base: Duration::from_millis(300),
        }
    }
}

impl Backoff {
    /// Delay to wait after the `attempt`-th failure (1-based).
    pub fn delay(self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay } => delay,
            Self::Linear { base } => base.saturating_mul(attempt.max(1)),
        }
    }
}

/// Retry budget applied to each logical request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts including the first one; at least 1.
    pub max_attempts: u32,
    pub backoff: Backoff,
    /// Statuses outside 5xx that still count as transient.
    pub retry_on_status: Vec<u16>,
    pub retry_on_server_error: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Backoff::default(),
            retry_on_status: vec![408, 429],
            retry_on_server_error: true,
        }
    }
}

impl RetryConfig {
    pub fn linear(max_attempts: u32, base: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Backoff::Linear { base },
            ..Self::default()
        }
    }

    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Backoff::Fixed { delay },
            ..Self::default()
        }
    }

    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn should_retry_status(&self, status: u16) -> bool {
        (self.retry_on_server_error && (500..600).contains(&status))
            || self.retry_on_status.contains(&status)
    }

    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt)
    }
}
