//! Wait strategies between execution state checks.

use std::time::Duration;

/// Bounds for one wait for a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Base delay between state checks.
    pub poll_interval: Duration,
    /// Maximum total wait before giving up.
    pub timeout: Duration,
}

impl PollPolicy {
    /// Creates a new poll policy.
    pub fn new(poll_interval: Duration, timeout: Duration) -> Self {
        Self {
            poll_interval,
            timeout,
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(300))
    }
}

/// Decides how long to wait before the next state check.
///
/// `attempt` is zero for the wait after the first non-terminal check.
pub trait WaitStrategy: Send + Sync {
    fn next_delay(&self, attempt: u32, poll_interval: Duration) -> Duration;
}

/// Always waits exactly the poll interval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixedInterval;

impl WaitStrategy for FixedInterval {
    fn next_delay(&self, _attempt: u32, poll_interval: Duration) -> Duration {
        poll_interval
    }
}

/// Multiplies the poll interval by `factor` after every check, up to `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialBackoff {
    factor: f64,
    max_delay: Duration,
}

impl ExponentialBackoff {
    /// Creates a backoff strategy. Factors below 1.0 are treated as 1.0.
    pub fn new(factor: f64, max_delay: Duration) -> Self {
        Self {
            factor: factor.max(1.0),
            max_delay,
        }
    }
}

impl WaitStrategy for ExponentialBackoff {
    fn next_delay(&self, attempt: u32, poll_interval: Duration) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = poll_interval.as_secs_f64() * self.factor.powi(exponent);

        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs)
    }
}
