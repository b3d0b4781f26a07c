//! Backoff policy for failed delivery attempts.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How retry delays grow between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backoff {
    /// Same delay every time.
    Fixed,
    /// Doubles per attempt, capped at `max_delay`.
    Exponential,
}

/// Retry behavior for a job.
///
/// The default suits notice delivery: a flaky mail relay usually recovers
/// within a few doubling delays, and four attempts keeps the queue from
/// hammering a relay that is down for good.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff: Backoff,
    /// 0.0..=1.0; spreads retries out so a burst of failures does not come
    /// back in lockstep.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(30),
            backoff: Backoff::Exponential,
            jitter: 0.15,
        }
    }
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay: delay,
            max_delay: delay,
            backoff: Backoff::Fixed,
            jitter: 0.0,
        }
    }

    /// Whether another attempt is allowed after `attempt` tries.
    pub fn can_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Delay before the given attempt (1-indexed).
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let Some(exponent) = attempt.checked_sub(1) else {
            return Duration::ZERO;
        };

        let base = self.base_delay.as_millis() as u64;
        let cap = self.max_delay.as_millis() as u64;
        let raw = match self.backoff {
            Backoff::Fixed => base,
            Backoff::Exponential => base.saturating_mul(1u64 << exponent.min(20)).min(cap),
        };

        // Deterministic spread derived from the attempt number; enough to
        // de-synchronize retries without pulling in a RNG.
        let unit = (((attempt * 17) % 100) as f64 / 100.0 - 0.5) * 2.0;
        let spread = raw as f64 * self.jitter * unit;

        Duration::from_millis((raw as f64 + spread).max(0.0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_delays_double_up_to_the_cap() {
        let policy = RetryPolicy {
            max_attempts: 8,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
            backoff: Backoff::Exponential,
            jitter: 0.0,
        };

        assert_eq!(policy.next_delay(1), Duration::from_millis(100));
        assert_eq!(policy.next_delay(2), Duration::from_millis(200));
        assert_eq!(policy.next_delay(3), Duration::from_millis(400));
        assert_eq!(policy.next_delay(4), Duration::from_millis(500));
        assert_eq!(policy.next_delay(5), Duration::from_millis(500));
    }

    #[test]
    fn fixed_delays_stay_flat() {
        let policy = RetryPolicy::fixed(3, Duration::from_millis(250));

        assert_eq!(policy.next_delay(1), Duration::from_millis(250));
        assert_eq!(policy.next_delay(2), Duration::from_millis(250));
        assert_eq!(policy.next_delay(3), Duration::from_millis(250));
    }

    #[test]
    fn retry_budget_is_bounded_by_max_attempts() {
        let policy = RetryPolicy {
            max_attempts: 3,
            ..Default::default()
        };

        assert!(policy.can_retry(0));
        assert!(policy.can_retry(2));
        assert!(!policy.can_retry(3));
        assert!(!policy.can_retry(7));
    }
}
