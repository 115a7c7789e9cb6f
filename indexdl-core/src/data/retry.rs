//! Retry policy for transient provider failures.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Delay schedule between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Backoff {
    /// Retry immediately.
    None,
    /// Same delay before every retry.
    Fixed { delay_ms: u64 },
    /// `step * n` before retry `n` (1s, 2s, 3s, ...).
    Linear { step_ms: u64 },
    /// `base * 2^(n-1)` before retry `n`.
    Exponential { base_ms: u64 },
}

impl Backoff {
    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let n = attempt.max(1);
        match *self {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed { delay_ms } => Duration::from_millis(delay_ms),
            Backoff::Linear { step_ms } => Duration::from_millis(step_ms.saturating_mul(u64::from(n))),
            Backoff::Exponential { base_ms } => {
                let factor = 1u64.checked_shl(n - 1).unwrap_or(u64::MAX);
                Duration::from_millis(base_ms.saturating_mul(factor))
            }
        }
    }
}

/// How many times to try a request and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first; never below 1 in practice.
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Retries without sleeping; for tests and offline replays.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Backoff::None)
    }

    /// Whether another attempt is allowed after `attempt` attempts have failed.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::Linear { step_ms: 1000 },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_grows_by_step() {
        let b = Backoff::Linear { step_ms: 500 };
        assert_eq!(b.delay(1), Duration::from_millis(500));
        assert_eq!(b.delay(2), Duration::from_millis(1000));
        assert_eq!(b.delay(3), Duration::from_millis(1500));
    }

    #[test]
    fn exponential_doubles() {
        let b = Backoff::Exponential { base_ms: 500 };
        assert_eq!(b.delay(1), Duration::from_millis(500));
        assert_eq!(b.delay(2), Duration::from_millis(1000));
        assert_eq!(b.delay(3), Duration::from_millis(2000));
    }

    #[test]
    fn exponential_saturates() {
        let b = Backoff::Exponential { base_ms: 1000 };
        assert_eq!(b.delay(200), Duration::from_millis(u64::MAX));
    }

    #[test]
    fn fixed_and_none() {
        assert_eq!(Backoff::Fixed { delay_ms: 250 }.delay(7), Duration::from_millis(250));
        assert_eq!(Backoff::None.delay(3), Duration::ZERO);
    }

    #[test]
    fn attempt_bound() {
        let p = RetryPolicy::immediate(3);
        assert!(p.should_retry(1));
        assert!(p.should_retry(2));
        assert!(!p.should_retry(3));
    }

    #[test]
    fn zero_attempts_clamped_to_one() {
        assert_eq!(RetryPolicy::new(0, Backoff::None).max_attempts, 1);
    }

    #[test]
    fn backoff_toml_shape() {
        #[derive(Deserialize)]
        struct Wrapper {
            retry: RetryPolicy,
        }
        let w: Wrapper = toml::from_str(
            r#"
            [retry]
            max_attempts = 5
            backoff = { kind = "exponential", base_ms = 250 }
            "#,
        )
        .unwrap();
        assert_eq!(w.retry.max_attempts, 5);
        assert_eq!(w.retry.backoff, Backoff::Exponential { base_ms: 250 });
    }
}
