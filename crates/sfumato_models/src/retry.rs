//! Exponential backoff policy for remote calls.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounded exponential backoff.
///
/// Attempt `n` (1-based) that fails transiently is followed by a wait of
/// `base_delay * 2^(n-1)` before attempt `n + 1`.
///
/// # Examples
///
/// ```
/// use sfumato_models::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::new(3, Duration::from_millis(100));
/// let delays: Vec<_> = policy.delays().collect();
/// assert_eq!(delays, vec![Duration::from_millis(100), Duration::from_millis(200)]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    max_attempts: u32,
    /// Wait after the first failure
    base_delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy. `max_attempts` below 1 is raised to 1.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Policy that never retries.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Waits between consecutive attempts.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + use<> {
        let base = self.base_delay;
        (0..self.max_attempts.saturating_sub(1))
            .map(move |n| base.saturating_mul(2u32.saturating_pow(n)))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1000))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_doubles_from_one_second() {
        let delays: Vec<_> = RetryPolicy::default().delays().collect();
        assert_eq!(delays, vec![Duration::from_secs(1), Duration::from_secs(2)]);
    }

    #[test]
    fn single_attempt_has_no_delays() {
        assert_eq!(RetryPolicy::none().delays().count(), 0);
        assert_eq!(*RetryPolicy::new(0, Duration::from_secs(1)).max_attempts(), 1);
    }
}
