//! Reconnect policy.
//!
//! The session protocol uses a fixed-interval retry schedule with a hard
//! attempt ceiling. The attempt counter lives in the session worker and
//! persists across cycles until a successful open resets it; this policy only
//! answers whether another attempt is admitted and how long to wait.

use std::time::Duration;

/// Bounded fixed-interval reconnect schedule.
#[derive(Clone, Debug)]
pub struct ReconnectPolicy {
    /// Maximum number of reconnect attempts before the client parks.
    pub max_attempts: u32,
    /// Fixed delay before each attempt.
    pub interval: Duration,
}

impl ReconnectPolicy {
    /// Creates a policy from an attempt ceiling and a fixed interval.
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// Returns whether another attempt is admitted given the attempts already
    /// spent.
    pub fn admits(&self, attempts_spent: u32) -> bool {
        attempts_spent < self.max_attempts
    }

    /// Returns a copy of this policy with a different attempt ceiling.
    ///
    /// Used for per-send ceiling overrides.
    pub fn with_ceiling(&self, max_attempts: u32) -> Self {
        Self {
            max_attempts,
            interval: self.interval,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::ReconnectPolicy;

    #[test]
    fn admits_up_to_ceiling() {
        let policy = ReconnectPolicy::new(2, Duration::from_millis(10));
        assert!(policy.admits(0));
        assert!(policy.admits(1));
        assert!(!policy.admits(2));
        assert!(!policy.admits(3));
    }

    #[test]
    fn zero_ceiling_admits_nothing() {
        let policy = ReconnectPolicy::new(0, Duration::from_millis(10));
        assert!(!policy.admits(0));
    }

    #[test]
    fn ceiling_override_keeps_interval() {
        let policy = ReconnectPolicy::new(2, Duration::from_millis(10));
        let raised = policy.with_ceiling(7);
        assert_eq!(raised.max_attempts, 7);
        assert_eq!(raised.interval, Duration::from_millis(10));
        assert!(raised.admits(6));
    }
}
