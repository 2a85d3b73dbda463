//! Batch-get backoff
//!
//! Real backends may return a subset of a batch as "unprocessed" under
//! load; clients are expected to retry the remainder with exponential
//! backoff. The reference store reproduces that shape behind a test knob
//! so retry loops can be exercised without a live backend.

use std::time::Duration;

/// Exponential backoff between batch-get retry rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Delay before the first retry; doubled each round after
    pub base: Duration,
    /// Retry rounds after the initial attempt
    pub max_retries: u32,
}

impl BackoffPolicy {
    /// Delay before retry round `attempt` (zero-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base * 2u32.saturating_pow(attempt)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(10),
            max_retries: 5,
        }
    }
}

/// Test knob making the next `rounds` batch-get rounds leave half of the
/// requested keys unprocessed.
#[derive(Debug, Default)]
pub(crate) struct UnprocessedSimulation {
    rounds: u32,
}

impl UnprocessedSimulation {
    pub(crate) fn new(rounds: u32) -> Self {
        Self { rounds }
    }

    /// Whether this round should shed keys; consumes one round if so.
    pub(crate) fn take_round(&mut self) -> bool {
        if self.rounds > 0 {
            self.rounds -= 1;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_doubles_per_round() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay(0), Duration::from_millis(10));
        assert_eq!(policy.delay(1), Duration::from_millis(20));
        assert_eq!(policy.delay(3), Duration::from_millis(80));
    }

    #[test]
    fn test_simulation_consumes_rounds() {
        let mut sim = UnprocessedSimulation::new(2);
        assert!(sim.take_round());
        assert!(sim.take_round());
        assert!(!sim.take_round());
        assert!(!sim.take_round());
    }
}
