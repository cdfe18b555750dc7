//! Poll Policy
//!
//! Configuration governing how often and how many times a pending job is
//! re-checked before giving up. Backoff is parametrized rather than
//! hardcoded per call site.

use serde::{Deserialize, Serialize};
use std::time::Duration;

// =============================================================================
// Backoff
// =============================================================================

/// Delay schedule between poll attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum Backoff {
    /// Same delay before every attempt
    Fixed { interval: Duration },
    /// Delay grows by `step` per attempt, saturating at `cap`
    Linear {
        base: Duration,
        step: Duration,
        cap: Duration,
    },
    /// Delay doubles per attempt, saturating at `cap`
    Exponential { base: Duration, cap: Duration },
}

impl Backoff {
    /// Fixed-interval schedule
    pub fn fixed(interval: Duration) -> Self {
        Backoff::Fixed { interval }
    }

    /// Delay before poll attempt `attempt` (0-based). Pure and total:
    /// overflow saturates at the cap.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self {
            Backoff::Fixed { interval } => *interval,
            Backoff::Linear { base, step, cap } => {
                let extra = step.checked_mul(attempt).unwrap_or(*cap);
                base.saturating_add(extra).min(*cap)
            }
            Backoff::Exponential { base, cap } => 2u32
                .checked_pow(attempt)
                .and_then(|factor| base.checked_mul(factor))
                .unwrap_or(*cap)
                .min(*cap),
        }
    }
}

// =============================================================================
// Poll Policy
// =============================================================================

/// Poll loop configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    /// Delay schedule between attempts
    pub backoff: Backoff,
    /// Maximum number of poll calls before the job times out
    pub max_attempts: u32,
    /// When set, a transport failure during one poll cycle is treated as
    /// Pending for that cycle only. Provider rejections and malformed
    /// responses are always fatal.
    pub tolerate_transient_errors: bool,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            backoff: Backoff::fixed(Duration::from_secs(2)),
            max_attempts: 60,
            tolerate_transient_errors: false,
        }
    }
}

impl PollPolicy {
    /// Fixed-interval policy
    pub fn fixed(interval: Duration, max_attempts: u32) -> Self {
        Self {
            backoff: Backoff::fixed(interval),
            max_attempts,
            ..Default::default()
        }
    }

    /// Sets the backoff schedule
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Sets the attempt budget
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Opts in to treating transport failures as Pending for one cycle
    pub fn tolerating_transient_errors(mut self) -> Self {
        self.tolerate_transient_errors = true;
        self
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Backoff Tests
    // =========================================================================

    #[test]
    fn test_fixed_backoff() {
        let backoff = Backoff::fixed(Duration::from_secs(3));
        assert_eq!(backoff.delay_for(0), Duration::from_secs(3));
        assert_eq!(backoff.delay_for(59), Duration::from_secs(3));
    }

    #[test]
    fn test_linear_backoff() {
        let backoff = Backoff::Linear {
            base: Duration::from_secs(1),
            step: Duration::from_secs(2),
            cap: Duration::from_secs(10),
        };
        assert_eq!(backoff.delay_for(0), Duration::from_secs(1));
        assert_eq!(backoff.delay_for(1), Duration::from_secs(3));
        assert_eq!(backoff.delay_for(4), Duration::from_secs(9));
        // Saturates at the cap
        assert_eq!(backoff.delay_for(5), Duration::from_secs(10));
        assert_eq!(backoff.delay_for(u32::MAX), Duration::from_secs(10));
    }

    #[test]
    fn test_exponential_backoff() {
        let backoff = Backoff::Exponential {
            base: Duration::from_secs(1),
            cap: Duration::from_secs(30),
        };
        assert_eq!(backoff.delay_for(0), Duration::from_secs(1));
        assert_eq!(backoff.delay_for(1), Duration::from_secs(2));
        assert_eq!(backoff.delay_for(3), Duration::from_secs(8));
        // Saturates at the cap, including for attempts where 2^n overflows
        assert_eq!(backoff.delay_for(5), Duration::from_secs(30));
        assert_eq!(backoff.delay_for(40), Duration::from_secs(30));
        assert_eq!(backoff.delay_for(u32::MAX), Duration::from_secs(30));
    }

    // =========================================================================
    // PollPolicy Tests
    // =========================================================================

    #[test]
    fn test_policy_default() {
        let policy = PollPolicy::default();
        assert_eq!(policy.backoff, Backoff::fixed(Duration::from_secs(2)));
        assert_eq!(policy.max_attempts, 60);
        assert!(!policy.tolerate_transient_errors);
    }

    #[test]
    fn test_policy_builder() {
        let policy = PollPolicy::fixed(Duration::from_secs(5), 12)
            .with_backoff(Backoff::Exponential {
                base: Duration::from_secs(1),
                cap: Duration::from_secs(16),
            })
            .with_max_attempts(8)
            .tolerating_transient_errors();

        assert_eq!(policy.max_attempts, 8);
        assert!(policy.tolerate_transient_errors);
        assert_eq!(policy.backoff.delay_for(2), Duration::from_secs(4));
    }

    #[test]
    fn test_policy_serialization() {
        let policy = PollPolicy::fixed(Duration::from_secs(2), 30);
        let json = serde_json::to_string(&policy).unwrap();
        let deserialized: PollPolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, policy);
    }
}
