//! Shared phase timing
//!
//! Every timed phase of a session is anchored to a single shared start
//! timestamp. All participants derive "how much time is left" from that
//! one value, so a client reconnecting mid-phase computes the same
//! remaining time as everyone else instead of trusting its own countdown.

use serde::{Deserialize, Serialize};
use web_time::{Duration, SystemTime};

/// A running countdown anchored to a shared start timestamp
///
/// The timer itself never ticks; expiry is a pure function of the start
/// timestamp, the configured duration, and whatever `now` the caller
/// supplies. Duplicate expiry checks from different observers therefore
/// agree with each other.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PhaseTimer {
    /// The shared timestamp marking when the phase began
    started_at: SystemTime,
    /// How long the phase lasts
    duration: Duration,
}

impl PhaseTimer {
    /// Creates a timer that started at `started_at` and runs for `duration`
    pub fn starting_at(started_at: SystemTime, duration: Duration) -> Self {
        Self {
            started_at,
            duration,
        }
    }

    /// The timestamp marking when the phase began
    pub fn started_at(&self) -> SystemTime {
        self.started_at
    }

    /// The configured length of the phase
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Time elapsed since the phase began, as observed at `now`
    ///
    /// An observer whose clock is behind the shared start timestamp sees
    /// zero elapsed time rather than an error, so minor cross-client skew
    /// cannot produce negative durations.
    pub fn elapsed(&self, now: SystemTime) -> Duration {
        now.duration_since(self.started_at)
            .unwrap_or(Duration::ZERO)
    }

    /// Time left before the phase expires, as observed at `now`
    pub fn remaining(&self, now: SystemTime) -> Duration {
        self.duration.saturating_sub(self.elapsed(now))
    }

    /// Whether the phase has run its full duration, as observed at `now`
    pub fn is_expired(&self, now: SystemTime) -> bool {
        self.elapsed(now) >= self.duration
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn base() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000)
    }

    #[test]
    fn test_elapsed_and_remaining() {
        let timer = PhaseTimer::starting_at(base(), Duration::from_secs(20));

        let now = base() + Duration::from_secs(5);
        assert_eq!(timer.elapsed(now), Duration::from_secs(5));
        assert_eq!(timer.remaining(now), Duration::from_secs(15));
        assert!(!timer.is_expired(now));
    }

    #[test]
    fn test_expiry_at_exact_duration() {
        let timer = PhaseTimer::starting_at(base(), Duration::from_secs(20));

        let now = base() + Duration::from_secs(20);
        assert!(timer.is_expired(now));
        assert_eq!(timer.remaining(now), Duration::ZERO);
    }

    #[test]
    fn test_expiry_past_duration() {
        let timer = PhaseTimer::starting_at(base(), Duration::from_secs(20));

        let now = base() + Duration::from_secs(60);
        assert!(timer.is_expired(now));
        assert_eq!(timer.elapsed(now), Duration::from_secs(60));
        assert_eq!(timer.remaining(now), Duration::ZERO);
    }

    #[test]
    fn test_observer_behind_shared_start() {
        let timer = PhaseTimer::starting_at(base(), Duration::from_secs(20));

        let now = base() - Duration::from_secs(3);
        assert_eq!(timer.elapsed(now), Duration::ZERO);
        assert_eq!(timer.remaining(now), Duration::from_secs(20));
        assert!(!timer.is_expired(now));
    }

    #[test]
    fn test_two_observers_agree() {
        let timer = PhaseTimer::starting_at(base(), Duration::from_secs(20));

        let now = base() + Duration::from_secs(21);
        assert_eq!(timer.is_expired(now), timer.is_expired(now));
        assert!(timer.is_expired(now));
    }
}
