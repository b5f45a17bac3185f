//! Point calculation for answered questions
//!
//! Scoring is a pure function of two inputs: whether the chosen option
//! was correct, and how much time passed between the question going up
//! and the answer arriving. Elapsed time is always measured against the
//! shared phase-start timestamp by whichever side performs the write,
//! never taken from a client's own stopwatch.

use serde::{Deserialize, Serialize};
use web_time::Duration;

use crate::constants;

/// Serialization helper for [`ScoringPolicy`]
#[serde_with::serde_as]
#[derive(Deserialize)]
struct ScoringPolicySerde {
    max_points: u64,
    floor_points: u64,
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    question_duration: Duration,
}

/// How points are awarded for a session
///
/// A correct answer earns `max_points` when submitted instantly and
/// decays linearly to `floor_points` at twice the question duration.
/// The floor stays above zero so a correct answer always outscores an
/// incorrect one, which is worth nothing at any speed.
#[serde_with::serde_as]
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(from = "ScoringPolicySerde")]
pub struct ScoringPolicy {
    /// Points for a correct answer at zero elapsed time
    max_points: u64,
    /// Points a correct answer decays to at twice the question duration
    floor_points: u64,
    /// Nominal time players have to answer a question
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    question_duration: Duration,
}

impl From<ScoringPolicySerde> for ScoringPolicy {
    fn from(serde: ScoringPolicySerde) -> Self {
        let ScoringPolicySerde {
            max_points,
            floor_points,
            question_duration,
        } = serde;
        // Stored documents go through the same clamp as `new`, so the
        // decay can never slope upward.
        Self::new(max_points, floor_points, question_duration)
    }
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            max_points: constants::scoring::MAX_POINTS,
            floor_points: constants::scoring::FLOOR_POINTS,
            question_duration: Duration::from_secs(constants::timing::QUESTION_SECONDS),
        }
    }
}

impl ScoringPolicy {
    /// Creates a policy with explicit limits
    ///
    /// A floor above the maximum is clamped down to it so the decay can
    /// never slope upward.
    pub fn new(max_points: u64, floor_points: u64, question_duration: Duration) -> Self {
        Self {
            max_points,
            floor_points: floor_points.min(max_points),
            question_duration,
        }
    }

    /// Nominal time players have to answer a question
    pub fn question_duration(&self) -> Duration {
        self.question_duration
    }

    /// Points earned for an answer
    ///
    /// Incorrect answers earn zero regardless of speed. Correct answers
    /// decay linearly from the maximum at zero elapsed time to the floor
    /// at twice the question duration; elapsed times beyond that window
    /// are clamped to it. Strictly greater elapsed time never earns
    /// strictly greater points.
    pub fn points(&self, correct: bool, elapsed: Duration) -> u64 {
        if !correct {
            return 0;
        }

        let window = self.question_duration.saturating_mul(2);
        if window.is_zero() {
            return self.max_points;
        }

        let fraction = (elapsed.as_secs_f64() / window.as_secs_f64()).clamp(0., 1.);
        let spread = (self.max_points - self.floor_points) as f64;

        self.floor_points + (spread * (1. - fraction)).round() as u64
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn policy() -> ScoringPolicy {
        ScoringPolicy::new(1000, 100, Duration::from_secs(20))
    }

    #[test]
    fn test_instant_correct_answer_earns_maximum() {
        assert_eq!(policy().points(true, Duration::ZERO), 1000);
    }

    #[test]
    fn test_incorrect_answer_earns_nothing() {
        let policy = policy();
        assert_eq!(policy.points(false, Duration::ZERO), 0);
        assert_eq!(policy.points(false, Duration::from_secs(10)), 0);
        assert_eq!(policy.points(false, Duration::from_secs(300)), 0);
    }

    #[test]
    fn test_decay_reaches_floor_at_double_duration() {
        let policy = policy();
        assert_eq!(policy.points(true, Duration::from_secs(40)), 100);
        // Clamped beyond the window
        assert_eq!(policy.points(true, Duration::from_secs(500)), 100);
    }

    #[test]
    fn test_halfway_point_is_midway() {
        // At the nominal duration (half the decay window) the score sits
        // halfway between max and floor.
        assert_eq!(policy().points(true, Duration::from_secs(20)), 550);
    }

    #[test]
    fn test_monotonically_non_increasing() {
        let policy = policy();
        let mut previous = u64::MAX;
        for secs in 0..=45 {
            let points = policy.points(true, Duration::from_secs(secs));
            assert!(
                points <= previous,
                "score increased from {previous} to {points} at {secs}s"
            );
            previous = points;
        }
    }

    #[test]
    fn test_correct_always_beats_incorrect() {
        let policy = policy();
        for secs in [0, 5, 20, 40, 100] {
            let elapsed = Duration::from_secs(secs);
            assert!(policy.points(true, elapsed) > policy.points(false, elapsed));
        }
    }

    #[test]
    fn test_floor_clamped_to_maximum() {
        let policy = ScoringPolicy::new(100, 500, Duration::from_secs(20));
        assert_eq!(policy.points(true, Duration::ZERO), 100);
        assert_eq!(policy.points(true, Duration::from_secs(40)), 100);
    }

    #[test]
    fn test_deserialized_floor_above_maximum_is_clamped() {
        let policy: ScoringPolicy = serde_json::from_str(
            r#"{"max_points":100,"floor_points":500,"question_duration":20000}"#,
        )
        .unwrap();

        assert_eq!(policy.points(true, Duration::from_secs(1)), 100);
        assert_eq!(policy.points(true, Duration::from_secs(40)), 100);
    }

    #[test]
    fn test_zero_duration_policy_awards_maximum() {
        let policy = ScoringPolicy::new(1000, 100, Duration::ZERO);
        assert_eq!(policy.points(true, Duration::from_secs(1)), 1000);
    }
}
