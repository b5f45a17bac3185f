//! Leaderboard rankings and end-of-session statistics
//!
//! Standings are derived from the registry on demand rather than kept as
//! a separate structure, so they can never drift from the scores they
//! rank. Ties are broken by registration order: of two players on the
//! same score, the one who joined earlier ranks higher.

use std::collections::HashMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{CappedList, clients::Id, constants, registry::Registry};

/// One row of the leaderboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// The ranked player
    pub id: Id,
    /// The player's display name
    pub name: String,
    /// The player's cumulative score
    pub score: u64,
}

/// A player's own score and rank
///
/// Sent to players so they can see their performance without receiving
/// the full leaderboard.
#[derive(Debug, Serialize, Clone, Copy)]
pub struct ScoreMessage {
    /// The player's cumulative score
    pub points: u64,
    /// Position in the leaderboard (1-indexed)
    pub position: usize,
}

/// The last two standings, capped for display
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardMessage {
    /// Standings as of now
    pub current: CappedList<Entry>,
    /// Standings before the latest question was scored
    pub prior: CappedList<Entry>,
}

/// Ranks all registered players
///
/// Sorted by score descending; equal scores rank the earlier registrant
/// first.
pub fn standings(registry: &Registry) -> Vec<Entry> {
    registry
        .iter()
        .sorted_by_key(|(_, player)| (std::cmp::Reverse(player.score()), player.seat()))
        .map(|(id, player)| Entry {
            id,
            name: player.name().to_owned(),
            score: player.score(),
        })
        .collect_vec()
}

/// Builds the display message for the given current and prior standings
pub fn message(current: &[Entry], prior: &[Entry]) -> LeaderboardMessage {
    const LIMIT: usize = constants::session::DISPLAY_LIMIT;

    LeaderboardMessage {
        current: CappedList::new(current.iter().cloned(), LIMIT, current.len()),
        prior: CappedList::new(prior.iter().cloned(), LIMIT, prior.len()),
    }
}

/// A player's score and rank within the given standings
///
/// Returns `None` when the player is not ranked.
pub fn score(current: &[Entry], id: Id) -> Option<ScoreMessage> {
    current
        .iter()
        .position(|entry| entry.id == id)
        .map(|position| ScoreMessage {
            points: current[position].score,
            position: position + 1,
        })
}

/// Aggregated statistics for a finished session
///
/// Computed once from the registry when the session finishes and cached
/// by the session, since the underlying histories no longer change.
#[derive(Debug, Clone)]
pub struct FinalSummary {
    /// For each question, how many players earned points and how many did not
    stats: Vec<(usize, usize)>,
    /// For each player, the points they earned on each question
    mapping: HashMap<Id, Vec<u64>>,
}

impl FinalSummary {
    /// Computes the summary from every player's per-question history
    ///
    /// Histories shorter than `question_count` are padded with zeros, so
    /// every player's breakdown covers every question.
    pub fn new(registry: &Registry, question_count: usize) -> Self {
        let mapping: HashMap<Id, Vec<u64>> = registry
            .iter()
            .map(|(id, player)| {
                let mut history = player.history().to_vec();
                history.resize(question_count, 0);
                (id, history)
            })
            .collect();

        let stats = (0..question_count)
            .map(|question| {
                let earned_count = mapping
                    .values()
                    .filter(|history| history[question] > 0)
                    .count();

                (earned_count, mapping.len() - earned_count)
            })
            .collect_vec();

        Self { stats, mapping }
    }

    /// Per-question statistics and the player count, for the host's view
    pub fn host_summary(&self) -> (usize, Vec<(usize, usize)>) {
        (self.mapping.len(), self.stats.clone())
    }

    /// One player's points on each question, in order
    ///
    /// Unknown players get an all-zero breakdown of the right length.
    pub fn player_summary(&self, id: Id) -> Vec<u64> {
        self.mapping
            .get(&id)
            .map_or(vec![0; self.stats.len()], std::clone::Clone::clone)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn registry_with(scores: &[(&str, &[u64])]) -> (Registry, Vec<Id>) {
        let mut registry = Registry::default();
        let mut ids = Vec::new();
        for (name, _) in scores {
            let id = Id::new();
            registry.register(id, name).unwrap();
            ids.push(id);
        }
        let rounds = scores.first().map_or(0, |(_, history)| history.len());
        for round in 0..rounds {
            for (id, (_, history)) in ids.iter().zip(scores) {
                if history[round] > 0 {
                    registry.record_answer(*id, 0, history[round]).unwrap();
                }
            }
            registry.reset_for_next_question();
        }
        (registry, ids)
    }

    #[test]
    fn test_standings_sorted_by_score() {
        let (registry, ids) =
            registry_with(&[("Alice", &[300]), ("Bob", &[900]), ("Carol", &[600])]);

        let standings = standings(&registry);
        assert_eq!(
            standings.iter().map(|e| e.id).collect_vec(),
            vec![ids[1], ids[2], ids[0]]
        );
        assert_eq!(standings[0].score, 900);
    }

    #[test]
    fn test_ties_broken_by_registration_order() {
        let (registry, ids) = registry_with(&[("Alice", &[500]), ("Bob", &[500])]);

        let standings = standings(&registry);
        assert_eq!(standings[0].id, ids[0]);
        assert_eq!(standings[1].id, ids[1]);
    }

    #[test]
    fn test_score_positions_are_one_indexed() {
        let (registry, ids) = registry_with(&[("Alice", &[500]), ("Bob", &[800])]);

        let standings = standings(&registry);
        let alice = score(&standings, ids[0]).unwrap();
        let bob = score(&standings, ids[1]).unwrap();

        assert_eq!((bob.points, bob.position), (800, 1));
        assert_eq!((alice.points, alice.position), (500, 2));
        assert!(score(&standings, Id::new()).is_none());
    }

    #[test]
    fn test_message_caps_entries_but_keeps_count() {
        let mut registry = Registry::default();
        for i in 0..constants::session::DISPLAY_LIMIT + 10 {
            registry.register(Id::new(), &format!("p{i}")).unwrap();
        }

        let current = standings(&registry);
        let message = message(&current, &[]);

        assert_eq!(
            message.current.entries().len(),
            constants::session::DISPLAY_LIMIT
        );
        assert_eq!(
            message.current.exact_count(),
            constants::session::DISPLAY_LIMIT + 10
        );
        assert_eq!(message.prior.exact_count(), 0);
    }

    #[test]
    fn test_final_summary_stats_and_breakdowns() {
        let (registry, ids) = registry_with(&[("Alice", &[800, 0]), ("Bob", &[0, 600])]);

        let summary = FinalSummary::new(&registry, 2);
        let (player_count, stats) = summary.host_summary();

        assert_eq!(player_count, 2);
        assert_eq!(stats, vec![(1, 1), (1, 1)]);
        assert_eq!(summary.player_summary(ids[0]), vec![800, 0]);
        assert_eq!(summary.player_summary(ids[1]), vec![0, 600]);
        assert_eq!(summary.player_summary(Id::new()), vec![0, 0]);
    }

    #[test]
    fn test_final_summary_pads_short_histories() {
        let (registry, ids) = registry_with(&[("Alice", &[700])]);

        let summary = FinalSummary::new(&registry, 3);
        assert_eq!(summary.player_summary(ids[0]), vec![700, 0, 0]);
        assert_eq!(summary.host_summary().1, vec![(1, 0), (0, 1), (0, 1)]);
    }
}
