//! Player registry for one session
//!
//! The registry is owned by its session and lives exactly as long as it
//! does. It records every registered player's display name, cumulative
//! score, the answer they gave to the question currently on screen, and
//! the points they earned on each finished question.

use std::collections::HashMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    clients::Id,
    names::{self, Names},
};

/// Errors raised by registry operations
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The player already answered the question on screen
    #[error("player already answered this question")]
    AlreadyAnswered,
    /// No player with the given ID is registered
    #[error("player is not registered")]
    UnknownPlayer,
    /// The requested display name was rejected
    #[error(transparent)]
    Name(#[from] names::Error),
}

/// A player's answer to the question currently on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    /// The option index the player chose
    pub option: usize,
    /// The points that choice earned
    pub points: u64,
}

/// One registered player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    /// Validated display name
    name: String,
    /// Cumulative score; never decreases within a session
    score: u64,
    /// Answer to the question currently on screen, if submitted
    last_answer: Option<AnswerRecord>,
    /// Registration sequence number, used to break leaderboard ties
    seat: u64,
    /// Points earned on each finished question, in order
    history: Vec<u64>,
}

impl Player {
    /// The player's display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The player's cumulative score
    pub fn score(&self) -> u64 {
        self.score
    }

    /// The answer submitted for the question on screen, if any
    pub fn last_answer(&self) -> Option<AnswerRecord> {
        self.last_answer
    }

    /// Registration sequence number; earlier joiners have lower seats
    pub fn seat(&self) -> u64 {
        self.seat
    }

    /// Points earned on each finished question, in order
    pub fn history(&self) -> &[u64] {
        &self.history
    }
}

/// All players registered in one session
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Registry {
    /// Registered players by ID
    players: HashMap<Id, Player>,
    /// Display name bookkeeping shared by all players
    names: Names,
    /// Seat number handed to the next registrant
    next_seat: u64,
}

impl Registry {
    /// Whether no players have registered yet
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Number of registered players
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// The player registered under `id`, if any
    pub fn get(&self, id: Id) -> Option<&Player> {
        self.players.get(&id)
    }

    /// Iterates over all registered players
    pub fn iter(&self) -> impl Iterator<Item = (Id, &Player)> {
        self.players.iter().map(|(id, player)| (*id, player))
    }

    /// Registers a new player under `id` with the requested display name
    ///
    /// The player starts with a zero score and no submitted answer. The
    /// session enforces that registration only happens while waiting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Name`] when the display name fails validation or
    /// is already taken.
    pub fn register(&mut self, id: Id, name: &str) -> Result<String, Error> {
        let name = self.names.set_name(id, name)?;

        self.players.insert(
            id,
            Player {
                name: name.clone(),
                score: 0,
                last_answer: None,
                seat: self.next_seat,
                history: Vec::new(),
            },
        );
        self.next_seat += 1;

        Ok(name)
    }

    /// Records an answer and its points for the question on screen
    ///
    /// The score increment is applied together with the answer record,
    /// so a player's score and last answer never disagree. Returns the
    /// player's new cumulative score.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownPlayer`] for an unregistered ID and
    /// [`Error::AlreadyAnswered`] when the player has already answered
    /// the question on screen; neither changes any score.
    pub fn record_answer(&mut self, id: Id, option: usize, points: u64) -> Result<u64, Error> {
        let player = self.players.get_mut(&id).ok_or(Error::UnknownPlayer)?;

        if player.last_answer.is_some() {
            return Err(Error::AlreadyAnswered);
        }

        player.last_answer = Some(AnswerRecord { option, points });
        player.score = player.score.saturating_add(points);

        Ok(player.score)
    }

    /// Number of players who have answered the question on screen
    pub fn answered_count(&self) -> usize {
        self.players
            .values()
            .filter(|player| player.last_answer.is_some())
            .count()
    }

    /// How many players chose each of `option_count` options
    ///
    /// Out-of-range submissions are not counted anywhere; they were
    /// scored as incorrect when recorded.
    pub fn answer_counts(&self, option_count: usize) -> Vec<usize> {
        let counts = self
            .players
            .values()
            .filter_map(|player| player.last_answer)
            .map(|answer| answer.option)
            .counts();

        (0..option_count)
            .map(|option| counts.get(&option).copied().unwrap_or(0))
            .collect_vec()
    }

    /// Folds the question on screen into every player's history
    ///
    /// Players who answered contribute the points they earned; everyone
    /// else contributes zero. Last answers are cleared so the next
    /// question starts fresh. Called exactly once per question boundary.
    pub fn reset_for_next_question(&mut self) {
        for player in self.players.values_mut() {
            let points = player.last_answer.take().map_or(0, |answer| answer.points);
            player.history.push(points);
        }
    }
}
