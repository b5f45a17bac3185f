//! Persistence seam for sessions and quizzes
//!
//! The session core never owns a database. It writes through a
//! [`SessionStore`], which an embedding server implements over its real
//! backend; [`MemoryStore`] is the in-process implementation used in
//! tests and single-node deployments.
//!
//! Session writes are guarded by a version counter: each write names the
//! version it expects to replace, and a write against a stale version
//! fails instead of clobbering a concurrent writer's update.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use web_time::SystemTime;

use crate::{
    clients::Id,
    game::{GameSession, Phase, State},
    quiz::{Quiz, QuizId},
    registry::Player,
    session_code::SessionCode,
};

/// Errors raised by store operations
#[derive(Error, Debug)]
pub enum Error {
    /// The requested quiz or session does not exist
    #[error("not found in the store")]
    NotFound,
    /// The backend could not be reached or refused the operation
    #[error("store unavailable: {message}")]
    Unavailable {
        /// What the store was doing when it failed
        message: String,
        /// The underlying backend error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// A concurrent writer persisted a newer version first
    #[error("version conflict: expected {expected}, found {actual}")]
    VersionConflict {
        /// The version the writer expected to replace
        expected: u64,
        /// The version actually in the store
        actual: u64,
    },
}

/// The persisted shape of a session
///
/// Only what a reconnecting host or a monitoring view needs: the phase,
/// which question it refers to, and the shared phase-start timestamp
/// that all countdowns derive from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// The quiz the session is playing
    pub quiz_id: QuizId,
    /// The phase the session is in
    pub phase: Phase,
    /// The question the phase refers to, if any
    pub question_index: Option<usize>,
    /// When the current timed phase began, if the phase is timed
    pub started_at: Option<SystemTime>,
}

impl SessionRecord {
    /// Captures the persistable state of a session
    pub fn of(session: &GameSession) -> Self {
        let state = session.state();
        Self {
            quiz_id: session.quiz().id(),
            phase: state.phase(),
            question_index: state.question_index(),
            started_at: match state {
                State::Question { timer, .. } | State::Reveal { timer, .. } => {
                    Some(timer.started_at())
                }
                State::Waiting | State::Leaderboard { .. } | State::Finished => None,
            },
        }
    }
}

/// The persisted shape of one player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    /// The player's display name
    pub name: String,
    /// The player's cumulative score
    pub score: u64,
    /// The option the player chose on the question on screen, if any
    pub last_answer: Option<usize>,
}

impl PlayerRecord {
    /// Captures the persistable state of a player
    pub fn of(player: &Player) -> Self {
        Self {
            name: player.name().to_owned(),
            score: player.score(),
            last_answer: player.last_answer().map(|answer| answer.option),
        }
    }
}

/// Backend storage for quizzes and live sessions
pub trait SessionStore {
    /// Loads a quiz document by ID
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown quiz and
    /// [`Error::Unavailable`] when the backend cannot be reached.
    fn load_quiz(&self, quiz_id: &QuizId) -> Result<Quiz, Error>;

    /// Writes a session record, guarded by the expected stored version
    ///
    /// Pass `expected_version` 0 to create the session. On success the
    /// new stored version (`expected_version + 1`) is returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::VersionConflict`] when the stored version does
    /// not match the expectation and [`Error::Unavailable`] when the
    /// backend cannot be reached; a conflicting write changes nothing.
    fn write_session(
        &mut self,
        code: SessionCode,
        expected_version: u64,
        record: &SessionRecord,
    ) -> Result<u64, Error>;

    /// Writes one player's record under its session
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unavailable`] when the backend cannot be reached.
    fn write_player(
        &mut self,
        code: SessionCode,
        player_id: Id,
        record: &PlayerRecord,
    ) -> Result<(), Error>;

    /// Removes a session and all of its player records
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown session and
    /// [`Error::Unavailable`] when the backend cannot be reached.
    fn remove_session(&mut self, code: SessionCode) -> Result<(), Error>;
}

/// In-process [`SessionStore`] backed by hash maps
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Stored quiz documents
    quizzes: HashMap<QuizId, Quiz>,
    /// Session records with their stored version
    sessions: HashMap<SessionCode, (u64, SessionRecord)>,
    /// Player records keyed by session and player
    players: HashMap<(SessionCode, Id), PlayerRecord>,
}

impl MemoryStore {
    /// Makes a quiz loadable by its ID
    pub fn insert_quiz(&mut self, quiz: Quiz) {
        self.quizzes.insert(quiz.id(), quiz);
    }

    /// The stored version and record of a session, if present
    pub fn session(&self, code: SessionCode) -> Option<&(u64, SessionRecord)> {
        self.sessions.get(&code)
    }

    /// The stored record of a player, if present
    pub fn player(&self, code: SessionCode, player_id: Id) -> Option<&PlayerRecord> {
        self.players.get(&(code, player_id))
    }
}

impl SessionStore for MemoryStore {
    fn load_quiz(&self, quiz_id: &QuizId) -> Result<Quiz, Error> {
        self.quizzes.get(quiz_id).cloned().ok_or(Error::NotFound)
    }

    fn write_session(
        &mut self,
        code: SessionCode,
        expected_version: u64,
        record: &SessionRecord,
    ) -> Result<u64, Error> {
        let actual = self.sessions.get(&code).map_or(0, |(version, _)| *version);
        if actual != expected_version {
            return Err(Error::VersionConflict {
                expected: expected_version,
                actual,
            });
        }

        let version = expected_version + 1;
        self.sessions.insert(code, (version, record.clone()));
        Ok(version)
    }

    fn write_player(
        &mut self,
        code: SessionCode,
        player_id: Id,
        record: &PlayerRecord,
    ) -> Result<(), Error> {
        self.players.insert((code, player_id), record.clone());
        Ok(())
    }

    fn remove_session(&mut self, code: SessionCode) -> Result<(), Error> {
        self.sessions.remove(&code).ok_or(Error::NotFound)?;
        self.players.retain(|(session, _), _| *session != code);
        Ok(())
    }
}
