//! Host-side session driving and persistence
//!
//! A [`HostDriver`] pairs one [`GameSession`] with the store it persists
//! to. Every successful mutation is mirrored into the store before the
//! driver reports success: phase advances as versioned session writes,
//! joins and answers as player writes.
//!
//! Advances are single-flight. While one advance's store write is still
//! unresolved (the backend was unreachable), further advances are
//! refused rather than queued, so a host mashing the next button cannot
//! pile up writes that would land out of order.

use thiserror::Error;
use web_time::{Duration, SystemTime};

use crate::{
    channel::Channel,
    clients::Id,
    game::{self, AlarmMessage, GameSession, Phase},
    quiz::{self, QuizId},
    scoring::ScoringPolicy,
    session_code::SessionCode,
    store::{self, PlayerRecord, SessionRecord, SessionStore},
};

/// How many random codes to try before giving up on creating a session
const CODE_ATTEMPTS: usize = 16;

/// Errors raised when driving a session
#[derive(Error, Debug)]
pub enum Error {
    /// A previous advance is still waiting on the store
    #[error("a phase advance is still being persisted")]
    AdvanceInFlight,
    /// The session refused the operation
    #[error(transparent)]
    Game(#[from] game::Error),
    /// The store refused the operation
    #[error(transparent)]
    Store(#[from] store::Error),
    /// The stored quiz failed validation
    #[error(transparent)]
    Quiz(#[from] quiz::Error),
}

/// One host's session together with its persistence
#[derive(Debug)]
pub struct HostDriver<S> {
    /// The backing store
    store: S,
    /// The session being driven
    session: GameSession,
    /// The session version last seen in the store
    observed_version: u64,
    /// A session record that failed to persist and awaits a retry
    pending: Option<SessionRecord>,
}

impl<S: SessionStore> HostDriver<S> {
    /// Creates a session for the given quiz and persists it
    ///
    /// The quiz is loaded from the store and re-validated before any
    /// session exists, so a session can never hold unplayable content.
    /// A fresh random code is drawn until one is free in the store.
    ///
    /// # Errors
    ///
    /// * [`Error::Store`] - the quiz is unknown, the store is
    ///   unreachable, or no free code was found
    /// * [`Error::Quiz`] - the stored quiz fails validation
    pub fn create(
        mut store: S,
        quiz_id: &QuizId,
        host_id: Id,
        scoring: ScoringPolicy,
    ) -> Result<Self, Error> {
        let quiz = store.load_quiz(quiz_id)?;
        quiz.check()?;

        // A fresh session always persists as waiting with no question.
        let record = SessionRecord {
            quiz_id: quiz.id(),
            phase: Phase::Waiting,
            question_index: None,
            started_at: None,
        };

        let mut attempts = CODE_ATTEMPTS;
        let (code, observed_version) = loop {
            let code = SessionCode::new();
            match store.write_session(code, 0, &record) {
                Ok(version) => break (code, version),
                // An occupied code; draw another.
                Err(store::Error::VersionConflict { .. }) if attempts > 1 => attempts -= 1,
                Err(error) => return Err(error.into()),
            }
        };

        Ok(Self {
            store,
            session: GameSession::new(code, quiz, host_id, scoring),
            observed_version,
            pending: None,
        })
    }

    /// The session being driven
    pub fn session(&self) -> &GameSession {
        &self.session
    }

    /// The session being driven, for routing client traffic through it
    pub fn session_mut(&mut self) -> &mut GameSession {
        &mut self.session
    }

    /// The backing store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The session version last seen in the store
    pub fn observed_version(&self) -> u64 {
        self.observed_version
    }

    /// Whether an advance's store write is still unresolved
    pub fn has_pending_write(&self) -> bool {
        self.pending.is_some()
    }

    /// Advances the session and persists the new phase
    ///
    /// The session transition is applied first; a transition the session
    /// refuses leaves the store untouched. If the store write then fails
    /// because the backend is unreachable, the local state keeps the new
    /// phase and the write is kept for [`HostDriver::retry_pending`];
    /// until it resolves, further advances are refused.
    ///
    /// # Errors
    ///
    /// * [`Error::AdvanceInFlight`] - an earlier write is unresolved
    /// * [`Error::Game`] - the session refused the transition
    /// * [`Error::Store`] - persisting failed; a version conflict means
    ///   another writer advanced the stored session first
    pub fn advance<C: Channel, F: Fn(Id) -> Option<C>, A: FnMut(AlarmMessage, Duration)>(
        &mut self,
        expected: Phase,
        now: SystemTime,
        schedule_message: A,
        channel_finder: F,
    ) -> Result<Phase, Error> {
        if self.pending.is_some() {
            return Err(Error::AdvanceInFlight);
        }

        let phase = self
            .session
            .advance(expected, now, schedule_message, channel_finder)?;

        let record = SessionRecord::of(&self.session);
        match self
            .store
            .write_session(self.session.code(), self.observed_version, &record)
        {
            Ok(version) => {
                self.observed_version = version;
                Ok(phase)
            }
            Err(error @ store::Error::Unavailable { .. }) => {
                self.pending = Some(record);
                Err(error.into())
            }
            Err(store::Error::VersionConflict { expected, actual }) => {
                // Another writer owns the stored session now; adopt its
                // version so the next write is judged against reality.
                self.observed_version = actual;
                Err(store::Error::VersionConflict { expected, actual }.into())
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Retries the session write left over from a failed advance
    ///
    /// Returns whether a write was actually pending.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] when the retry fails too; the write stays
    /// pending only if the store is still unreachable.
    pub fn retry_pending(&mut self) -> Result<bool, Error> {
        let Some(record) = self.pending.clone() else {
            return Ok(false);
        };

        match self
            .store
            .write_session(self.session.code(), self.observed_version, &record)
        {
            Ok(version) => {
                self.observed_version = version;
                self.pending = None;
                Ok(true)
            }
            Err(error @ store::Error::Unavailable { .. }) => Err(error.into()),
            Err(store::Error::VersionConflict { expected, actual }) => {
                self.observed_version = actual;
                self.pending = None;
                Err(store::Error::VersionConflict { expected, actual }.into())
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Registers a player and persists their record
    ///
    /// # Errors
    ///
    /// * [`Error::Game`] - the session has started, is locked, or the
    ///   name was rejected
    /// * [`Error::Store`] - the player record could not be written
    pub fn join(&mut self, player_id: Id, name: &str) -> Result<String, Error> {
        let validated = self.session.register_player(player_id, name)?;
        self.write_player(player_id)?;
        Ok(validated)
    }

    /// Records a player's answer and persists their updated record
    ///
    /// # Errors
    ///
    /// * [`Error::Game`] - the answer was late, duplicate, or from an
    ///   unknown player
    /// * [`Error::Store`] - the player record could not be written
    pub fn submit_answer<C: Channel, F: Fn(Id) -> Option<C>>(
        &mut self,
        player_id: Id,
        option: usize,
        now: SystemTime,
        channel_finder: F,
    ) -> Result<u64, Error> {
        let points = self
            .session
            .submit_answer(player_id, option, now, channel_finder)?;
        self.write_player(player_id)?;
        Ok(points)
    }

    /// Removes the stored session once it has finished
    ///
    /// Returns whether anything was removed; a session still in play is
    /// left alone.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] when the removal fails.
    pub fn remove_if_done(&mut self) -> Result<bool, Error> {
        if !self.session.is_done() {
            return Ok(false);
        }
        self.store.remove_session(self.session.code())?;
        Ok(true)
    }

    fn write_player(&mut self, player_id: Id) -> Result<(), Error> {
        if let Some(player) = self.session.registry().get(player_id) {
            self.store.write_player(
                self.session.code(),
                player_id,
                &PlayerRecord::of(player),
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::{
        game::{SyncMessage, UpdateMessage},
        quiz::{Question, Quiz},
        registry,
        store::MemoryStore,
    };

    struct NullChannel;

    impl Channel for NullChannel {
        fn send_update(&self, _: &UpdateMessage) {}
        fn send_sync(&self, _: &SyncMessage) {}
        fn close(self) {}
    }

    fn no_channel(_: Id) -> Option<NullChannel> {
        None
    }

    fn no_alarm(_: AlarmMessage, _: Duration) {}

    /// Fails the next `failures` session writes as if the backend were down.
    struct FlakyStore {
        inner: MemoryStore,
        failures: usize,
    }

    impl SessionStore for FlakyStore {
        fn load_quiz(&self, quiz_id: &QuizId) -> Result<Quiz, store::Error> {
            self.inner.load_quiz(quiz_id)
        }

        fn write_session(
            &mut self,
            code: SessionCode,
            expected_version: u64,
            record: &SessionRecord,
        ) -> Result<u64, store::Error> {
            if self.failures > 0 {
                self.failures -= 1;
                return Err(store::Error::Unavailable {
                    message: "writing session".to_owned(),
                    source: Box::new(std::io::Error::other("injected outage")),
                });
            }
            self.inner.write_session(code, expected_version, record)
        }

        fn write_player(
            &mut self,
            code: SessionCode,
            player_id: Id,
            record: &PlayerRecord,
        ) -> Result<(), store::Error> {
            self.inner.write_player(code, player_id, record)
        }

        fn remove_session(&mut self, code: SessionCode) -> Result<(), store::Error> {
            self.inner.remove_session(code)
        }
    }

    fn store_with_quiz(questions: usize) -> (MemoryStore, QuizId) {
        let mut store = MemoryStore::default();
        let quiz = Quiz::new(
            QuizId::new(),
            "Driven",
            (0..questions)
                .map(|i| {
                    Question::new(
                        format!("question {i}"),
                        vec!["a".to_owned(), "b".to_owned()],
                        0,
                    )
                    .unwrap()
                })
                .collect(),
        )
        .unwrap();
        let quiz_id = quiz.id();
        store.insert_quiz(quiz);
        (store, quiz_id)
    }

    fn now() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000)
    }

    #[test]
    fn test_create_persists_waiting_session() {
        let (store, quiz_id) = store_with_quiz(1);
        let driver =
            HostDriver::create(store, &quiz_id, Id::new(), ScoringPolicy::default()).unwrap();

        assert_eq!(driver.observed_version(), 1);
        let (version, record) = driver.store().session(driver.session().code()).unwrap();
        assert_eq!(*version, 1);
        assert_eq!(record.phase, Phase::Waiting);
        assert_eq!(record.quiz_id, quiz_id);
    }

    #[test]
    fn test_create_unknown_quiz() {
        let (store, _) = store_with_quiz(1);
        let result =
            HostDriver::create(store, &QuizId::new(), Id::new(), ScoringPolicy::default());

        assert!(matches!(result, Err(Error::Store(store::Error::NotFound))));
    }

    #[test]
    fn test_advance_persists_new_phase() {
        let (store, quiz_id) = store_with_quiz(1);
        let mut driver =
            HostDriver::create(store, &quiz_id, Id::new(), ScoringPolicy::default()).unwrap();
        driver.join(Id::new(), "Alice").unwrap();

        let phase = driver
            .advance(Phase::Waiting, now(), no_alarm, no_channel)
            .unwrap();
        assert_eq!(phase, Phase::Question);
        assert_eq!(driver.observed_version(), 2);

        let (_, record) = driver.store().session(driver.session().code()).unwrap();
        assert_eq!(record.phase, Phase::Question);
        assert_eq!(record.question_index, Some(0));
        assert_eq!(record.started_at, Some(now()));
    }

    #[test]
    fn test_refused_transition_writes_nothing() {
        let (store, quiz_id) = store_with_quiz(1);
        let mut driver =
            HostDriver::create(store, &quiz_id, Id::new(), ScoringPolicy::default()).unwrap();

        // No players yet, so the session refuses to start.
        let result = driver.advance(Phase::Waiting, now(), no_alarm, no_channel);
        assert!(matches!(result, Err(Error::Game(game::Error::NoPlayers))));
        assert_eq!(driver.observed_version(), 1);
        assert!(!driver.has_pending_write());
    }

    #[test]
    fn test_outage_leaves_single_flight_guard_up() {
        let (inner, quiz_id) = store_with_quiz(1);
        let store = FlakyStore {
            inner,
            failures: 0,
        };
        let mut driver =
            HostDriver::create(store, &quiz_id, Id::new(), ScoringPolicy::default()).unwrap();
        driver.join(Id::new(), "Alice").unwrap();

        driver.store.failures = 1;
        let result = driver.advance(Phase::Waiting, now(), no_alarm, no_channel);
        assert!(matches!(
            result,
            Err(Error::Store(store::Error::Unavailable { .. }))
        ));

        // The local session moved on, but the write is still owed.
        assert_eq!(driver.session().state().phase(), Phase::Question);
        assert!(driver.has_pending_write());
        assert!(matches!(
            driver.advance(Phase::Question, now(), no_alarm, no_channel),
            Err(Error::AdvanceInFlight)
        ));

        // Once the store recovers, the retry settles the debt.
        assert!(driver.retry_pending().unwrap());
        assert!(!driver.has_pending_write());
        assert_eq!(driver.observed_version(), 2);
        let (_, record) = driver.store().inner.session(driver.session().code()).unwrap();
        assert_eq!(record.phase, Phase::Question);

        driver
            .advance(Phase::Question, now(), no_alarm, no_channel)
            .unwrap();
        assert_eq!(driver.observed_version(), 3);
    }

    #[test]
    fn test_retry_with_nothing_pending() {
        let (store, quiz_id) = store_with_quiz(1);
        let mut driver =
            HostDriver::create(store, &quiz_id, Id::new(), ScoringPolicy::default()).unwrap();

        assert!(!driver.retry_pending().unwrap());
    }

    #[test]
    fn test_conflict_resyncs_observed_version() {
        let (store, quiz_id) = store_with_quiz(1);
        let mut driver =
            HostDriver::create(store, &quiz_id, Id::new(), ScoringPolicy::default()).unwrap();
        driver.join(Id::new(), "Alice").unwrap();

        // Another writer bumps the stored session behind our back.
        let code = driver.session().code();
        let stolen = driver.store().session(code).unwrap().1.clone();
        driver.store.write_session(code, 1, &stolen).unwrap();

        let result = driver.advance(Phase::Waiting, now(), no_alarm, no_channel);
        assert!(matches!(
            result,
            Err(Error::Store(store::Error::VersionConflict {
                expected: 1,
                actual: 2,
            }))
        ));
        assert_eq!(driver.observed_version(), 2);
        assert!(!driver.has_pending_write());
    }

    #[test]
    fn test_join_persists_player_record() {
        let (store, quiz_id) = store_with_quiz(1);
        let mut driver =
            HostDriver::create(store, &quiz_id, Id::new(), ScoringPolicy::default()).unwrap();

        let alice = Id::new();
        assert_eq!(driver.join(alice, "Alice").unwrap(), "Alice");

        let record = driver.store().player(driver.session().code(), alice).unwrap();
        assert_eq!(record.name, "Alice");
        assert_eq!(record.score, 0);
        assert_eq!(record.last_answer, None);
    }

    #[test]
    fn test_join_after_start_refused() {
        let (store, quiz_id) = store_with_quiz(1);
        let mut driver =
            HostDriver::create(store, &quiz_id, Id::new(), ScoringPolicy::default()).unwrap();
        driver.join(Id::new(), "Alice").unwrap();
        driver
            .advance(Phase::Waiting, now(), no_alarm, no_channel)
            .unwrap();

        let result = driver.join(Id::new(), "Bob");
        assert!(matches!(
            result,
            Err(Error::Game(game::Error::PhaseMismatch))
        ));
    }

    #[test]
    fn test_duplicate_name_refused() {
        let (store, quiz_id) = store_with_quiz(1);
        let mut driver =
            HostDriver::create(store, &quiz_id, Id::new(), ScoringPolicy::default()).unwrap();
        driver.join(Id::new(), "Alice").unwrap();

        let result = driver.join(Id::new(), "Alice");
        assert!(matches!(
            result,
            Err(Error::Game(game::Error::Registry(registry::Error::Name(_))))
        ));
    }

    #[test]
    fn test_submit_answer_persists_score() {
        let (store, quiz_id) = store_with_quiz(1);
        let mut driver =
            HostDriver::create(store, &quiz_id, Id::new(), ScoringPolicy::default()).unwrap();
        let alice = Id::new();
        driver.join(alice, "Alice").unwrap();
        driver
            .advance(Phase::Waiting, now(), no_alarm, no_channel)
            .unwrap();

        let points = driver.submit_answer(alice, 0, now(), no_channel).unwrap();
        assert_eq!(points, 1000);

        let record = driver.store().player(driver.session().code(), alice).unwrap();
        assert_eq!(record.score, 1000);
        assert_eq!(record.last_answer, Some(0));
    }

    #[test]
    fn test_remove_if_done() {
        let (store, quiz_id) = store_with_quiz(1);
        let mut driver =
            HostDriver::create(store, &quiz_id, Id::new(), ScoringPolicy::default()).unwrap();
        driver.join(Id::new(), "Alice").unwrap();

        assert!(!driver.remove_if_done().unwrap());

        for expected in [
            Phase::Waiting,
            Phase::Question,
            Phase::Reveal,
            Phase::Leaderboard,
        ] {
            driver
                .advance(expected, now(), no_alarm, no_channel)
                .unwrap();
        }

        assert!(driver.session().is_done());
        assert!(driver.remove_if_done().unwrap());
        assert!(driver.store().session(driver.session().code()).is_none());
    }
}
