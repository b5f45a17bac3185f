//! Live session state machine
//!
//! A [`GameSession`] owns everything one running quiz needs: the quiz
//! content, the connected clients, the player registry, and the current
//! phase. Phases advance only through [`GameSession::advance`], which is
//! a compare-and-set on the current phase: callers state which phase they
//! believe the session is in, and a concurrent advance by someone else
//! fails loudly instead of double-applying.
//!
//! The session is transport-agnostic. Outbound traffic goes through
//! [`Channel`] finders, timers through a `schedule_message` callback that
//! delivers an [`AlarmMessage`] back after a delay, and all readings of
//! "now" are passed in by the caller.

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use thiserror::Error;
use web_time::{Duration, SystemTime};

use crate::{
    CappedList,
    channel::Channel,
    clients::{self, Clients, Id, Role, RoleKind},
    clock::PhaseTimer,
    constants,
    leaderboard::{self, Entry, FinalSummary, LeaderboardMessage, ScoreMessage},
    names,
    quiz::Quiz,
    registry::{self, Registry},
    scoring::ScoringPolicy,
    session_code::SessionCode,
};

/// The phase a session is in, without per-phase data
///
/// Used as the expectation in compare-and-set advances and inside alarm
/// messages, where only the kind of phase matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Players are joining; the quiz has not started
    Waiting,
    /// A question is on screen and accepting answers
    Question,
    /// The correct answer is revealed; answers are closed
    Reveal,
    /// Standings are on screen between questions
    Leaderboard,
    /// The quiz is over; final results are available
    Finished,
}

/// The full state of a session, including per-phase data
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum State {
    /// Players are joining; the quiz has not started
    Waiting,
    /// Question `index` is on screen and accepting answers
    Question {
        /// Zero-based index of the question on screen
        index: usize,
        /// Countdown until answers close
        timer: PhaseTimer,
    },
    /// The correct answer to question `index` is revealed
    Reveal {
        /// Zero-based index of the revealed question
        index: usize,
        /// Countdown until the leaderboard is shown
        timer: PhaseTimer,
    },
    /// Standings after question `index` are on screen
    Leaderboard {
        /// Zero-based index of the question just scored
        index: usize,
    },
    /// The quiz is over
    Finished,
}

impl State {
    /// The phase of this state, without its data
    pub fn phase(&self) -> Phase {
        match self {
            State::Waiting => Phase::Waiting,
            State::Question { .. } => Phase::Question,
            State::Reveal { .. } => Phase::Reveal,
            State::Leaderboard { .. } => Phase::Leaderboard,
            State::Finished => Phase::Finished,
        }
    }

    /// The question index this state refers to, if any
    pub fn question_index(&self) -> Option<usize> {
        match self {
            State::Question { index, .. }
            | State::Reveal { index, .. }
            | State::Leaderboard { index } => Some(*index),
            State::Waiting | State::Finished => None,
        }
    }
}

/// Errors raised by session operations
#[derive(Error, Debug)]
pub enum Error {
    /// The quiz cannot start before anyone has joined
    #[error("cannot start a session with no players")]
    NoPlayers,
    /// The current phase has no further transition
    #[error("no transition out of {0:?}")]
    InvalidTransition(Phase),
    /// A concurrent advance changed the phase first
    #[error("phase advanced concurrently: expected {expected:?}, found {actual:?}")]
    PhaseRace {
        /// The phase the caller believed the session was in
        expected: Phase,
        /// The phase the session is actually in
        actual: Phase,
    },
    /// The operation is not valid in the current phase
    #[error("operation not valid in the current phase")]
    PhaseMismatch,
    /// A registry operation failed
    #[error(transparent)]
    Registry(#[from] registry::Error),
}

/// Timer expiry notices delivered back to the session
///
/// An alarm names the question index and target phase it was scheduled
/// for. Receiving an alarm whose expectation no longer matches the
/// session state (because the host advanced manually first) is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmMessage {
    /// A phase timer ran out and the session should move on
    Advance {
        /// The question index the timer was armed for
        index: usize,
        /// The phase the session should move to
        to: Phase,
    },
}

/// End-of-session results, shaped per role
#[derive(Debug, Serialize, Clone)]
pub enum SummaryMessage {
    /// Aggregate statistics for the host
    Host {
        /// For each question, (players who earned points, players who did not)
        stats: Vec<(usize, usize)>,
        /// Total number of players
        player_count: usize,
    },
    /// A player's own results
    Player {
        /// Final score and rank, if the player is ranked
        score: Option<ScoreMessage>,
        /// Points earned on each question, in order
        points: Vec<u64>,
    },
}

/// Incremental updates published when the session changes
#[serde_with::serde_as]
#[skip_serializing_none]
#[derive(Debug, Serialize, Clone)]
pub enum UpdateMessage {
    /// Tells a newly connected client its assigned ID
    IdAssign(Id),
    /// The waiting screen's list of joined player names
    WaitingScreen(CappedList<String>),
    /// Confirms the display name a player requested
    NameAssign(String),
    /// The requested display name was rejected
    NameError(names::Error),
    /// A question went on screen
    QuestionAnnouncement {
        /// Zero-based index of the question
        index: usize,
        /// Total number of questions in the quiz
        count: usize,
        /// The question text
        question: String,
        /// The answer options in display order
        options: Vec<String>,
        /// How long answers are accepted
        #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
        duration: Duration,
    },
    /// How many players have answered the question on screen
    AnswersCount(usize),
    /// The correct answer and the distribution of submitted answers
    RevealResults {
        /// Zero-based index of the revealed question
        index: usize,
        /// Zero-based index of the correct option
        answer: usize,
        /// How many players chose each option
        counts: Vec<usize>,
    },
    /// The standings shown between questions
    Leaderboard {
        /// Current and prior standings
        leaderboard: LeaderboardMessage,
    },
    /// A player's own score and rank between questions
    Score {
        /// `None` when the player is not ranked
        score: Option<ScoreMessage>,
    },
    /// End-of-session results
    Summary(SummaryMessage),
}

/// A full view of the current state, for connecting or reconnecting clients
#[serde_with::serde_as]
#[skip_serializing_none]
#[derive(Debug, Serialize, Clone)]
pub enum SyncMessage {
    /// The session is waiting for players
    WaitingScreen(CappedList<String>),
    /// A question is on screen
    Question {
        /// Zero-based index of the question
        index: usize,
        /// Total number of questions in the quiz
        count: usize,
        /// The question text
        question: String,
        /// The answer options in display order
        options: Vec<String>,
        /// Time left before answers close, from the shared phase timer
        #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
        remaining: Duration,
        /// How many players have answered so far
        answered_count: usize,
    },
    /// The correct answer is on screen
    Reveal {
        /// Zero-based index of the revealed question
        index: usize,
        /// Total number of questions in the quiz
        count: usize,
        /// Zero-based index of the correct option
        answer: usize,
        /// How many players chose each option
        counts: Vec<usize>,
    },
    /// Standings are on screen
    Leaderboard {
        /// Zero-based index of the question just scored
        index: usize,
        /// Total number of questions in the quiz
        count: usize,
        /// Current and prior standings
        leaderboard: LeaderboardMessage,
    },
    /// A player's own view of the standings screen
    Score {
        /// `None` when the player is not ranked
        score: Option<ScoreMessage>,
    },
    /// End-of-session results
    Summary(SummaryMessage),
    /// The request (typically a late join) was refused
    NotAllowed,
}

/// Messages received from the session host
#[derive(Debug, Clone, Deserialize)]
pub enum IncomingHostMessage {
    /// Advance out of the current phase
    Next,
    /// Lock or unlock the session against new joins
    Lock(bool),
}

/// Messages received from clients that have not registered yet
#[derive(Debug, Clone, Deserialize)]
pub enum IncomingUnassignedMessage {
    /// Request to join as a player under the given display name
    NameRequest(String),
}

/// Messages received from registered players
#[derive(Debug, Clone, Deserialize)]
pub enum IncomingPlayerMessage {
    /// Answer the question on screen by option index
    IndexAnswer(usize),
}

/// Any message received from a client, tagged by claimed role
#[derive(Debug, Clone, Deserialize)]
pub enum IncomingMessage {
    /// From the host
    Host(IncomingHostMessage),
    /// From an unregistered client
    Unassigned(IncomingUnassignedMessage),
    /// From a registered player
    Player(IncomingPlayerMessage),
}

impl IncomingMessage {
    /// Whether the message's claimed role matches the sender's actual role
    fn follows(&self, kind: RoleKind) -> bool {
        matches!(
            (self, kind),
            (IncomingMessage::Host(_), RoleKind::Host)
                | (IncomingMessage::Unassigned(_), RoleKind::Unassigned)
                | (IncomingMessage::Player(_), RoleKind::Player)
        )
    }
}

/// One live quiz session
#[derive(Debug, Serialize, Deserialize)]
pub struct GameSession {
    /// The join code players use to find this session
    code: SessionCode,
    /// The quiz being played; immutable for the session's lifetime
    quiz: Quiz,
    /// Everyone connected to the session
    clients: Clients,
    /// Registered players and their scores
    registry: Registry,
    /// How points are awarded
    scoring: ScoringPolicy,
    /// The current phase and its data
    state: State,
    /// Standings when the question on screen was announced
    standings_at_question_start: Vec<Entry>,
    /// Bumped on every successful phase advance, for optimistic writes
    version: u64,
    /// Whether new joins are refused
    locked: bool,
    /// End-of-session statistics (computed once when first needed)
    #[serde(skip)]
    final_summary: once_cell_serde::sync::OnceCell<FinalSummary>,
}

impl GameSession {
    /// Creates a session in the waiting phase with its host registered
    pub fn new(code: SessionCode, quiz: Quiz, host_id: Id, scoring: ScoringPolicy) -> Self {
        Self {
            code,
            quiz,
            clients: Clients::with_host_id(host_id),
            registry: Registry::default(),
            scoring,
            state: State::Waiting,
            standings_at_question_start: Vec::new(),
            version: 0,
            locked: false,
            final_summary: once_cell_serde::sync::OnceCell::new(),
        }
    }

    /// The session's join code
    pub fn code(&self) -> SessionCode {
        self.code
    }

    /// The quiz being played
    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    /// The current state
    pub fn state(&self) -> State {
        self.state
    }

    /// The registered players and their scores
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Version counter; bumped on every successful phase advance
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Whether the session refuses new joins
    pub fn locked(&self) -> bool {
        self.locked
    }

    /// Whether the session has reached its final phase
    pub fn is_done(&self) -> bool {
        matches!(self.state, State::Finished)
    }

    /// Advances to the next phase, guarded by the caller's expectation
    ///
    /// This is the only way the phase changes. The caller names the phase
    /// it believes the session is in; if another advance got there first
    /// the call fails with [`Error::PhaseRace`] and applies nothing, so
    /// racing timer expiries and host clicks collapse to one transition.
    ///
    /// Returns the phase the session moved to.
    ///
    /// # Errors
    ///
    /// * [`Error::PhaseRace`] - `expected` no longer matches the session
    /// * [`Error::NoPlayers`] - starting the quiz before anyone joined
    /// * [`Error::InvalidTransition`] - the session is already finished
    pub fn advance<C: Channel, F: Fn(Id) -> Option<C>, S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        expected: Phase,
        now: SystemTime,
        mut schedule_message: S,
        channel_finder: F,
    ) -> Result<Phase, Error> {
        let actual = self.state.phase();
        if actual != expected {
            return Err(Error::PhaseRace { expected, actual });
        }

        match self.state {
            State::Waiting => {
                if self.registry.is_empty() {
                    return Err(Error::NoPlayers);
                }
                self.enter_question(0, now, &mut schedule_message, &channel_finder);
            }
            State::Question { index, .. } => {
                self.enter_reveal(index, now, &mut schedule_message, &channel_finder);
            }
            State::Reveal { index, .. } => {
                self.enter_leaderboard(index, &channel_finder);
            }
            State::Leaderboard { index } => {
                let next = index + 1;
                if next < self.quiz.len() {
                    self.enter_question(next, now, &mut schedule_message, &channel_finder);
                } else {
                    self.enter_finished(&channel_finder);
                }
            }
            State::Finished => {
                return Err(Error::InvalidTransition(Phase::Finished));
            }
        }

        self.version += 1;
        Ok(self.state.phase())
    }

    /// Records a player's answer to the question on screen
    ///
    /// Correctness and elapsed time are judged against the session's own
    /// question and shared phase timer, never against anything the client
    /// claims. Returns the points earned.
    ///
    /// # Errors
    ///
    /// * [`Error::PhaseMismatch`] - no question is accepting answers,
    ///   either because the phase is wrong or the timer has expired
    /// * [`Error::Registry`] - the player is unknown or already answered
    pub fn submit_answer<C: Channel, F: Fn(Id) -> Option<C>>(
        &mut self,
        player_id: Id,
        option: usize,
        now: SystemTime,
        channel_finder: F,
    ) -> Result<u64, Error> {
        let State::Question { index, timer } = self.state else {
            return Err(Error::PhaseMismatch);
        };
        if timer.is_expired(now) {
            return Err(Error::PhaseMismatch);
        }

        let Some(question) = self.quiz.question(index) else {
            return Err(Error::PhaseMismatch);
        };

        let points = self
            .scoring
            .points(question.is_correct(option), timer.elapsed(now));

        self.registry.record_answer(player_id, option, points)?;

        self.clients.announce_specific(
            RoleKind::Host,
            &UpdateMessage::AnswersCount(self.registry.answered_count()),
            &channel_finder,
        );

        Ok(points)
    }

    /// Adds a newly connected client with no role yet
    ///
    /// The client is told its ID and given a full view of the current
    /// state, whatever phase the session is in.
    ///
    /// # Errors
    ///
    /// Returns [`clients::Error::MaximumParticipants`] when the session
    /// is full.
    pub fn add_unassigned<C: Channel, F: Fn(Id) -> Option<C>>(
        &mut self,
        client_id: Id,
        now: SystemTime,
        channel_finder: F,
    ) -> Result<(), clients::Error> {
        self.clients.add_client(client_id, Role::Unassigned)?;

        self.clients.send_update(
            &UpdateMessage::IdAssign(client_id),
            client_id,
            &channel_finder,
        );
        let sync = self.state_message(client_id, RoleKind::Unassigned, now);
        self.clients.send_sync(&sync, client_id, &channel_finder);

        Ok(())
    }

    /// Handles one message from a client
    ///
    /// Messages whose claimed role does not match the sender's actual
    /// role are dropped. Late or duplicate answers are dropped too; they
    /// are expected traffic near phase boundaries, not faults.
    ///
    /// # Errors
    ///
    /// Propagates advance failures from host messages, so the embedding
    /// server can report them back to the host.
    pub fn receive_message<C: Channel, F: Fn(Id) -> Option<C>, S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        client_id: Id,
        message: IncomingMessage,
        now: SystemTime,
        schedule_message: S,
        channel_finder: F,
    ) -> Result<(), Error> {
        let Some(role) = self.clients.get_role(client_id) else {
            return Ok(());
        };
        if !message.follows(role.kind()) {
            return Ok(());
        }

        match message {
            IncomingMessage::Host(IncomingHostMessage::Next) => {
                self.advance(self.state.phase(), now, schedule_message, channel_finder)?;
            }
            IncomingMessage::Host(IncomingHostMessage::Lock(locked)) => {
                self.locked = locked;
            }
            IncomingMessage::Unassigned(IncomingUnassignedMessage::NameRequest(name)) => {
                self.handle_name_request(client_id, &name, &channel_finder);
            }
            IncomingMessage::Player(IncomingPlayerMessage::IndexAnswer(option)) => {
                match self.submit_answer(client_id, option, now, channel_finder) {
                    Ok(_)
                    | Err(
                        Error::PhaseMismatch | Error::Registry(registry::Error::AlreadyAnswered),
                    ) => {}
                    Err(error) => return Err(error),
                }
            }
        }

        Ok(())
    }

    /// Handles a timer expiry notice
    ///
    /// The alarm carries the question index and target phase it was armed
    /// for. If the session has already moved on (the host advanced
    /// manually before the timer fired) the alarm is stale and ignored.
    ///
    /// # Errors
    ///
    /// Propagates advance failures; a stale alarm is not a failure.
    pub fn receive_alarm<C: Channel, F: Fn(Id) -> Option<C>, S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        message: &AlarmMessage,
        now: SystemTime,
        schedule_message: S,
        channel_finder: F,
    ) -> Result<(), Error> {
        let AlarmMessage::Advance { index, to } = message;

        let expected = match (self.state, to) {
            (State::Question { index: current, .. }, Phase::Reveal) if current == *index => {
                Some(Phase::Question)
            }
            (State::Reveal { index: current, .. }, Phase::Leaderboard) if current == *index => {
                Some(Phase::Reveal)
            }
            _ => None,
        };

        if let Some(expected) = expected {
            self.advance(expected, now, schedule_message, channel_finder)?;
        }

        Ok(())
    }

    /// Builds the full state view a client needs on connect or reconnect
    ///
    /// Remaining time on timed phases is computed from the shared phase
    /// timer, so every reconnecting client sees the same countdown.
    pub fn state_message(&self, client_id: Id, role_kind: RoleKind, now: SystemTime) -> SyncMessage {
        match self.state {
            State::Waiting => SyncMessage::WaitingScreen(self.waiting_screen_names()),
            State::Question { index, timer } => {
                let question = self.quiz.question(index);
                SyncMessage::Question {
                    index,
                    count: self.quiz.len(),
                    question: question.map(|q| q.text().to_owned()).unwrap_or_default(),
                    options: question.map(|q| q.options().to_vec()).unwrap_or_default(),
                    remaining: timer.remaining(now),
                    answered_count: self.registry.answered_count(),
                }
            }
            State::Reveal { index, .. } => {
                let question = self.quiz.question(index);
                SyncMessage::Reveal {
                    index,
                    count: self.quiz.len(),
                    answer: question.map(crate::quiz::Question::answer).unwrap_or_default(),
                    counts: self
                        .registry
                        .answer_counts(question.map_or(0, |q| q.options().len())),
                }
            }
            State::Leaderboard { index } => {
                let current = leaderboard::standings(&self.registry);
                if matches!(role_kind, RoleKind::Player) {
                    SyncMessage::Score {
                        score: leaderboard::score(&current, client_id),
                    }
                } else {
                    SyncMessage::Leaderboard {
                        index,
                        count: self.quiz.len(),
                        leaderboard: leaderboard::message(
                            &current,
                            &self.standings_at_question_start,
                        ),
                    }
                }
            }
            State::Finished => SyncMessage::Summary(self.summary_message(client_id, role_kind)),
        }
    }

    /// Registers a client as a player under the requested display name
    ///
    /// Joining is only possible while the session is waiting and not
    /// locked; a session that has started never gains players, so scores
    /// and rankings stay comparable across the whole quiz.
    ///
    /// # Errors
    ///
    /// * [`Error::PhaseMismatch`] - the session is locked or has started
    /// * [`Error::Registry`] - the display name was rejected
    pub fn register_player(&mut self, client_id: Id, name: &str) -> Result<String, Error> {
        if self.locked || !matches!(self.state, State::Waiting) {
            return Err(Error::PhaseMismatch);
        }

        let validated = self.registry.register(client_id, name)?;
        self.clients.update_role(
            client_id,
            Role::Player {
                name: validated.clone(),
            },
        );
        Ok(validated)
    }

    /// Joins an unassigned client as a player, or tells it why it cannot
    fn handle_name_request<C: Channel, F: Fn(Id) -> Option<C>>(
        &mut self,
        client_id: Id,
        name: &str,
        channel_finder: &F,
    ) {
        match self.register_player(client_id, name) {
            Ok(validated) => {
                self.clients.send_update(
                    &UpdateMessage::NameAssign(validated),
                    client_id,
                    channel_finder,
                );
                self.clients.announce(
                    &UpdateMessage::WaitingScreen(self.waiting_screen_names()),
                    channel_finder,
                );
            }
            Err(Error::PhaseMismatch) => {
                self.clients
                    .send_sync(&SyncMessage::NotAllowed, client_id, channel_finder);
            }
            Err(Error::Registry(registry::Error::Name(error))) => {
                self.clients
                    .send_update(&UpdateMessage::NameError(error), client_id, channel_finder);
            }
            Err(_) => {}
        }
    }

    fn enter_question<C: Channel, F: Fn(Id) -> Option<C>, S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        index: usize,
        now: SystemTime,
        schedule_message: &mut S,
        channel_finder: &F,
    ) {
        let duration = self.scoring.question_duration();
        self.standings_at_question_start = leaderboard::standings(&self.registry);
        self.state = State::Question {
            index,
            timer: PhaseTimer::starting_at(now, duration),
        };

        if let Some(question) = self.quiz.question(index) {
            self.clients.announce(
                &UpdateMessage::QuestionAnnouncement {
                    index,
                    count: self.quiz.len(),
                    question: question.text().to_owned(),
                    options: question.options().to_vec(),
                    duration,
                },
                channel_finder,
            );
        }

        schedule_message(
            AlarmMessage::Advance {
                index,
                to: Phase::Reveal,
            },
            duration,
        );
    }

    fn enter_reveal<C: Channel, F: Fn(Id) -> Option<C>, S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        index: usize,
        now: SystemTime,
        schedule_message: &mut S,
        channel_finder: &F,
    ) {
        let duration = Duration::from_secs(constants::timing::REVEAL_SECONDS);
        self.state = State::Reveal {
            index,
            timer: PhaseTimer::starting_at(now, duration),
        };

        if let Some(question) = self.quiz.question(index) {
            self.clients.announce(
                &UpdateMessage::RevealResults {
                    index,
                    answer: question.answer(),
                    counts: self.registry.answer_counts(question.options().len()),
                },
                channel_finder,
            );
        }

        schedule_message(
            AlarmMessage::Advance {
                index,
                to: Phase::Leaderboard,
            },
            duration,
        );
    }

    fn enter_leaderboard<C: Channel, F: Fn(Id) -> Option<C>>(
        &mut self,
        index: usize,
        channel_finder: &F,
    ) {
        // Fold the scored question into every player's history exactly
        // once, at the moment its results leave the screen.
        self.registry.reset_for_next_question();
        self.state = State::Leaderboard { index };

        let current = leaderboard::standings(&self.registry);
        let message = leaderboard::message(&current, &self.standings_at_question_start);

        self.clients.announce_with(
            |id, kind| match kind {
                RoleKind::Host => Some(UpdateMessage::Leaderboard {
                    leaderboard: message.clone(),
                }),
                RoleKind::Player => Some(UpdateMessage::Score {
                    score: leaderboard::score(&current, id),
                }),
                RoleKind::Unassigned => None,
            },
            channel_finder,
        );
    }

    fn enter_finished<C: Channel, F: Fn(Id) -> Option<C>>(&mut self, channel_finder: &F) {
        self.state = State::Finished;

        self.clients.announce_with(
            |id, kind| match kind {
                RoleKind::Unassigned => None,
                _ => Some(UpdateMessage::Summary(self.summary_message(id, kind))),
            },
            channel_finder,
        );
    }

    /// End-of-session results for one client
    fn summary_message(&self, client_id: Id, role_kind: RoleKind) -> SummaryMessage {
        let summary = self
            .final_summary
            .get_or_init(|| FinalSummary::new(&self.registry, self.quiz.len()));

        if matches!(role_kind, RoleKind::Player) {
            let standings = leaderboard::standings(&self.registry);
            SummaryMessage::Player {
                score: leaderboard::score(&standings, client_id),
                points: summary.player_summary(client_id),
            }
        } else {
            let (player_count, stats) = summary.host_summary();
            SummaryMessage::Host {
                stats,
                player_count,
            }
        }
    }

    /// Closes every live channel when the session is torn down
    ///
    /// Called by the embedding server after a finished session's results
    /// have been delivered; clients reconnecting later get nothing.
    pub fn close_channels<C: Channel, F: Fn(Id) -> Option<C>>(&mut self, channel_finder: F) {
        use itertools::Itertools;

        let ids = self
            .clients
            .vec(&channel_finder)
            .into_iter()
            .map(|(id, _, _)| id)
            .collect_vec();
        for id in ids {
            self.clients.close_channel(&id, &channel_finder);
        }
    }

    /// Joined player names in registration order, capped for display
    fn waiting_screen_names(&self) -> CappedList<String> {
        use itertools::Itertools;

        CappedList::new(
            self.registry
                .iter()
                .sorted_by_key(|(_, player)| player.seat())
                .map(|(_, player)| player.name().to_owned()),
            constants::session::DISPLAY_LIMIT,
            self.registry.len(),
        )
    }
}
