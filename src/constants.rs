//! Configuration constants for the quiz session system
//!
//! This module collects the limits and timing defaults used across the
//! crate so that validation rules and phase timers share a single source
//! of truth.

/// Quiz content constraints
pub mod quiz {
    /// Maximum number of questions allowed in a single quiz
    pub const MAX_QUESTION_COUNT: usize = 100;
    /// Maximum length of a quiz title in characters
    pub const MAX_TITLE_LENGTH: usize = 200;
    /// Maximum length of a question text in characters
    pub const MAX_QUESTION_LENGTH: usize = 200;
    /// Minimum number of answer options per question
    pub const MIN_OPTION_COUNT: usize = 2;
    /// Maximum number of answer options per question
    pub const MAX_OPTION_COUNT: usize = 8;
    /// Maximum length of a single answer option in characters
    pub const MAX_OPTION_LENGTH: usize = 200;
}

/// Session-wide limits
pub mod session {
    /// Maximum number of participants in a single session
    pub const MAX_PLAYER_COUNT: usize = 1000;
    /// Maximum number of names shown on waiting and leaderboard screens
    pub const DISPLAY_LIMIT: usize = 50;
}

/// Phase timing defaults, in seconds
pub mod timing {
    /// Time players have to answer each question
    pub const QUESTION_SECONDS: u64 = 20;
    /// Time the correct answer stays on screen before the leaderboard
    pub const REVEAL_SECONDS: u64 = 5;
}

/// Scoring defaults
pub mod scoring {
    /// Points awarded for a correct answer submitted instantly
    pub const MAX_POINTS: u64 = 1000;
    /// Points a correct answer decays to at twice the question duration
    pub const FLOOR_POINTS: u64 = 100;
}

/// Player display name constraints
pub mod player {
    /// Maximum length of a display name in characters
    pub const MAX_NAME_LENGTH: usize = 30;
}
