//! Quiz documents and their validation
//!
//! A quiz is static content: a title and an ordered list of multiple
//! choice questions, each with a set of options and the index of the
//! correct one. Quizzes are produced elsewhere (editor, generator) and
//! referenced by sessions; they never change while a session plays them.

use std::{fmt::Display, str::FromStr};

use garde::Validate;
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use thiserror::Error;
use uuid::Uuid;

use crate::constants;

/// A unique identifier for a quiz document
///
/// Sessions hold a `QuizId` rather than owning the quiz: many sessions
/// may play the same quiz at once.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay,
)]
pub struct QuizId(Uuid);

impl QuizId {
    /// Creates a new random quiz ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for QuizId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for QuizId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for QuizId {
    type Err = uuid::Error;

    /// Parses a quiz ID from a UUID string
    ///
    /// # Errors
    ///
    /// Returns a `uuid::Error` if the string is not a valid UUID.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// Errors raised when quiz content violates its invariants
#[derive(Error, Debug)]
pub enum Error {
    /// A quiz must contain at least one question
    #[error("quiz contains no questions")]
    NoQuestions,
    /// A question's correct-answer index does not point at one of its options
    #[error("question {index}: answer {answer} is out of bounds for {option_count} options")]
    AnswerOutOfBounds {
        /// Index of the offending question within the quiz
        index: usize,
        /// The out-of-bounds answer index
        answer: usize,
        /// How many options the question actually has
        option_count: usize,
    },
    /// Length or count constraints were violated
    #[error(transparent)]
    Constraint(#[from] garde::Report),
}

/// Validates that every option in a question fits the length limit
fn validate_option_lengths(options: &Vec<String>) -> garde::Result {
    match options
        .iter()
        .position(|o| o.chars().count() > constants::quiz::MAX_OPTION_LENGTH)
    {
        Some(i) => Err(garde::Error::new(format!(
            "option {i} exceeds {} characters",
            constants::quiz::MAX_OPTION_LENGTH
        ))),
        None => Ok(()),
    }
}

/// A single multiple choice question
///
/// The correct answer is stored as a zero-based index into `options`;
/// [`Question::new`] guarantees the index is in bounds.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Question {
    /// The question text shown to everyone
    #[garde(length(min = 1, max = constants::quiz::MAX_QUESTION_LENGTH))]
    text: String,
    /// The answer options players choose between
    #[garde(
        length(min = constants::quiz::MIN_OPTION_COUNT, max = constants::quiz::MAX_OPTION_COUNT),
        custom(|v, _| validate_option_lengths(v))
    )]
    options: Vec<String>,
    /// Zero-based index of the correct option
    #[garde(skip)]
    answer: usize,
}

impl Question {
    /// Creates a question after checking all content invariants
    ///
    /// # Errors
    ///
    /// Returns [`Error::AnswerOutOfBounds`] if `answer` does not index into
    /// `options`, or [`Error::Constraint`] for length and count violations.
    pub fn new(text: impl Into<String>, options: Vec<String>, answer: usize) -> Result<Self, Error> {
        let question = Self {
            text: text.into(),
            options,
            answer,
        };
        question.check(0)?;
        Ok(question)
    }

    /// Checks this question's invariants, reporting `index` on failure
    fn check(&self, index: usize) -> Result<(), Error> {
        self.validate()?;
        if self.answer >= self.options.len() {
            return Err(Error::AnswerOutOfBounds {
                index,
                answer: self.answer,
                option_count: self.options.len(),
            });
        }
        Ok(())
    }

    /// The question text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The answer options in display order
    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Zero-based index of the correct option
    pub fn answer(&self) -> usize {
        self.answer
    }

    /// Whether choosing `option` answers this question correctly
    pub fn is_correct(&self, option: usize) -> bool {
        option == self.answer
    }
}

/// A complete quiz document
///
/// Immutable for the duration of any session that plays it.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Quiz {
    /// Identifier under which the quiz is stored
    #[garde(skip)]
    id: QuizId,
    /// Title shown on the waiting screen and results
    #[garde(length(min = 1, max = constants::quiz::MAX_TITLE_LENGTH))]
    title: String,
    /// The questions, played in order
    #[garde(length(min = 1, max = constants::quiz::MAX_QUESTION_COUNT), dive)]
    questions: Vec<Question>,
}

impl Quiz {
    /// Creates a quiz after checking all content invariants
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoQuestions`] for an empty question list,
    /// [`Error::AnswerOutOfBounds`] if any question's answer index is out
    /// of bounds, or [`Error::Constraint`] for length and count violations.
    pub fn new(
        id: QuizId,
        title: impl Into<String>,
        questions: Vec<Question>,
    ) -> Result<Self, Error> {
        let quiz = Self {
            id,
            title: title.into(),
            questions,
        };
        quiz.check()?;
        Ok(quiz)
    }

    /// Re-checks all invariants, for quizzes that arrived by deserialization
    ///
    /// # Errors
    ///
    /// Same as [`Quiz::new`].
    pub fn check(&self) -> Result<(), Error> {
        if self.questions.is_empty() {
            return Err(Error::NoQuestions);
        }
        self.validate()?;
        for (index, question) in self.questions.iter().enumerate() {
            question.check(index)?;
        }
        Ok(())
    }

    /// The quiz identifier
    pub fn id(&self) -> QuizId {
        self.id
    }

    /// The quiz title
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Number of questions in the quiz
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Whether the quiz has no questions (never true for a checked quiz)
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// The question at `index`, if it exists
    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }
}
