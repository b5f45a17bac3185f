//! # Quizpin Session Library
//!
//! This library provides the core logic for running live multiple choice
//! quiz sessions: hosts create a session from a stored quiz, players join
//! with a six-digit code, and the session walks every participant through
//! questions, reveals, and leaderboards in lockstep. All game-relevant
//! decisions (scoring, timing, phase changes) happen here on the
//! authoritative side; clients only render what they are told.

#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::similar_names)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::ignored_unit_patterns)]
#![allow(clippy::struct_field_names)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::wildcard_imports)]
use derive_where::derive_where;
use itertools::Itertools;
use serde::Serialize;

pub mod channel;
pub mod clients;
pub mod clock;
pub mod constants;
pub mod game;
pub mod host;
pub mod leaderboard;
pub mod names;
pub mod quiz;
pub mod registry;
pub mod scoring;
pub mod session_code;
pub mod store;

/// Any message the session publishes to a client
///
/// Wraps both message families so an embedding server can serialize
/// everything it forwards over one wire format.
#[derive(Debug, Serialize, Clone, derive_more::From)]
pub enum Message {
    /// An incremental update about a change in the session
    Update(game::UpdateMessage),
    /// A full view of the current state
    Sync(game::SyncMessage),
}

impl Message {
    /// Converts the message to a JSON string for transmission
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}

/// A capped list that keeps the exact count while limiting shown entries
///
/// Used for display surfaces that would not fit every player: the
/// waiting screen and the leaderboard show up to a limit of entries but
/// still report how many there are in total.
#[derive(Debug, Clone, Serialize)]
#[derive_where(Default)]
pub struct CappedList<T> {
    /// The exact total count of entries
    exact_count: usize,
    /// The capped list of entries (up to the limit)
    entries: Vec<T>,
}

impl<T: Clone> CappedList<T> {
    /// Creates a capped list from an iterator
    ///
    /// Takes up to `limit` entries from `list`; `exact_count` is the
    /// total the iterator would have yielded.
    pub fn new<I: Iterator<Item = T>>(list: I, limit: usize, exact_count: usize) -> Self {
        let entries = list.take(limit).collect_vec();
        Self {
            exact_count,
            entries,
        }
    }

    /// Maps a function over the kept entries
    pub fn map<F, U>(self, f: F) -> CappedList<U>
    where
        F: Fn(T) -> U,
    {
        CappedList {
            exact_count: self.exact_count,
            entries: self.entries.into_iter().map(f).collect_vec(),
        }
    }

    /// Returns the exact total count of entries
    pub fn exact_count(&self) -> usize {
        self.exact_count
    }

    /// Returns the kept entries
    pub fn entries(&self) -> &[T] {
        &self.entries
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_capped_list_new() {
        let data = vec![1, 2, 3, 4, 5];
        let capped = CappedList::new(data.into_iter(), 3, 5);

        assert_eq!(capped.exact_count(), 5);
        assert_eq!(capped.entries(), &[1, 2, 3]);
    }

    #[test]
    fn test_capped_list_limit_larger_than_entries() {
        let data = vec![1, 2, 3];
        let capped = CappedList::new(data.into_iter(), 5, 3);

        assert_eq!(capped.exact_count(), 3);
        assert_eq!(capped.entries(), &[1, 2, 3]);
    }

    #[test]
    fn test_capped_list_empty() {
        let data: Vec<i32> = vec![];
        let capped = CappedList::new(data.into_iter(), 5, 0);

        assert_eq!(capped.exact_count(), 0);
        let empty: &[i32] = &[];
        assert_eq!(capped.entries(), empty);
    }

    #[test]
    fn test_capped_list_map() {
        let data = vec![1, 2, 3];
        let capped = CappedList::new(data.into_iter(), 2, 3);
        let mapped = capped.map(|x| format!("entry_{x}"));

        assert_eq!(mapped.exact_count(), 3);
        assert_eq!(mapped.entries(), &["entry_1", "entry_2"]);
    }

    #[test]
    fn test_update_message_to_message() {
        let players = CappedList::new(vec!["Alice".to_owned()].into_iter(), 10, 1);
        let message = Message::Update(game::UpdateMessage::WaitingScreen(players));
        let json = message.to_message();

        assert!(json.contains("Update"));
        assert!(json.contains("WaitingScreen"));
        assert!(json.contains("Alice"));
    }

    #[test]
    fn test_sync_message_to_message() {
        let message = Message::Sync(game::SyncMessage::NotAllowed);
        let json = message.to_message();

        assert!(json.contains("Sync"));
        assert!(json.contains("NotAllowed"));
    }
}
