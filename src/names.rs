//! Display name validation and bookkeeping
//!
//! Players type their own display names when joining. This module keeps
//! the bidirectional mapping between player IDs and names, enforces
//! uniqueness within a session, and filters out empty, oversized, and
//! inappropriate names.

use std::collections::{HashMap, HashSet, hash_map::Entry};

use rustrict::CensorStr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{clients::Id, constants};

/// Errors raised when a requested name cannot be assigned
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Another player already holds this name
    #[error("name already in-use")]
    Used,
    /// The player already has a name
    #[error("player has an existing name")]
    Assigned,
    /// The name is empty once whitespace is trimmed
    #[error("name cannot be empty")]
    Empty,
    /// The name contains inappropriate content
    #[error("name is inappropriate")]
    Sinful,
    /// The name exceeds the length limit
    #[error("name is too long")]
    TooLong,
}

/// Serialization helper for [`Names`]
#[derive(Deserialize)]
struct NamesSerde {
    mapping: HashMap<Id, String>,
}

/// The names held by players in one session
///
/// Derived lookups (name to ID, the uniqueness set) are rebuilt from the
/// primary mapping on deserialization rather than stored.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(from = "NamesSerde")]
pub struct Names {
    /// Primary mapping from player ID to name
    mapping: HashMap<Id, String>,

    /// Reverse lookup from name to player ID (not serialized)
    #[serde(skip_serializing)]
    reverse_mapping: HashMap<String, Id>,
    /// Names currently taken, for uniqueness checks (not serialized)
    #[serde(skip_serializing)]
    existing: HashSet<String>,
}

impl From<NamesSerde> for Names {
    fn from(serde: NamesSerde) -> Self {
        let NamesSerde { mapping } = serde;
        let mut reverse_mapping = HashMap::new();
        let mut existing = HashSet::new();
        for (id, name) in &mapping {
            reverse_mapping.insert(name.to_owned(), *id);
            existing.insert(name.to_owned());
        }
        Self {
            mapping,
            reverse_mapping,
            existing,
        }
    }
}

impl Names {
    /// The name held by `id`, if any
    pub fn get_name(&self, id: &Id) -> Option<String> {
        self.mapping.get(id).map(std::borrow::ToOwned::to_owned)
    }

    /// The player holding `name`, if any
    pub fn get_id(&self, name: &str) -> Option<Id> {
        self.reverse_mapping.get(name).copied()
    }

    /// Validates `name` and assigns it to `id`
    ///
    /// The name is trimmed of surrounding whitespace before any other
    /// check. On success the cleaned name, as it will be displayed, is
    /// returned.
    ///
    /// # Errors
    ///
    /// * [`Error::TooLong`] - longer than the display name limit
    /// * [`Error::Empty`] - nothing left after trimming
    /// * [`Error::Sinful`] - rejected by the content filter
    /// * [`Error::Used`] - taken by another player
    /// * [`Error::Assigned`] - `id` already has a name
    pub fn set_name(&mut self, id: Id, name: &str) -> Result<String, Error> {
        if name.len() > constants::player::MAX_NAME_LENGTH {
            return Err(Error::TooLong);
        }
        let name = rustrict::trim_whitespace(name);
        if name.is_empty() {
            return Err(Error::Empty);
        }
        if name.is_inappropriate() {
            return Err(Error::Sinful);
        }
        match self.mapping.entry(id) {
            Entry::Occupied(_) => Err(Error::Assigned),
            Entry::Vacant(v) => {
                if !self.existing.insert(name.to_owned()) {
                    return Err(Error::Used);
                }
                v.insert(name.to_owned());
                self.reverse_mapping.insert(name.to_owned(), id);
                Ok(name.to_owned())
            }
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_set_name_and_look_up_both_ways() {
        let mut names = Names::default();
        let id = Id::new();

        assert_eq!(names.set_name(id, "Alice").unwrap(), "Alice");
        assert_eq!(names.get_name(&id), Some("Alice".to_owned()));
        assert_eq!(names.get_id("Alice"), Some(id));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut names = Names::default();
        names.set_name(Id::new(), "Alice").unwrap();

        assert_eq!(names.set_name(Id::new(), "Alice"), Err(Error::Used));
    }

    #[test]
    fn test_renaming_rejected() {
        let mut names = Names::default();
        let id = Id::new();
        names.set_name(id, "Alice").unwrap();

        assert_eq!(names.set_name(id, "Bob"), Err(Error::Assigned));
        assert_eq!(names.get_name(&id), Some("Alice".to_owned()));
    }

    #[test]
    fn test_rejected_rename_does_not_reserve_the_name() {
        let mut names = Names::default();
        let id = Id::new();
        names.set_name(id, "Alice").unwrap();
        assert_eq!(names.set_name(id, "Bob"), Err(Error::Assigned));

        // The failed rename must not block another player from taking it.
        assert_eq!(names.set_name(Id::new(), "Bob").unwrap(), "Bob");
    }

    #[test]
    fn test_whitespace_trimmed_before_checks() {
        let mut names = Names::default();
        assert_eq!(names.set_name(Id::new(), "  Alice  ").unwrap(), "Alice");
        assert_eq!(names.set_name(Id::new(), "   "), Err(Error::Empty));
        assert_eq!(names.set_name(Id::new(), ""), Err(Error::Empty));
    }

    #[test]
    fn test_length_limit() {
        let mut names = Names::default();
        let at_limit = "a".repeat(constants::player::MAX_NAME_LENGTH);
        let over_limit = "a".repeat(constants::player::MAX_NAME_LENGTH + 1);

        assert!(names.set_name(Id::new(), &at_limit).is_ok());
        assert_eq!(names.set_name(Id::new(), &over_limit), Err(Error::TooLong));
    }

    #[test]
    fn test_serde_rebuilds_reverse_lookups() {
        let mut names = Names::default();
        let id = Id::new();
        names.set_name(id, "Alice").unwrap();

        let json = serde_json::to_string(&names).unwrap();
        let mut restored: Names = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.get_id("Alice"), Some(id));
        assert_eq!(restored.set_name(Id::new(), "Alice"), Err(Error::Used));
    }
}
