//! Session code (PIN) generation and parsing
//!
//! Each live session is identified by a short numeric code that the host
//! reads out or displays so players can join. Codes are six decimal
//! digits, which keeps them easy to type on a phone keypad.

use std::{fmt::Display, num::ParseIntError, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Smallest valid session code (first six-digit number)
const MIN_VALUE: u32 = 100_000;
/// One past the largest valid session code
const MAX_VALUE: u32 = 1_000_000;

/// A six-digit code identifying one live session
///
/// Codes are generated uniformly at random in the six-digit range, so
/// they never need a leading zero and read unambiguously when spoken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionCode(u32);

/// Errors produced when parsing a session code from text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The text is not a decimal number
    #[error("session code is not a number")]
    NotANumber(#[from] ParseIntError),
    /// The number falls outside the six-digit range
    #[error("session code must have exactly six digits")]
    OutOfRange,
}

impl SessionCode {
    /// Generates a new random session code
    pub fn new() -> Self {
        Self(fastrand::u32(MIN_VALUE..MAX_VALUE))
    }
}

impl Default for SessionCode {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for SessionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionCode {
    type Err = Error;

    /// Parses a session code from its six-digit decimal form
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotANumber`] for non-numeric input and
    /// [`Error::OutOfRange`] for numbers with more or fewer than six digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.parse::<u32>()?;
        if (MIN_VALUE..MAX_VALUE).contains(&value) {
            Ok(Self(value))
        } else {
            Err(Error::OutOfRange)
        }
    }
}

impl Serialize for SessionCode {
    /// Serializes the code as the string players type to join
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for SessionCode {
    /// Deserializes a code from its string form
    fn deserialize<D>(deserializer: D) -> Result<SessionCode, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        SessionCode::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_new_codes_have_six_digits() {
        for _ in 0..100 {
            let code = SessionCode::new();
            assert!(code.0 >= MIN_VALUE);
            assert!(code.0 < MAX_VALUE);
            assert_eq!(code.to_string().len(), 6);
        }
    }

    #[test]
    fn test_from_str_round_trip() {
        let code = SessionCode::from_str("123456").unwrap();
        assert_eq!(code.to_string(), "123456");
    }

    #[test]
    fn test_from_str_rejects_short_and_long() {
        assert_eq!(SessionCode::from_str("99999"), Err(Error::OutOfRange));
        assert_eq!(SessionCode::from_str("1000000"), Err(Error::OutOfRange));
    }

    #[test]
    fn test_from_str_rejects_garbage() {
        assert!(matches!(
            SessionCode::from_str("abc123"),
            Err(Error::NotANumber(_))
        ));
        assert!(matches!(SessionCode::from_str(""), Err(Error::NotANumber(_))));
    }

    #[test]
    fn test_serde_uses_string_form() {
        let code = SessionCode(654_321);
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, "\"654321\"");

        let parsed: SessionCode = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, code);
    }

    #[test]
    fn test_deserialize_rejects_out_of_range() {
        let result: Result<SessionCode, _> = serde_json::from_str("\"42\"");
        assert!(result.is_err());
    }
}
