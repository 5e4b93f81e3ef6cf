// ABOUTME: Git commit SHA validation.
// ABOUTME: Accepts abbreviated or full hexadecimal object names.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

const MIN_LEN: usize = 7;
const MAX_LEN: usize = 64;
const SHORT_LEN: usize = 7;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommitShaError {
    #[error("commit SHA must be between {MIN_LEN} and {MAX_LEN} characters, got {0}")]
    Length(usize),

    #[error("commit SHA must be hexadecimal, found '{0}'")]
    NotHex(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommitSha(String);

impl CommitSha {
    pub fn new(value: &str) -> Result<Self, CommitShaError> {
        let value = value.trim();
        if !(MIN_LEN..=MAX_LEN).contains(&value.len()) {
            return Err(CommitShaError::Length(value.len()));
        }

        if let Some(c) = value.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(CommitShaError::NotHex(c));
        }

        Ok(Self(value.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form used in headings.
    pub fn short(&self) -> &str {
        &self.0[..SHORT_LEN]
    }
}

impl fmt::Display for CommitSha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for CommitSha {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CommitSha {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        CommitSha::new(&s).map_err(serde::de::Error::custom)
    }
}
