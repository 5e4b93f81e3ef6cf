// ABOUTME: Data types exchanged with the forge API.
// ABOUTME: Comments, pull request heads, reactions and commit statuses.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{CommentId, CommitSha, PrNumber};

/// An issue comment on a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub body: String,
    #[serde(default)]
    pub html_url: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// The parts of a pull request the pipeline needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestInfo {
    pub number: PrNumber,
    pub head_sha: CommitSha,
    pub head_ref: String,
    pub base_ref: String,
    pub title: String,
    pub html_url: String,
}

/// Reaction content accepted by the reactions API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    Eyes,
    Rocket,
    ThumbsUp,
    Confused,
}

impl Reaction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reaction::Eyes => "eyes",
            Reaction::Rocket => "rocket",
            Reaction::ThumbsUp => "+1",
            Reaction::Confused => "confused",
        }
    }
}

impl fmt::Display for Reaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitState {
    Pending,
    Success,
    Failure,
    Error,
}

/// A commit status keyed by SHA and context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitStatus {
    pub state: CommitState,
    pub context: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub target_url: String,
}

impl CommitStatus {
    pub fn new(state: CommitState, context: impl Into<String>) -> Self {
        Self {
            state,
            context: context.into(),
            description: String::new(),
            target_url: String::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn target_url(mut self, url: impl Into<String>) -> Self {
        self.target_url = url.into();
        self
    }
}
