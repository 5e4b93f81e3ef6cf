// ABOUTME: Dashboard stage rows and their status state machine.
// ABOUTME: Builds the fixed stage set from the layer registry and dashboard config.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::DashboardConfig;
use crate::registry::LayerRegistry;

/// Key of the aggregate apply stage.
pub const APPLY_STAGE: &str = "apply";

/// Lifecycle of one stage: pending, running, then success or failure; skipped only from pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending,
    Running,
    Success,
    Failure,
    Skipped,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Running => "running",
            Status::Success => "success",
            Status::Failure => "failure",
            Status::Skipped => "skipped",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Status::Pending => "⏳",
            Status::Running => "🔄",
            Status::Success => "✅",
            Status::Failure => "❌",
            Status::Skipped => "⏭️",
        }
    }

    /// Success or failure.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Success | Status::Failure)
    }

    /// Counts toward merge readiness.
    pub fn is_done(&self) -> bool {
        matches!(self, Status::Success | Status::Skipped)
    }

    /// Whether a stage currently in `self` may move to `next`.
    pub fn can_transition_to(&self, next: Status) -> bool {
        match next {
            Status::Pending => *self == Status::Pending,
            Status::Skipped => matches!(self, Status::Pending | Status::Skipped),
            Status::Running | Status::Success | Status::Failure => true,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status: {0} (expected pending, running, success, failure or skipped)")]
pub struct UnknownStatus(String);

impl FromStr for Status {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Status::Pending),
            "running" => Ok(Status::Running),
            "success" => Ok(Status::Success),
            "failure" => Ok(Status::Failure),
            "skipped" => Ok(Status::Skipped),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// One row of the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageStatus {
    pub name: String,
    pub status: Status,
    pub link: Option<String>,
    pub time: Option<DateTime<Utc>>,
    /// Whether this stage gates merge readiness.
    pub required: bool,
}

impl StageStatus {
    pub fn new(name: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            status: Status::Pending,
            link: None,
            time: None,
            required,
        }
    }
}

/// Insertion-ordered stage map. Keys are fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSet {
    entries: Vec<(String, StageStatus)>,
}

impl StageSet {
    pub fn new(entries: Vec<(String, StageStatus)>) -> Self {
        Self { entries }
    }

    /// Plan stage per layer, the apply stage, then configured auxiliary stages.
    pub fn defaults(registry: &LayerRegistry, config: &DashboardConfig) -> Self {
        let mut entries: Vec<(String, StageStatus)> = registry
            .names()
            .map(|name| {
                (
                    name.plan_stage_key(),
                    StageStatus::new(format!("Plan: {name}"), true),
                )
            })
            .collect();

        entries.push((
            APPLY_STAGE.to_string(),
            StageStatus::new("Apply", config.require_apply),
        ));

        entries.extend(
            config
                .stages
                .iter()
                .map(|s| (s.key.clone(), StageStatus::new(s.name.clone(), s.required))),
        );

        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&StageStatus> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, s)| s)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut StageStatus> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, s)| s)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StageStatus)> {
        self.entries.iter().map(|(k, s)| (k.as_str(), s))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy of this set with every stage back at pending.
    pub fn reset(&self) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .map(|(k, s)| (k.clone(), StageStatus::new(s.name.clone(), s.required)))
                .collect(),
        }
    }
}
