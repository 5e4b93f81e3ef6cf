// ABOUTME: Append-only action history shown under the stage table.
// ABOUTME: HistoryPolicy decides which stage updates produce an entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::stage::Status;

/// Newest history entries rendered in the table. Older ones stay in the state block.
pub const HISTORY_ROWS: usize = 25;

/// Newest history entries carried to the dashboard of a new commit.
pub const CARRY_HISTORY_LIMIT: usize = 50;

/// One audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionHistoryItem {
    pub action: String,
    pub trigger: String,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub time: DateTime<Utc>,
}

/// When a stage update is recorded in the history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HistoryPolicy {
    /// Record status changes and every terminal status, repeats included.
    #[default]
    ChangeOrTerminal,
    /// Record every update.
    EveryUpdate,
    /// Record status changes only.
    ChangeOnly,
}

impl HistoryPolicy {
    pub fn should_record(&self, previous: Status, next: Status) -> bool {
        match self {
            HistoryPolicy::ChangeOrTerminal => previous != next || next.is_terminal(),
            HistoryPolicy::EveryUpdate => true,
            HistoryPolicy::ChangeOnly => previous != next,
        }
    }
}
