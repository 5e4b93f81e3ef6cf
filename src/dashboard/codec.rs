// ABOUTME: Wire format of the machine-readable state embedded in the dashboard comment.
// ABOUTME: StateCodec isolates encoding; JsonCodec escapes markup so the blob stays inside its HTML comment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::history::ActionHistoryItem;
use super::stage::Status;
use crate::types::CommitSha;

/// Bumped when the persisted layout changes incompatibly.
pub const STATE_VERSION: u32 = 1;

const STATE_OPEN: &str = "<!-- infra-dashboard-state:";
const STATE_CLOSE: &str = " /infra-dashboard-state -->";

/// Persisted status of one stage. Name and gating come from the current config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedStage {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
}

/// Who wrote a revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriterInfo {
    pub host: String,
    pub pid: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    pub written_at: DateTime<Utc>,
}

impl WriterInfo {
    /// Writer info for the current process.
    pub fn current(run_id: Option<String>) -> Self {
        Self {
            host: gethostname::gethostname().to_string_lossy().into_owned(),
            pid: std::process::id(),
            run_id,
            written_at: Utc::now(),
        }
    }
}

/// Everything that survives between invocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub revision: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub writer: Option<WriterInfo>,
    #[serde(default)]
    pub stages: BTreeMap<String, PersistedStage>,
    #[serde(default)]
    pub history: Vec<ActionHistoryItem>,
    /// Oldest history entries dropped to keep the comment under the size limit.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub compacted: u64,
}

fn is_zero(n: &u64) -> bool {
    *n == 0
}

fn default_version() -> u32 {
    STATE_VERSION
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            revision: 0,
            writer: None,
            stages: BTreeMap::new(),
            history: Vec::new(),
            compacted: 0,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("no state block found")]
    MissingBlock,

    #[error("unsupported state version {0}")]
    UnsupportedVersion(u32),

    #[error("failed to encode state: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode state: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("rendered dashboard is {chars} characters, limit is {limit}")]
    TooLarge { chars: usize, limit: usize },
}

/// Turns persisted state into a single-line blob and back.
pub trait StateCodec: std::fmt::Debug + Send + Sync {
    fn encode(&self, state: &PersistedState) -> Result<String, CodecError>;

    fn decode(&self, blob: &str) -> Result<PersistedState, CodecError>;
}

/// JSON with `<` and `>` escaped, so the blob never closes the surrounding comment.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl StateCodec for JsonCodec {
    fn encode(&self, state: &PersistedState) -> Result<String, CodecError> {
        let json = serde_json::to_string(state).map_err(CodecError::Encode)?;
        // Both characters can only occur inside JSON strings, where \u escapes are valid.
        Ok(json.replace('<', "\\u003c").replace('>', "\\u003e"))
    }

    fn decode(&self, blob: &str) -> Result<PersistedState, CodecError> {
        let state: PersistedState = serde_json::from_str(blob).map_err(CodecError::Decode)?;
        if state.version > STATE_VERSION {
            return Err(CodecError::UnsupportedVersion(state.version));
        }
        Ok(state)
    }
}

/// The state block for `sha` wrapping an encoded blob.
pub fn state_block(sha: &CommitSha, blob: &str) -> String {
    format!("{STATE_OPEN}{sha} {blob}{STATE_CLOSE}")
}

/// Find the state block in `body` and return its SHA and blob.
pub fn extract_state_block(body: &str) -> Option<(&str, &str)> {
    let start = body.find(STATE_OPEN)? + STATE_OPEN.len();
    let rest = &body[start..];
    let end = rest.find(STATE_CLOSE)?;
    let inner = &rest[..end];
    let (sha, blob) = inner.split_once(' ')?;
    Some((sha, blob.trim()))
}
