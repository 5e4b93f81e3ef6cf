// ABOUTME: Inbound trigger events, decoded from the Actions event payload.
// ABOUTME: Only the fields the router dispatches on are kept.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{CommentId, CommitSha, PrNumber};

/// Dispatch key for the router table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PullRequest,
    Push,
    Comment,
    Dispatch,
}

impl EventKind {
    /// Map an Actions `GITHUB_EVENT_NAME`.
    pub fn from_event_name(name: &str) -> Option<Self> {
        match name {
            "pull_request" | "pull_request_target" => Some(EventKind::PullRequest),
            "push" => Some(EventKind::Push),
            "issue_comment" => Some(EventKind::Comment),
            "workflow_dispatch" => Some(EventKind::Dispatch),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    PullRequest {
        number: PrNumber,
        action: String,
        head_sha: Option<CommitSha>,
    },
    Push {
        git_ref: String,
    },
    Comment {
        /// `None` for comments on plain issues.
        pr: Option<PrNumber>,
        comment_id: CommentId,
        body: String,
        user: String,
    },
    Dispatch {
        inputs: BTreeMap<String, String>,
    },
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::PullRequest { .. } => EventKind::PullRequest,
            Event::Push { .. } => EventKind::Push,
            Event::Comment { .. } => EventKind::Comment,
            Event::Dispatch { .. } => EventKind::Dispatch,
        }
    }

    /// Pull request the event is attached to, if any.
    pub fn pr(&self) -> Option<PrNumber> {
        match self {
            Event::PullRequest { number, .. } => Some(*number),
            Event::Comment { pr, .. } => *pr,
            Event::Dispatch { inputs } => inputs
                .get("pr_number")
                .and_then(|n| n.trim().parse::<u64>().ok())
                .map(PrNumber::new),
            Event::Push { .. } => None,
        }
    }

    /// Decode a payload for the named event. Unsupported events yield `None`.
    pub fn from_payload(event_name: &str, payload: &str) -> Result<Option<Self>> {
        let Some(kind) = EventKind::from_event_name(event_name) else {
            tracing::debug!(event_name, "Ignoring unsupported event");
            return Ok(None);
        };

        let invalid = |e: serde_json::Error| Error::InvalidEvent(format!("{event_name}: {e}"));

        let event = match kind {
            EventKind::PullRequest => {
                let p: PullRequestPayload = serde_json::from_str(payload).map_err(invalid)?;
                Event::PullRequest {
                    number: PrNumber::new(p.pull_request.number),
                    action: p.action.unwrap_or_default(),
                    head_sha: CommitSha::new(&p.pull_request.head.sha).ok(),
                }
            }
            EventKind::Push => {
                let p: PushPayload = serde_json::from_str(payload).map_err(invalid)?;
                Event::Push { git_ref: p.git_ref }
            }
            EventKind::Comment => {
                let p: CommentPayload = serde_json::from_str(payload).map_err(invalid)?;
                if p.action.as_deref().is_some_and(|a| a != "created") {
                    tracing::debug!(action = ?p.action, "Ignoring comment edit");
                    return Ok(None);
                }
                Event::Comment {
                    pr: p
                        .issue
                        .pull_request
                        .is_some()
                        .then(|| PrNumber::new(p.issue.number)),
                    comment_id: CommentId::new(p.comment.id),
                    body: p.comment.body.unwrap_or_default(),
                    user: p.comment.user.login,
                }
            }
            EventKind::Dispatch => {
                let p: DispatchPayload = serde_json::from_str(payload).map_err(invalid)?;
                let inputs = p
                    .inputs
                    .into_iter()
                    .filter_map(|(k, v)| input_string(v).map(|v| (k, v)))
                    .collect();
                Event::Dispatch { inputs }
            }
        };
        Ok(Some(event))
    }

    pub fn load(event_name: &str, path: &Path) -> Result<Option<Self>> {
        let payload = std::fs::read_to_string(path)?;
        Self::from_payload(event_name, &payload)
    }
}

fn input_string(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

#[derive(Deserialize)]
struct PullRequestPayload {
    action: Option<String>,
    pull_request: PullRequestRef,
}

#[derive(Deserialize)]
struct PullRequestRef {
    number: u64,
    head: HeadRef,
}

#[derive(Deserialize)]
struct HeadRef {
    sha: String,
}

#[derive(Deserialize)]
struct PushPayload {
    #[serde(rename = "ref")]
    git_ref: String,
}

#[derive(Deserialize)]
struct CommentPayload {
    action: Option<String>,
    issue: IssueRef,
    comment: CommentRef,
}

#[derive(Deserialize)]
struct IssueRef {
    number: u64,
    #[serde(default)]
    pull_request: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct CommentRef {
    id: u64,
    body: Option<String>,
    user: UserRef,
}

#[derive(Deserialize)]
struct UserRef {
    login: String,
}

#[derive(Deserialize)]
struct DispatchPayload {
    #[serde(default)]
    inputs: BTreeMap<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHA: &str = "0123456789abcdef0123456789abcdef01234567";

    #[test]
    fn decodes_pull_request() {
        let payload = format!(
            r#"{{"action":"synchronize","pull_request":{{"number":42,"head":{{"sha":"{SHA}","ref":"feature"}}}}}}"#
        );
        let event = Event::from_payload("pull_request", &payload).unwrap().unwrap();
        assert_eq!(event.kind(), EventKind::PullRequest);
        assert_eq!(event.pr(), Some(PrNumber::new(42)));
        let Event::PullRequest { action, head_sha, .. } = event else {
            panic!("expected pull request event");
        };
        assert_eq!(action, "synchronize");
        assert_eq!(head_sha.unwrap().as_str(), SHA);
    }

    #[test]
    fn decodes_comment_on_pull_request() {
        let payload = r#"{
            "action": "created",
            "issue": {"number": 7, "pull_request": {"url": "x"}},
            "comment": {"id": 99, "body": "/plan platform", "user": {"login": "octo"}}
        }"#;
        let event = Event::from_payload("issue_comment", payload).unwrap().unwrap();
        assert_eq!(
            event,
            Event::Comment {
                pr: Some(PrNumber::new(7)),
                comment_id: CommentId::new(99),
                body: "/plan platform".to_string(),
                user: "octo".to_string(),
            }
        );
    }

    #[test]
    fn comment_on_issue_has_no_pr() {
        let payload = r#"{
            "issue": {"number": 7},
            "comment": {"id": 1, "body": "/plan", "user": {"login": "octo"}}
        }"#;
        let event = Event::from_payload("issue_comment", payload).unwrap().unwrap();
        assert_eq!(event.pr(), None);
    }

    #[test]
    fn edited_comments_are_ignored() {
        let payload = r#"{
            "action": "edited",
            "issue": {"number": 7, "pull_request": {}},
            "comment": {"id": 1, "body": "/apply", "user": {"login": "octo"}}
        }"#;
        assert!(Event::from_payload("issue_comment", payload).unwrap().is_none());
    }

    #[test]
    fn dispatch_inputs_become_strings() {
        let payload = r#"{"inputs": {"command": "plan", "layers": "platform", "pr_number": "12", "dry": true, "empty": null}}"#;
        let event = Event::from_payload("workflow_dispatch", payload).unwrap().unwrap();
        assert_eq!(event.pr(), Some(PrNumber::new(12)));
        let Event::Dispatch { inputs } = event else {
            panic!("expected dispatch event");
        };
        assert_eq!(inputs["dry"], "true");
        assert!(!inputs.contains_key("empty"));
    }

    #[test]
    fn unsupported_event_is_none() {
        assert!(Event::from_payload("release", "{}").unwrap().is_none());
    }

    #[test]
    fn malformed_payload_is_error() {
        let err = Event::from_payload("push", "{}").unwrap_err();
        assert!(matches!(err, Error::InvalidEvent(_)));
    }
}
