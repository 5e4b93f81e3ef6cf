// ABOUTME: In-memory forge used for offline runs and tests.
// ABOUTME: Records every side effect and can be told to fail individual operations.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};

use super::MAX_COMMENT_CHARS;
use super::error::ReportingError;
use super::traits::{CommentOps, PullRequestOps, ReactionOps, StatusOps, WorkflowOps};
use super::types::{Comment, CommitStatus, PullRequestInfo, Reaction};
use crate::types::{CommentId, CommitSha, PrNumber};

const MEMORY_SERVER_URL: &str = "https://github.com";

/// Operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForgeOp {
    ListComments,
    CreateComment,
    UpdateComment,
    AddReaction,
    SetStatus,
    GetPullRequest,
    DispatchWorkflow,
}

impl ForgeOp {
    fn operation(&self) -> &'static str {
        match self {
            ForgeOp::ListComments => "list comments",
            ForgeOp::CreateComment => "create comment",
            ForgeOp::UpdateComment => "update comment",
            ForgeOp::AddReaction => "add reaction",
            ForgeOp::SetStatus => "set commit status",
            ForgeOp::GetPullRequest => "get pull request",
            ForgeOp::DispatchWorkflow => "dispatch workflow",
        }
    }
}

/// A recorded workflow dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub workflow: String,
    pub git_ref: String,
    pub inputs: BTreeMap<String, String>,
}

#[derive(Debug, Default)]
struct State {
    next_comment_id: u64,
    comments: Vec<(PrNumber, Comment)>,
    reactions: Vec<(CommentId, Reaction)>,
    statuses: Vec<(CommitSha, CommitStatus)>,
    dispatches: Vec<Dispatch>,
    pull_requests: HashMap<PrNumber, PullRequestInfo>,
    failing: HashSet<ForgeOp>,
}

/// Forge backed by process memory.
#[derive(Debug)]
pub struct MemoryForge {
    repository: String,
    state: Mutex<State>,
}

impl Default for MemoryForge {
    fn default() -> Self {
        Self::new("local/offline")
    }
}

impl MemoryForge {
    pub fn new(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            state: Mutex::new(State {
                next_comment_id: 1000,
                ..State::default()
            }),
        }
    }

    /// Register a pull request with the given head.
    pub fn add_pull_request(&self, number: PrNumber, head_sha: CommitSha, head_ref: &str) {
        let info = PullRequestInfo {
            number,
            head_sha,
            head_ref: head_ref.to_string(),
            base_ref: "main".to_string(),
            title: format!("Pull request {number}"),
            html_url: self.pull_request_url(number),
        };
        self.state.lock().pull_requests.insert(number, info);
    }

    /// Make `op` fail until `recover` is called.
    pub fn fail(&self, op: ForgeOp) {
        self.state.lock().failing.insert(op);
    }

    pub fn recover(&self, op: ForgeOp) {
        self.state.lock().failing.remove(&op);
    }

    pub fn comments(&self, pr: PrNumber) -> Vec<Comment> {
        self.state
            .lock()
            .comments
            .iter()
            .filter(|(p, _)| *p == pr)
            .map(|(_, c)| c.clone())
            .collect()
    }

    pub fn reactions(&self) -> Vec<(CommentId, Reaction)> {
        self.state.lock().reactions.clone()
    }

    pub fn statuses(&self) -> Vec<(CommitSha, CommitStatus)> {
        self.state.lock().statuses.clone()
    }

    pub fn dispatches(&self) -> Vec<Dispatch> {
        self.state.lock().dispatches.clone()
    }

    fn pull_request_url(&self, pr: PrNumber) -> String {
        format!("{MEMORY_SERVER_URL}/{}/pull/{pr}", self.repository)
    }

    fn check(&self, state: &State, op: ForgeOp) -> Result<(), ReportingError> {
        if state.failing.contains(&op) {
            return Err(ReportingError::api(op.operation(), 503, "injected failure"));
        }
        Ok(())
    }

    fn check_body(op: ForgeOp, body: &str) -> Result<(), ReportingError> {
        if body.chars().count() > MAX_COMMENT_CHARS {
            return Err(ReportingError::api(
                op.operation(),
                422,
                "body is too long (maximum is 65536 characters)",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl CommentOps for MemoryForge {
    async fn list_comments(&self, pr: PrNumber) -> Result<Vec<Comment>, ReportingError> {
        self.check(&self.state.lock(), ForgeOp::ListComments)?;
        Ok(self.comments(pr))
    }

    async fn create_comment(&self, pr: PrNumber, body: &str) -> Result<Comment, ReportingError> {
        let mut state = self.state.lock();
        self.check(&state, ForgeOp::CreateComment)?;
        Self::check_body(ForgeOp::CreateComment, body)?;

        state.next_comment_id += 1;
        let id = CommentId::new(state.next_comment_id);
        let comment = Comment {
            id,
            body: body.to_string(),
            html_url: format!("{}#issuecomment-{id}", self.pull_request_url(pr)),
        };
        state.comments.push((pr, comment.clone()));
        Ok(comment)
    }

    async fn update_comment(&self, id: CommentId, body: &str) -> Result<Comment, ReportingError> {
        let mut state = self.state.lock();
        self.check(&state, ForgeOp::UpdateComment)?;
        Self::check_body(ForgeOp::UpdateComment, body)?;

        let (_, comment) = state
            .comments
            .iter_mut()
            .find(|(_, c)| c.id == id)
            .ok_or_else(|| ReportingError::NotFound {
                what: format!("comment {id}"),
            })?;
        comment.body = body.to_string();
        Ok(comment.clone())
    }
}

#[async_trait]
impl ReactionOps for MemoryForge {
    async fn add_reaction(
        &self,
        comment: CommentId,
        reaction: Reaction,
    ) -> Result<(), ReportingError> {
        let mut state = self.state.lock();
        self.check(&state, ForgeOp::AddReaction)?;
        state.reactions.push((comment, reaction));
        Ok(())
    }
}

#[async_trait]
impl StatusOps for MemoryForge {
    async fn set_commit_status(
        &self,
        sha: &CommitSha,
        status: &CommitStatus,
    ) -> Result<(), ReportingError> {
        let mut state = self.state.lock();
        self.check(&state, ForgeOp::SetStatus)?;
        state.statuses.push((sha.clone(), status.clone()));
        Ok(())
    }
}

#[async_trait]
impl PullRequestOps for MemoryForge {
    async fn get_pull_request(&self, pr: PrNumber) -> Result<PullRequestInfo, ReportingError> {
        let state = self.state.lock();
        self.check(&state, ForgeOp::GetPullRequest)?;
        state
            .pull_requests
            .get(&pr)
            .cloned()
            .ok_or_else(|| ReportingError::NotFound {
                what: format!("pull request #{pr}"),
            })
    }
}

#[async_trait]
impl WorkflowOps for MemoryForge {
    async fn dispatch_workflow(
        &self,
        workflow: &str,
        git_ref: &str,
        inputs: &BTreeMap<String, String>,
    ) -> Result<(), ReportingError> {
        let mut state = self.state.lock();
        self.check(&state, ForgeOp::DispatchWorkflow)?;
        state.dispatches.push(Dispatch {
            workflow: workflow.to_string(),
            git_ref: git_ref.to_string(),
            inputs: inputs.clone(),
        });
        Ok(())
    }

    fn workflow_url(&self, workflow: &str) -> String {
        format!(
            "{MEMORY_SERVER_URL}/{}/actions/workflows/{workflow}",
            self.repository
        )
    }
}
