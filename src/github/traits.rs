// ABOUTME: Composable capability traits for the source-control host.
// ABOUTME: Defines CommentOps, ReactionOps, StatusOps, PullRequestOps, WorkflowOps and Forge.

use async_trait::async_trait;
use std::collections::BTreeMap;

use super::error::ReportingError;
use super::types::{Comment, CommitStatus, PullRequestInfo, Reaction};
use crate::types::{CommentId, CommitSha, PrNumber};

/// Pull request comment operations.
#[async_trait]
pub trait CommentOps: Send + Sync {
    /// All comments on a pull request, oldest first.
    async fn list_comments(&self, pr: PrNumber) -> Result<Vec<Comment>, ReportingError>;

    async fn create_comment(&self, pr: PrNumber, body: &str) -> Result<Comment, ReportingError>;

    async fn update_comment(&self, id: CommentId, body: &str)
    -> Result<Comment, ReportingError>;

    /// First comment whose body contains `marker`.
    async fn find_comment(
        &self,
        pr: PrNumber,
        marker: &str,
    ) -> Result<Option<Comment>, ReportingError> {
        let comments = self.list_comments(pr).await?;
        Ok(comments.into_iter().find(|c| c.body.contains(marker)))
    }
}

#[async_trait]
pub trait ReactionOps: Send + Sync {
    async fn add_reaction(&self, comment: CommentId, reaction: Reaction)
    -> Result<(), ReportingError>;
}

#[async_trait]
pub trait StatusOps: Send + Sync {
    async fn set_commit_status(
        &self,
        sha: &CommitSha,
        status: &CommitStatus,
    ) -> Result<(), ReportingError>;
}

#[async_trait]
pub trait PullRequestOps: Send + Sync {
    async fn get_pull_request(&self, pr: PrNumber) -> Result<PullRequestInfo, ReportingError>;
}

/// Manually dispatched workflows.
#[async_trait]
pub trait WorkflowOps: Send + Sync {
    async fn dispatch_workflow(
        &self,
        workflow: &str,
        git_ref: &str,
        inputs: &BTreeMap<String, String>,
    ) -> Result<(), ReportingError>;

    /// Human-facing page listing runs of `workflow`.
    fn workflow_url(&self, workflow: &str) -> String;
}

/// Everything the pipeline needs from the host.
pub trait Forge: CommentOps + ReactionOps + StatusOps + PullRequestOps + WorkflowOps {}

impl<T> Forge for T where T: CommentOps + ReactionOps + StatusOps + PullRequestOps + WorkflowOps {}
