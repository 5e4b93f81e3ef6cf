// ABOUTME: Source-control host integration: capability traits and implementations.
// ABOUTME: REST client for GitHub plus an in-memory forge for offline runs.

mod client;
mod env;
mod error;
mod memory;
mod traits;
mod types;

pub use client::GitHubClient;
pub use env::GitHubEnv;
pub use error::{EncodeSnafu, ReportingError, ReportingErrorKind, StageSnafu};
pub use memory::{Dispatch, ForgeOp, MemoryForge};
pub use traits::{CommentOps, Forge, PullRequestOps, ReactionOps, StatusOps, WorkflowOps};
pub use types::{Comment, CommitState, CommitStatus, PullRequestInfo, Reaction};

/// Largest comment body GitHub accepts, in characters.
pub const MAX_COMMENT_CHARS: usize = 65_536;
