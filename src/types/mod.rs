// ABOUTME: Validated domain types and typed GitHub identifiers.
// ABOUTME: Uses phantom types to keep PR numbers and comment IDs apart.

mod commit_sha;
mod id;
mod layer_name;

pub use commit_sha::{CommitSha, CommitShaError};
pub use id::{CommentId, PrNumber};
pub use layer_name::{ALL_LAYERS, LayerName, LayerNameError};
