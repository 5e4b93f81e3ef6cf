// ABOUTME: Application-wide error types for layerci.
// ABOUTME: Uses thiserror for ergonomic error handling.

use std::path::PathBuf;
use thiserror::Error;

use crate::github::ReportingError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("no valid layers in selection: {0:?}")]
    NoValidLayers(Vec<String>),

    #[error("invalid event payload: {0}")]
    InvalidEvent(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("pull request required for {0}")]
    PullRequestRequired(&'static str),

    #[error(transparent)]
    Reporting(#[from] ReportingError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
