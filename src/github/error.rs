// ABOUTME: Reporting error types with SNAFU pattern.
// ABOUTME: Covers comment, reaction, status and workflow calls against the forge API.

use snafu::Snafu;

use crate::dashboard::{CodecError, StageError};

/// Failure of a best-effort reporting call (dashboard, comments, statuses).
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ReportingError {
    #[snafu(display("{operation} request failed: {source}"))]
    Transport {
        operation: &'static str,
        source: reqwest::Error,
    },

    #[snafu(display("{operation} returned HTTP {status}: {message}"))]
    Api {
        operation: &'static str,
        status: u16,
        message: String,
    },

    #[snafu(display("{operation} response could not be decoded: {source}"))]
    Decode {
        operation: &'static str,
        source: serde_json::Error,
    },

    #[snafu(display("{what} not found"))]
    NotFound { what: String },

    #[snafu(display("dashboard state could not be encoded: {source}"))]
    Encode { source: CodecError },

    #[snafu(display("dashboard stage update rejected: {source}"))]
    Stage { source: StageError },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportingErrorKind {
    /// Network failure before a response arrived.
    Transport,
    /// Request exceeded the API timeout.
    Timeout,
    /// Token lacks permission or the rate limit was hit.
    Forbidden,
    /// Target comment, pull request or workflow does not exist.
    NotFound,
    /// Any other non-success status.
    Api,
    /// Response body was not what we expected.
    Decode,
    /// Dashboard state could not be serialized.
    Encode,
    /// Stage key unknown or transition not allowed.
    Stage,
}

impl ReportingError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> ReportingErrorKind {
        match self {
            ReportingError::Transport { source, .. } if source.is_timeout() => {
                ReportingErrorKind::Timeout
            }
            ReportingError::Transport { .. } => ReportingErrorKind::Transport,
            ReportingError::Api { status: 401 | 403 | 429, .. } => ReportingErrorKind::Forbidden,
            ReportingError::Api { status: 404, .. } => ReportingErrorKind::NotFound,
            ReportingError::Api { .. } => ReportingErrorKind::Api,
            ReportingError::Decode { .. } => ReportingErrorKind::Decode,
            ReportingError::NotFound { .. } => ReportingErrorKind::NotFound,
            ReportingError::Encode { .. } => ReportingErrorKind::Encode,
            ReportingError::Stage { .. } => ReportingErrorKind::Stage,
        }
    }

    /// Construct an API error, mostly useful for fakes.
    pub fn api(operation: &'static str, status: u16, message: impl Into<String>) -> Self {
        ReportingError::Api {
            operation,
            status,
            message: message.into(),
        }
    }
}
