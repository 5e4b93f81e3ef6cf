// ABOUTME: GitHub Actions environment context.
// ABOUTME: Reads repository, token, run and event variables set by the runner.

use std::path::PathBuf;

use crate::error::{Error, Result};

const DEFAULT_SERVER_URL: &str = "https://github.com";
const DEFAULT_API_URL: &str = "https://api.github.com";

/// Values provided by the Actions runner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitHubEnv {
    pub repository: String,
    pub token: Option<String>,
    pub server_url: String,
    pub api_url: String,
    pub run_id: Option<String>,
    pub event_name: Option<String>,
    pub event_path: Option<PathBuf>,
    pub git_ref: Option<String>,
    pub output_path: Option<PathBuf>,
}

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

impl GitHubEnv {
    pub fn from_env() -> Self {
        Self {
            repository: var("GITHUB_REPOSITORY").unwrap_or_default(),
            token: var("GITHUB_TOKEN"),
            server_url: var("GITHUB_SERVER_URL").unwrap_or_else(|| DEFAULT_SERVER_URL.to_string()),
            api_url: var("GITHUB_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            run_id: var("GITHUB_RUN_ID"),
            event_name: var("GITHUB_EVENT_NAME"),
            event_path: var("GITHUB_EVENT_PATH").map(PathBuf::from),
            git_ref: var("GITHUB_REF"),
            output_path: var("GITHUB_OUTPUT").map(PathBuf::from),
        }
    }

    /// Token, or an error naming the missing variable.
    pub fn require_token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .ok_or_else(|| Error::MissingEnvVar("GITHUB_TOKEN".to_string()))
    }

    pub fn require_repository(&self) -> Result<&str> {
        if self.repository.is_empty() {
            return Err(Error::MissingEnvVar("GITHUB_REPOSITORY".to_string()));
        }
        Ok(&self.repository)
    }

    /// Link to the current workflow run, when running inside Actions.
    pub fn run_url(&self) -> Option<String> {
        let run_id = self.run_id.as_ref()?;
        Some(format!(
            "{}/{}/actions/runs/{}",
            self.server_url, self.repository, run_id
        ))
    }

    pub fn pull_request_url(&self, pr: crate::types::PrNumber) -> String {
        format!("{}/{}/pull/{}", self.server_url, self.repository, pr)
    }
}
