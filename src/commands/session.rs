// ABOUTME: Per-invocation wiring: configuration, Actions environment, engine and forge.
// ABOUTME: Offline mode swaps the GitHub API for an in-memory forge seeded with the local HEAD.

use layerci::config::Config;
use layerci::engine::ProcessEngine;
use layerci::error::{Error, Result};
use layerci::github::{Forge, GitHubClient, GitHubEnv, MemoryForge};
use layerci::output::Output;
use layerci::router::{Context, Execution};
use layerci::types::{CommitSha, PrNumber};
use std::path::Path;
use tokio::process::Command;

/// Abbreviated SHA used offline when git cannot tell us HEAD.
const OFFLINE_SHA: &str = "0000000";

enum Backend {
    GitHub(GitHubClient),
    Memory(MemoryForge),
}

pub struct Session {
    pub config: Config,
    pub env: GitHubEnv,
    engine: ProcessEngine,
    backend: Backend,
}

impl Session {
    pub async fn open(config_path: Option<&Path>, offline: bool) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        let config = match config_path {
            Some(path) => Config::load(path)?,
            None => Config::discover(&cwd)?,
        };
        let env = GitHubEnv::from_env();
        let engine = ProcessEngine::from_config(&config, ProcessEngine::detect_repo_root().await);

        let backend = if offline {
            tracing::info!("Offline mode: comments and statuses stay in memory");
            Backend::Memory(MemoryForge::default())
        } else {
            Backend::GitHub(GitHubClient::new(&env, config.timeouts.api)?)
        };

        Ok(Self {
            config,
            env,
            engine,
            backend,
        })
    }

    pub fn offline(&self) -> bool {
        matches!(self.backend, Backend::Memory(_))
    }

    pub fn forge(&self) -> &dyn Forge {
        match &self.backend {
            Backend::GitHub(client) => client,
            Backend::Memory(memory) => memory,
        }
    }

    pub fn context(&self) -> Context<'_> {
        Context::new(&self.config, &self.engine, self.forge(), &self.env)
    }

    /// Typed PR number; offline, the PR is registered against the local HEAD.
    pub async fn pull_request(&self, number: u64) -> Result<PrNumber> {
        let pr = PrNumber::new(number);
        if let Backend::Memory(memory) = &self.backend {
            memory.add_pull_request(pr, local_head().await?, "HEAD");
        }
        Ok(pr)
    }

    /// Print what a command did and return its exit code.
    pub fn finish(&self, execution: &Execution, output: &Output) -> i32 {
        if let Some(report) = &execution.report {
            output.report(report);
        }
        output.warnings(&execution.diagnostics);

        if self.offline()
            && let Some(dashboard) = &execution.dashboard
        {
            match dashboard.render() {
                Ok(body) => output.document(&body),
                Err(e) => output.warning(&format!("could not render dashboard: {e}")),
            }
        }
        execution.exit_code
    }
}

async fn local_head() -> Result<CommitSha> {
    let head = Command::new("git").args(["rev-parse", "HEAD"]).output().await;
    let sha = head
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| CommitSha::new(&String::from_utf8_lossy(&output.stdout)).ok());
    match sha {
        Some(sha) => Ok(sha),
        None => CommitSha::new(OFFLINE_SHA).map_err(|e| Error::InvalidArgument(e.to_string())),
    }
}
