// ABOUTME: Engine implementation that spawns terraform/terragrunt processes.
// ABOUTME: Runs in the layer directory with automation-mode environment and a bounded timeout.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::config::{Config, resolve_env_map};
use crate::registry::{EngineKind, Layer};

use super::{Engine, ExecutionResult, Operation, SPAWN_FAILURE_EXIT_CODE};

/// Environment forced on every engine invocation.
const AUTOMATION_ENV: [(&str, &str); 3] = [
    ("TF_IN_AUTOMATION", "true"),
    ("TF_INPUT", "false"),
    ("TERRAGRUNT_NON_INTERACTIVE", "true"),
];

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Spawns the real engine binaries.
#[derive(Debug, Clone)]
pub struct ProcessEngine {
    repo_root: PathBuf,
    binaries: HashMap<EngineKind, PathBuf>,
    timeout: Duration,
}

impl ProcessEngine {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
            binaries: HashMap::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn from_config(config: &Config, repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
            binaries: config.engines.clone(),
            timeout: config.timeouts.engine,
        }
    }

    pub fn with_binary(mut self, engine: EngineKind, binary: impl Into<PathBuf>) -> Self {
        self.binaries.insert(engine, binary.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    /// Working directory for a layer.
    pub fn work_dir(&self, layer: &Layer) -> PathBuf {
        self.repo_root.join(&layer.path)
    }

    fn binary(&self, engine: EngineKind) -> PathBuf {
        self.binaries
            .get(&engine)
            .cloned()
            .unwrap_or_else(|| PathBuf::from(engine.binary_name()))
    }

    /// Repository root: `GITHUB_WORKSPACE`, else the git toplevel, else the current directory.
    pub async fn detect_repo_root() -> PathBuf {
        if let Ok(workspace) = std::env::var("GITHUB_WORKSPACE")
            && !workspace.is_empty()
        {
            return PathBuf::from(workspace);
        }

        let toplevel = Command::new("git")
            .args(["rev-parse", "--show-toplevel"])
            .output()
            .await;
        if let Ok(output) = toplevel
            && output.status.success()
        {
            let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !path.is_empty() {
                return PathBuf::from(path);
            }
        }

        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    }
}

#[async_trait]
impl Engine for ProcessEngine {
    async fn execute(&self, layer: &Layer, operation: Operation) -> ExecutionResult {
        let binary = self.binary(layer.engine);
        let work_dir = self.work_dir(layer);
        let args = operation.args();

        let layer_env = match resolve_env_map(&layer.env) {
            Ok(env) => env,
            Err(e) => {
                tracing::error!(layer = %layer.name, "Cannot resolve layer environment: {}", e);
                return ExecutionResult::spawn_failure(operation, e.to_string());
            }
        };

        tracing::info!(
            layer = %layer.name,
            "Running {} {} in {}",
            binary.display(),
            args.join(" "),
            work_dir.display()
        );

        let child = Command::new(&binary)
            .args(&args)
            .current_dir(&work_dir)
            .envs(AUTOMATION_ENV)
            .envs(layer_env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) => {
                tracing::error!(layer = %layer.name, "Failed to spawn {}: {}", binary.display(), e);
                return ExecutionResult::spawn_failure(
                    operation,
                    format!("failed to spawn {}: {}", binary.display(), e),
                );
            }
        };

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                tracing::error!(layer = %layer.name, "{} {} failed: {}", binary.display(), operation.name(), e);
                return ExecutionResult::spawn_failure(operation, e.to_string());
            }
            Err(_) => {
                tracing::error!(
                    layer = %layer.name,
                    "{} {} timed out after {:?}",
                    binary.display(),
                    operation.name(),
                    self.timeout
                );
                return ExecutionResult::spawn_failure(
                    operation,
                    format!("{} timed out after {:?}", operation.name(), self.timeout),
                );
            }
        };

        let exit_code = output.status.code().unwrap_or(SPAWN_FAILURE_EXIT_CODE);
        let result = ExecutionResult::from_exit(
            operation,
            exit_code,
            String::from_utf8_lossy(&output.stdout).into_owned(),
            String::from_utf8_lossy(&output.stderr).into_owned(),
        );

        if result.success {
            tracing::debug!(layer = %layer.name, "{} exited with {}", operation.name(), exit_code);
        } else {
            tracing::warn!(
                layer = %layer.name,
                "{} failed with exit code {}",
                operation.name(),
                exit_code
            );
        }

        result
    }
}
