// ABOUTME: Execution adapter for the external IaC engine (terraform / terragrunt).
// ABOUTME: Normalizes process outcomes into ExecutionResult and the tri-state PlanResult.

mod plan_summary;
mod process;

pub use plan_summary::PlanSummary;
pub use process::ProcessEngine;

use async_trait::async_trait;
use serde::Serialize;

use crate::registry::Layer;

/// Exit code reported when the engine never produced one (spawn failure, timeout, signal).
pub const SPAWN_FAILURE_EXIT_CODE: i32 = -1;

/// Outcome of a plan run with detailed exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanResult {
    NoChanges,
    HasChanges,
    Error,
}

impl PlanResult {
    /// Detailed-exit-code mapping: 0 = no changes, 2 = changes pending, anything else = error.
    pub fn from_exit_code(code: i32) -> Self {
        match code {
            0 => PlanResult::NoChanges,
            2 => PlanResult::HasChanges,
            _ => PlanResult::Error,
        }
    }
}

/// One engine subcommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Init,
    Plan { detailed_exitcode: bool },
    Apply { auto_approve: bool },
    Validate,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Init => "init",
            Operation::Plan { .. } => "plan",
            Operation::Apply { .. } => "apply",
            Operation::Validate => "validate",
        }
    }

    /// Arguments passed after the engine binary.
    pub fn args(&self) -> Vec<&'static str> {
        let mut args = vec![self.name(), "-no-color"];
        match self {
            Operation::Plan {
                detailed_exitcode: true,
            } => args.push("-detailed-exitcode"),
            Operation::Apply { auto_approve: true } => args.push("-auto-approve"),
            _ => {}
        }
        args
    }

    fn detailed_exitcode(&self) -> bool {
        matches!(
            self,
            Operation::Plan {
                detailed_exitcode: true
            }
        )
    }
}

/// Result of a single engine invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub success: bool,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    /// Only populated for plans run with detailed exit codes.
    pub plan_result: Option<PlanResult>,
}

impl ExecutionResult {
    /// Classify a finished process.
    pub fn from_exit(operation: Operation, exit_code: i32, stdout: String, stderr: String) -> Self {
        let detailed = operation.detailed_exitcode();
        let plan_result = detailed.then(|| PlanResult::from_exit_code(exit_code));
        let success = exit_code == 0 || (detailed && exit_code == 2);

        Self {
            success,
            exit_code,
            stdout,
            stderr,
            plan_result,
        }
    }

    /// The process could not be run or did not finish.
    pub fn spawn_failure(operation: Operation, message: impl Into<String>) -> Self {
        Self {
            success: false,
            exit_code: SPAWN_FAILURE_EXIT_CODE,
            stdout: String::new(),
            stderr: message.into(),
            plan_result: operation.detailed_exitcode().then_some(PlanResult::Error),
        }
    }

    pub fn combined_output(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (false, false) => format!("{}\n{}", self.stdout, self.stderr),
            (false, true) => self.stdout.clone(),
            _ => self.stderr.clone(),
        }
    }
}

/// Runs engine subcommands for a layer. Implementations never fail: problems are
/// reported through the returned `ExecutionResult`.
#[async_trait]
pub trait Engine: Send + Sync {
    async fn execute(&self, layer: &Layer, operation: Operation) -> ExecutionResult;
}

/// Engine operations bound to one layer.
pub struct LayerRunner<'a, E: Engine + ?Sized> {
    engine: &'a E,
    layer: &'a Layer,
}

impl<'a, E: Engine + ?Sized> LayerRunner<'a, E> {
    pub fn new(engine: &'a E, layer: &'a Layer) -> Self {
        Self { engine, layer }
    }

    pub fn layer(&self) -> &Layer {
        self.layer
    }

    pub async fn init(&self) -> ExecutionResult {
        self.engine.execute(self.layer, Operation::Init).await
    }

    pub async fn plan(&self, detailed_exitcode: bool) -> ExecutionResult {
        self.engine
            .execute(self.layer, Operation::Plan { detailed_exitcode })
            .await
    }

    pub async fn apply(&self, auto_approve: bool) -> ExecutionResult {
        self.engine
            .execute(self.layer, Operation::Apply { auto_approve })
            .await
    }

    pub async fn validate(&self) -> ExecutionResult {
        self.engine.execute(self.layer, Operation::Validate).await
    }
}
