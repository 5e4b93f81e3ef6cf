// ABOUTME: Per-layer and per-run results of plan, apply, bootstrap and verify.
// ABOUTME: Decides overall success and the process exit code.

use serde::Serialize;
use std::fmt;

use crate::engine::{ExecutionResult, PlanResult, PlanSummary};
use crate::types::LayerName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerOutcome {
    NoChanges,
    HasChanges,
    Applied,
    Error,
}

impl LayerOutcome {
    pub fn from_plan(result: &ExecutionResult) -> Self {
        match result.plan_result {
            Some(PlanResult::NoChanges) => LayerOutcome::NoChanges,
            Some(PlanResult::HasChanges) => LayerOutcome::HasChanges,
            _ => LayerOutcome::Error,
        }
    }

    pub fn is_error(&self) -> bool {
        *self == LayerOutcome::Error
    }

    pub fn icon(&self) -> &'static str {
        match self {
            LayerOutcome::NoChanges => "✅",
            LayerOutcome::HasChanges => "⚠️",
            LayerOutcome::Applied => "🚀",
            LayerOutcome::Error => "❌",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LayerOutcome::NoChanges => "no_changes",
            LayerOutcome::HasChanges => "has_changes",
            LayerOutcome::Applied => "applied",
            LayerOutcome::Error => "error",
        }
    }
}

impl fmt::Display for LayerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which pipeline produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunKind {
    Plan,
    Apply,
    BootstrapPlan,
    BootstrapApply,
    Verify,
}

impl RunKind {
    pub fn title(&self) -> &'static str {
        match self {
            RunKind::Plan => "Terraform Plan",
            RunKind::Apply => "Terraform Apply",
            RunKind::BootstrapPlan => "Bootstrap Plan",
            RunKind::BootstrapApply => "Bootstrap Apply",
            RunKind::Verify => "Drift Verification",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LayerReport {
    pub layer: LayerName,
    pub outcome: LayerOutcome,
    #[serde(skip)]
    pub output: String,
    #[serde(skip)]
    pub summary: Option<PlanSummary>,
}

impl LayerReport {
    pub fn new(layer: LayerName, outcome: LayerOutcome, output: String) -> Self {
        Self {
            layer,
            outcome,
            output,
            summary: None,
        }
    }

    pub fn with_summary(mut self, summary: PlanSummary) -> Self {
        self.summary = Some(summary);
        self
    }
}

/// Aggregate result of one sequencer run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub kind: RunKind,
    pub layers: Vec<LayerReport>,
}

impl RunReport {
    pub fn new(kind: RunKind) -> Self {
        Self {
            kind,
            layers: Vec::new(),
        }
    }

    pub fn push(&mut self, report: LayerReport) {
        self.layers.push(report);
    }

    pub fn success(&self) -> bool {
        !self.layers.iter().any(|l| l.outcome.is_error())
    }

    pub fn exit_code(&self) -> i32 {
        if self.success() { 0 } else { 1 }
    }

    pub fn outcome_of(&self, layer: &str) -> Option<LayerOutcome> {
        self.layers
            .iter()
            .find(|l| l.layer.as_str() == layer)
            .map(|l| l.outcome)
    }

    /// Layers whose plan shows pending changes.
    pub fn drifted(&self) -> impl Iterator<Item = &LayerReport> {
        self.layers
            .iter()
            .filter(|l| l.outcome == LayerOutcome::HasChanges)
    }

    /// One line per layer, for terminal output.
    pub fn summary_lines(&self) -> Vec<String> {
        self.layers
            .iter()
            .map(|l| format!("{} {}: {}", l.outcome.icon(), l.layer, l.outcome))
            .collect()
    }
}
