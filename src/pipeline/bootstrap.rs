// ABOUTME: Bootstrap layer runs: always plain terraform, since the layer hosts the CI tooling itself.
// ABOUTME: Plan reports to plan-bootstrap; apply reports to the apply stage and only applies real changes.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use super::outcome::{LayerOutcome, LayerReport, RunKind, RunReport};
use super::Sequencer;
use crate::dashboard::{APPLY_STAGE, Status};
use crate::diagnostics::WarningKind;
use crate::engine::{LayerRunner, PlanSummary};
use crate::error::{Error, Result};
use crate::registry::EngineKind;

pub const BOOTSTRAP_LAYER: &str = "bootstrap";

const APPLY_HINT: &str = "> **Next**: Run `/bootstrap apply` to deploy.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BootstrapAction {
    Plan,
    Apply,
}

impl BootstrapAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BootstrapAction::Plan => "plan",
            BootstrapAction::Apply => "apply",
        }
    }

    fn run_kind(&self) -> RunKind {
        match self {
            BootstrapAction::Plan => RunKind::BootstrapPlan,
            BootstrapAction::Apply => RunKind::BootstrapApply,
        }
    }

    fn stage_key(&self) -> String {
        match self {
            BootstrapAction::Plan => format!("plan-{BOOTSTRAP_LAYER}"),
            BootstrapAction::Apply => APPLY_STAGE.to_string(),
        }
    }
}

impl fmt::Display for BootstrapAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BootstrapAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plan" => Ok(BootstrapAction::Plan),
            "apply" => Ok(BootstrapAction::Apply),
            other => Err(Error::InvalidEvent(format!(
                "bootstrap action must be plan or apply, got \"{other}\""
            ))),
        }
    }
}

impl Sequencer<'_> {
    /// Run init, plan and (for apply with changes) apply on the bootstrap layer.
    pub async fn run_bootstrap(&mut self, action: BootstrapAction) -> Result<RunReport> {
        let mut layer = self
            .registry
            .get(BOOTSTRAP_LAYER)
            .cloned()
            .ok_or_else(|| Error::NoValidLayers(vec![BOOTSTRAP_LAYER.to_string()]))?;
        layer.engine = EngineKind::Terraform;

        let kind = action.run_kind();
        let key = action.stage_key();
        let title = kind.title();
        tracing::info!(action = %action, "Starting bootstrap");

        self.start_result(&format!("{title} Running...")).await;
        self.stage(&key, Status::Running).await;

        let runner = LayerRunner::new(self.engine, &layer);
        let mut report = RunReport::new(kind);

        let init = runner.init().await;
        if !init.success {
            report.push(LayerReport::new(
                layer.name.clone(),
                LayerOutcome::Error,
                format!("❌ Init failed:\n{}", init.combined_output()),
            ));
            self.stage(&key, Status::Failure).await;
            self.finish_result(&format!("{title} Init Failed"), &report)
                .await;
            return Ok(report);
        }

        let plan = runner.plan(true).await;
        let plan_outcome = LayerOutcome::from_plan(&plan);
        let summary = PlanSummary::parse(&plan.stdout);

        let (layer_report, result_title) = match (action, plan_outcome) {
            (_, LayerOutcome::Error) => (
                LayerReport::new(layer.name.clone(), LayerOutcome::Error, plan.combined_output()),
                format!("{title} Failed"),
            ),
            (BootstrapAction::Plan, outcome) => {
                let label = if outcome == LayerOutcome::HasChanges {
                    "Changes"
                } else {
                    "No Changes"
                };
                (
                    LayerReport::new(layer.name.clone(), outcome, plan.combined_output())
                        .with_summary(summary),
                    format!("{title} ({label})"),
                )
            }
            (BootstrapAction::Apply, LayerOutcome::HasChanges) => {
                let apply = runner.apply(true).await;
                if apply.success {
                    (
                        LayerReport::new(layer.name.clone(), LayerOutcome::Applied, apply.combined_output())
                            .with_summary(summary),
                        format!("{title} Complete"),
                    )
                } else {
                    (
                        LayerReport::new(layer.name.clone(), LayerOutcome::Error, apply.combined_output()),
                        format!("{title} Failed"),
                    )
                }
            }
            (BootstrapAction::Apply, outcome) => (
                LayerReport::new(layer.name.clone(), outcome, plan.combined_output()),
                format!("{title} (No Changes)"),
            ),
        };

        let failed = layer_report.outcome.is_error();
        let has_changes = layer_report.outcome == LayerOutcome::HasChanges;
        report.push(layer_report);

        self.stage(&key, if failed { Status::Failure } else { Status::Success })
            .await;
        self.finish_result(&result_title, &report).await;

        if action == BootstrapAction::Plan
            && has_changes
            && let Some(reporter) = self.reporter.as_ref()
        {
            let result = reporter.post(APPLY_HINT).await.map(|_| ());
            self.note(WarningKind::ResultComment, "apply hint failed", result);
        }

        Ok(report)
    }
}
