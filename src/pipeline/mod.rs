// ABOUTME: Pipeline sequencer: runs plan and apply across layers in registry order.
// ABOUTME: Plan continues past layer errors; apply stops at the first failure.

mod bootstrap;
mod outcome;
mod report;
mod reporter;
mod verify;

pub use bootstrap::{BOOTSTRAP_LAYER, BootstrapAction};
pub use outcome::{LayerOutcome, LayerReport, RunKind, RunReport};
pub use reporter::PrReporter;
pub use verify::verify_exit_code;

use crate::dashboard::{APPLY_STAGE, StageUpdate, Status};
use crate::diagnostics::{Diagnostics, Warning, WarningKind};
use crate::engine::{Engine, LayerRunner, PlanSummary};
use crate::error::Result;
use crate::github::ReportingError;
use crate::registry::{Layer, LayerRegistry, LayerSelection};

/// Drives engine runs and mirrors progress onto the dashboard.
pub struct Sequencer<'a> {
    registry: &'a LayerRegistry,
    engine: &'a dyn Engine,
    reporter: Option<PrReporter<'a>>,
    diagnostics: Diagnostics,
}

impl<'a> Sequencer<'a> {
    pub fn new(registry: &'a LayerRegistry, engine: &'a dyn Engine) -> Self {
        Self {
            registry,
            engine,
            reporter: None,
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn with_reporter(mut self, reporter: Option<PrReporter<'a>>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn reporter(&self) -> Option<&PrReporter<'a>> {
        self.reporter.as_ref()
    }

    pub fn into_parts(self) -> (Option<PrReporter<'a>>, Diagnostics) {
        (self.reporter, self.diagnostics)
    }

    fn note(&mut self, kind: WarningKind, context: &str, result: std::result::Result<(), ReportingError>) {
        if let Err(e) = result {
            self.diagnostics.warn(Warning::reporting(kind, context, &e));
        }
    }

    /// Record a stage transition; persisted before returning.
    async fn stage(&mut self, key: &str, status: Status) {
        let Some(reporter) = self.reporter.as_mut() else {
            return;
        };
        let result = reporter.update_stage(StageUpdate::new(key, status)).await;
        self.diagnostics.dashboard_saved(result);
    }

    async fn start_result(&mut self, title: &str) {
        let Some(reporter) = self.reporter.as_mut() else {
            return;
        };
        let result = reporter.start_result(title).await;
        self.note(WarningKind::ResultComment, "result comment failed", result);
    }

    async fn finish_result(&mut self, title: &str, report: &RunReport) {
        let Some(reporter) = self.reporter.as_mut() else {
            return;
        };
        let result = reporter.finish_result(title, report).await;
        self.note(WarningKind::ResultComment, "result comment update failed", result);
    }

    fn resolve(&self, selection: &LayerSelection) -> Result<Vec<&'a Layer>> {
        let registry: &'a LayerRegistry = self.registry;
        Ok(registry.resolve(selection)?.into_iter().collect())
    }

    /// Plan every selected layer, recording errors and moving on.
    pub async fn run_plan(&mut self, selection: &LayerSelection) -> Result<RunReport> {
        let layers = self.resolve(selection)?;
        let names: Vec<&str> = layers.iter().map(|l| l.name.as_str()).collect();
        tracing::info!(layers = ?names, "Starting plan");

        let mut report = RunReport::new(RunKind::Plan);
        self.start_result(&format!("Terraform Plan ({})", names.join(", ")))
            .await;

        for layer in layers {
            let key = layer.name.plan_stage_key();
            self.stage(&key, Status::Running).await;

            let layer_report = self.plan_layer(layer).await;
            let status = if layer_report.outcome.is_error() {
                Status::Failure
            } else {
                Status::Success
            };
            tracing::info!(layer = %layer.name, outcome = %layer_report.outcome, "Planned layer");
            report.push(layer_report);

            self.stage(&key, status).await;
        }

        self.finish_result("Terraform Plan Results", &report).await;
        Ok(report)
    }

    async fn plan_layer(&self, layer: &Layer) -> LayerReport {
        let runner = LayerRunner::new(self.engine, layer);

        let init = runner.init().await;
        if !init.success {
            tracing::warn!(layer = %layer.name, "Init failed with exit code {}", init.exit_code);
            return LayerReport::new(
                layer.name.clone(),
                LayerOutcome::Error,
                format!("❌ Init failed:\n{}", init.combined_output()),
            );
        }

        let plan = runner.plan(true).await;
        let outcome = LayerOutcome::from_plan(&plan);
        LayerReport::new(layer.name.clone(), outcome, plan.combined_output())
            .with_summary(PlanSummary::parse(&plan.stdout))
    }

    /// Apply selected layers strictly in order, aborting at the first failure.
    pub async fn run_apply(&mut self, selection: &LayerSelection) -> Result<RunReport> {
        let layers = self.resolve(selection)?;
        let names: Vec<&str> = layers.iter().map(|l| l.name.as_str()).collect();
        tracing::info!(layers = ?names, "Starting apply");

        let mut report = RunReport::new(RunKind::Apply);
        self.start_result(&format!("Terraform Apply ({})", names.join(", ")))
            .await;

        for layer in layers {
            self.stage(APPLY_STAGE, Status::Running).await;

            let layer_report = self.apply_layer(layer).await;
            let failed = layer_report.outcome.is_error();
            tracing::info!(layer = %layer.name, outcome = %layer_report.outcome, "Applied layer");
            report.push(layer_report);

            if failed {
                tracing::error!(layer = %layer.name, "Apply aborted; later layers were not attempted");
                break;
            }
        }

        let status = if report.success() {
            Status::Success
        } else {
            Status::Failure
        };
        self.stage(APPLY_STAGE, status).await;
        self.finish_result("Terraform Apply Results", &report).await;
        Ok(report)
    }

    async fn apply_layer(&self, layer: &Layer) -> LayerReport {
        let runner = LayerRunner::new(self.engine, layer);

        let init = runner.init().await;
        if !init.success {
            return LayerReport::new(
                layer.name.clone(),
                LayerOutcome::Error,
                format!("❌ Init failed:\n{}", init.combined_output()),
            );
        }

        let plan = runner.plan(true).await;
        match LayerOutcome::from_plan(&plan) {
            LayerOutcome::NoChanges => {
                return LayerReport::new(
                    layer.name.clone(),
                    LayerOutcome::NoChanges,
                    "✅ No changes to apply".to_string(),
                );
            }
            LayerOutcome::Error => {
                return LayerReport::new(
                    layer.name.clone(),
                    LayerOutcome::Error,
                    format!("❌ Plan error:\n{}", plan.combined_output()),
                );
            }
            LayerOutcome::HasChanges | LayerOutcome::Applied => {}
        }

        let apply = runner.apply(true).await;
        let outcome = if apply.success {
            LayerOutcome::Applied
        } else {
            LayerOutcome::Error
        };
        LayerReport::new(layer.name.clone(), outcome, apply.combined_output())
            .with_summary(PlanSummary::parse(&plan.stdout))
    }
}
