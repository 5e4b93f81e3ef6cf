// ABOUTME: Drift sweep over every registered layer: plan only, never apply.
// ABOUTME: Drift is reported; only engine errors (or drift with fail_on_drift) fail the run.

use super::outcome::{RunKind, RunReport};
use super::Sequencer;
use crate::error::Result;
use crate::registry::LayerSelection;

impl Sequencer<'_> {
    pub async fn run_verify(&mut self) -> Result<RunReport> {
        let layers = self.resolve(&LayerSelection::All)?;
        tracing::info!(count = layers.len(), "Starting drift verification");

        let mut report = RunReport::new(RunKind::Verify);
        self.start_result("Drift Verification Running...").await;

        for layer in layers {
            let layer_report = self.plan_layer(layer).await;
            if layer_report.outcome.is_error() {
                tracing::error!(layer = %layer.name, "Verification plan failed");
            } else if layer_report.outcome == super::LayerOutcome::HasChanges {
                tracing::warn!(layer = %layer.name, "Drift detected");
            }
            report.push(layer_report);
        }

        let title = match (report.success(), report.drifted().count()) {
            (false, _) => "Drift Verification Failed".to_string(),
            (true, 0) => "Drift Verification (No Drift)".to_string(),
            (true, n) => format!("Drift Verification ({n} layer(s) drifted)"),
        };
        self.finish_result(&title, &report).await;
        Ok(report)
    }
}

/// Process exit code for a verification run.
pub fn verify_exit_code(report: &RunReport, fail_on_drift: bool) -> i32 {
    if !report.success() || (fail_on_drift && report.drifted().next().is_some()) {
        1
    } else {
        0
    }
}
