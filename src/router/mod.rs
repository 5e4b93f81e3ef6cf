// ABOUTME: Event router: turns an inbound trigger into a pipeline run and an exit code.
// ABOUTME: Acknowledges the trigger, brackets the run with commit statuses, and contains every failure.

mod action;
mod auxiliary;
mod dispatch;
mod event;
mod outputs;

pub use action::{
    Action, AuxKind, BootstrapArgs, HelpArgs, PlanArgs, VerifyArgs, WorkflowArgs,
};
pub use dispatch::{DispatchTable, Trigger, command_from_inputs};
pub use event::{Event, EventKind};
pub use outputs::{EventOutputs, RunMode};

use crate::config::Config;
use crate::dashboard::Dashboard;
use crate::diagnostics::{Diagnostics, Warning, WarningKind};
use crate::engine::Engine;
use crate::error::Result;
use crate::github::{CommitState, CommitStatus, Forge, GitHubEnv, Reaction};
use crate::pipeline::{BootstrapAction, PrReporter, RunReport, Sequencer, verify_exit_code};
use crate::registry::LayerSelection;
use crate::types::{CommitSha, PrNumber};

/// Collaborators shared by every handler.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    pub config: &'a Config,
    pub engine: &'a dyn Engine,
    pub forge: &'a dyn Forge,
    pub env: &'a GitHubEnv,
}

/// Result of executing one action.
#[derive(Debug, Default)]
pub struct Execution {
    pub exit_code: i32,
    pub report: Option<RunReport>,
    /// Final dashboard state, when the action touched one.
    pub dashboard: Option<Dashboard>,
    pub diagnostics: Diagnostics,
}

impl<'a> Context<'a> {
    pub fn new(
        config: &'a Config,
        engine: &'a dyn Engine,
        forge: &'a dyn Forge,
        env: &'a GitHubEnv,
    ) -> Self {
        Self {
            config,
            engine,
            forge,
            env,
        }
    }

    async fn open_reporter(
        &self,
        pr: Option<PrNumber>,
        trigger: &str,
        diagnostics: &mut Diagnostics,
    ) -> Option<PrReporter<'a>> {
        let pr = pr?;
        match PrReporter::open(self.forge, self.config, self.env, pr, trigger, diagnostics).await {
            Ok(reporter) => Some(reporter),
            Err(e) => {
                diagnostics.warn(Warning::reporting(
                    WarningKind::DashboardLoad,
                    &format!("pull request #{pr} unavailable, running without dashboard"),
                    &e,
                ));
                None
            }
        }
    }

    /// Run one action to completion.
    ///
    /// Engine failures show up in the exit code; only configuration and
    /// resolution problems come back as `Err`.
    pub async fn execute(&self, action: &Action, trigger: &str) -> Result<Execution> {
        let mut diagnostics = Diagnostics::default();

        let run = match action {
            Action::Nothing => return Ok(Execution::default()),
            Action::Help(args) => {
                let exit_code = auxiliary::post_help(self, *args, &mut diagnostics).await;
                return Ok(Execution {
                    exit_code,
                    diagnostics,
                    ..Execution::default()
                });
            }
            Action::Workflow(args) => {
                let (exit_code, reporter) =
                    auxiliary::run_workflow(self, *args, trigger, &mut diagnostics).await?;
                return Ok(Execution {
                    exit_code,
                    dashboard: reporter.map(PrReporter::into_dashboard),
                    diagnostics,
                    ..Execution::default()
                });
            }
            Action::Plan(args) => PipelineRun::Plan(&args.layers),
            Action::Apply(args) => PipelineRun::Apply(&args.layers),
            Action::Bootstrap(args) => PipelineRun::Bootstrap(args.action),
            Action::Verify(args) => PipelineRun::Verify {
                fail_on_drift: args.fail_on_drift,
            },
        };

        let reporter = self.open_reporter(action.pr(), trigger, &mut diagnostics).await;
        let mut sequencer = Sequencer::new(&self.config.layers, self.engine)
            .with_reporter(reporter)
            .with_diagnostics(diagnostics);

        let outcome = match run {
            PipelineRun::Plan(layers) => {
                sequencer.run_plan(layers).await.map(|r| (r.exit_code(), r))
            }
            PipelineRun::Apply(layers) => {
                sequencer.run_apply(layers).await.map(|r| (r.exit_code(), r))
            }
            PipelineRun::Bootstrap(action) => sequencer
                .run_bootstrap(action)
                .await
                .map(|r| (r.exit_code(), r)),
            PipelineRun::Verify { fail_on_drift } => sequencer
                .run_verify()
                .await
                .map(|r| (verify_exit_code(&r, fail_on_drift), r)),
        };

        let (reporter, diagnostics) = sequencer.into_parts();
        let (exit_code, report) = outcome?;
        Ok(Execution {
            exit_code,
            report: Some(report),
            dashboard: reporter.map(PrReporter::into_dashboard),
            diagnostics,
        })
    }
}

enum PipelineRun<'x> {
    Plan(&'x LayerSelection),
    Apply(&'x LayerSelection),
    Bootstrap(BootstrapAction),
    Verify { fail_on_drift: bool },
}

/// Everything `route` did for one event.
#[derive(Debug)]
pub struct RouteOutcome {
    pub exit_code: i32,
    pub trigger: Option<Trigger>,
    pub execution: Option<Execution>,
    /// Acknowledgement and status problems; execution warnings live on `execution`.
    pub diagnostics: Diagnostics,
}

impl RouteOutcome {
    fn failed(diagnostics: Diagnostics) -> Self {
        Self {
            exit_code: 1,
            trigger: None,
            execution: None,
            diagnostics,
        }
    }
}

pub struct Router<'a> {
    ctx: Context<'a>,
    table: &'a DispatchTable,
}

impl<'a> Router<'a> {
    pub fn new(ctx: Context<'a>, table: &'a DispatchTable) -> Self {
        Self { ctx, table }
    }

    /// Handle one event. Never fails: every error becomes exit code 1.
    pub async fn route(&self, event: &Event) -> RouteOutcome {
        let mut diagnostics = Diagnostics::default();

        let trigger = match self.table.resolve(event) {
            Ok(trigger) => trigger,
            Err(e) => {
                tracing::error!(error = %e, "Could not route event");
                return RouteOutcome::failed(diagnostics);
            }
        };

        if trigger.action == Action::Nothing {
            tracing::info!(kind = ?event.kind(), "Nothing to do for event");
            return RouteOutcome {
                exit_code: 0,
                trigger: Some(trigger),
                execution: None,
                diagnostics,
            };
        }

        let action = &trigger.action;
        let label = action.label();
        let source = trigger_source(event);
        tracing::info!(action = %label, trigger = %source, "Routing event");

        if let Event::Comment { comment_id, .. } = event
            && let Err(e) = self.ctx.forge.add_reaction(*comment_id, Reaction::Eyes).await
        {
            diagnostics.warn(Warning::reporting(
                WarningKind::Reaction,
                "acknowledgement reaction failed",
                &e,
            ));
        }

        if let (Some(command), Some(pr)) = (&trigger.command, action.pr())
            && action.runs_engine()
        {
            let body = running_feedback(&command.command.to_string(), &source, self.ctx.env);
            if let Err(e) = self.ctx.forge.create_comment(pr, &body).await {
                diagnostics.warn(Warning::reporting(
                    WarningKind::ResultComment,
                    "running feedback comment failed",
                    &e,
                ));
            }
        }

        let head = self.head_sha(event, action.pr(), &mut diagnostics).await;
        let pending = format!("{label} running");
        self.set_status(head.as_ref(), CommitState::Pending, &pending, &mut diagnostics)
            .await;

        let (exit_code, execution) = match self.ctx.execute(action, &source).await {
            Ok(execution) => (execution.exit_code, Some(execution)),
            Err(e) => {
                tracing::error!(action = %label, error = %e, "Command failed");
                (1, None)
            }
        };

        let (state, description) = if exit_code == 0 {
            (CommitState::Success, format!("{label} succeeded"))
        } else {
            (CommitState::Failure, format!("{label} failed"))
        };
        self.set_status(head.as_ref(), state, &description, &mut diagnostics)
            .await;

        RouteOutcome {
            exit_code,
            trigger: Some(trigger),
            execution,
            diagnostics,
        }
    }

    async fn head_sha(
        &self,
        event: &Event,
        pr: Option<PrNumber>,
        diagnostics: &mut Diagnostics,
    ) -> Option<CommitSha> {
        if let Event::PullRequest {
            head_sha: Some(sha),
            ..
        } = event
        {
            return Some(sha.clone());
        }
        let pr = pr?;
        match self.ctx.forge.get_pull_request(pr).await {
            Ok(info) => Some(info.head_sha),
            Err(e) => {
                diagnostics.warn(Warning::reporting(
                    WarningKind::CommitStatus,
                    "could not resolve head commit",
                    &e,
                ));
                None
            }
        }
    }

    async fn set_status(
        &self,
        sha: Option<&CommitSha>,
        state: CommitState,
        description: &str,
        diagnostics: &mut Diagnostics,
    ) {
        let Some(sha) = sha else {
            return;
        };
        let mut status =
            CommitStatus::new(state, &self.ctx.config.status_context).description(description);
        if let Some(url) = self.ctx.env.run_url() {
            status = status.target_url(url);
        }
        if let Err(e) = self.ctx.forge.set_commit_status(sha, &status).await {
            diagnostics.warn(Warning::reporting(
                WarningKind::CommitStatus,
                "commit status update failed",
                &e,
            ));
        }
    }
}

/// Who or what started the run, as shown in the action history.
fn trigger_source(event: &Event) -> String {
    match event {
        Event::Comment { user, .. } => format!("@{user}"),
        Event::PullRequest { .. } => "pull_request".to_string(),
        Event::Push { .. } => "push".to_string(),
        Event::Dispatch { .. } => "workflow_dispatch".to_string(),
    }
}

fn running_feedback(command: &str, source: &str, env: &GitHubEnv) -> String {
    let mut body = format!("⏳ **/{command}** running...\n\nTriggered by {source}.");
    if let Some(url) = env.run_url() {
        body.push_str(&format!(" [View Job]({url})"));
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feedback_links_the_run() {
        let env = GitHubEnv {
            repository: "acme/infra".to_string(),
            server_url: "https://github.com".to_string(),
            run_id: Some("77".to_string()),
            ..GitHubEnv::default()
        };
        assert_eq!(
            running_feedback("plan", "@octo", &env),
            "⏳ **/plan** running...\n\nTriggered by @octo. [View Job](https://github.com/acme/infra/actions/runs/77)"
        );
        assert_eq!(
            running_feedback("apply", "@octo", &GitHubEnv::default()),
            "⏳ **/apply** running...\n\nTriggered by @octo."
        );
    }
}
