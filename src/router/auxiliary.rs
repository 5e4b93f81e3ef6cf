// ABOUTME: Commands that hand work to other workflows: /e2e, /health, /review, plus /help.
// ABOUTME: The matching dashboard stage follows the dispatch outcome.

use std::collections::BTreeMap;

use super::Context;
use super::action::{AuxKind, HelpArgs, WorkflowArgs};
use crate::command::help_table;
use crate::dashboard::{StageUpdate, Status};
use crate::diagnostics::{Diagnostics, Warning, WarningKind};
use crate::error::{Error, Result};
use crate::pipeline::PrReporter;

const REVIEW_PLACEHOLDER: &str = "🔍 AI Review triggered (Placeholder).";

fn configured_workflow<'c>(ctx: &'c Context<'_>, kind: AuxKind) -> Option<&'c str> {
    let workflows = &ctx.config.workflows;
    match kind {
        AuxKind::E2e => workflows.e2e.as_deref(),
        AuxKind::Health => workflows.health.as_deref(),
        AuxKind::Review => workflows.review.as_deref(),
    }
}

/// Dispatch the workflow behind an auxiliary command. Returns the exit code.
pub(super) async fn run_workflow<'a>(
    ctx: &Context<'a>,
    args: WorkflowArgs,
    trigger: &str,
    diagnostics: &mut Diagnostics,
) -> Result<(i32, Option<PrReporter<'a>>)> {
    let Some(workflow) = configured_workflow(ctx, args.kind) else {
        if args.kind == AuxKind::Review {
            if let Err(e) = ctx.forge.create_comment(args.pr, REVIEW_PLACEHOLDER).await {
                diagnostics.warn(Warning::reporting(
                    WarningKind::ResultComment,
                    "review placeholder comment failed",
                    &e,
                ));
            }
            return Ok((0, None));
        }
        return Err(Error::InvalidConfig(format!(
            "no workflow configured for /{}",
            args.kind.command()
        )));
    };

    let info = ctx.forge.get_pull_request(args.pr).await?;
    let opened =
        PrReporter::open(ctx.forge, ctx.config, ctx.env, args.pr, trigger, diagnostics).await;
    let mut reporter = match opened {
        Ok(reporter) => Some(reporter),
        Err(e) => {
            diagnostics.warn(Warning::reporting(
                WarningKind::DashboardLoad,
                "dashboard unavailable",
                &e,
            ));
            None
        }
    };

    let stage_key = args
        .kind
        .stage_key()
        .filter(|key| reporter.as_ref().is_some_and(|r| r.dashboard().stage(key).is_some()));
    let workflow_url = ctx.forge.workflow_url(workflow);

    if let (Some(key), Some(reporter)) = (stage_key, reporter.as_mut()) {
        let update = StageUpdate::new(key, Status::Running).link(Some(&workflow_url));
        diagnostics.dashboard_saved(reporter.update_stage(update).await);
    }

    let inputs = BTreeMap::from([("pr_number".to_string(), args.pr.to_string())]);
    tracing::info!(workflow, git_ref = %info.head_ref, "Dispatching workflow");
    let dispatched = ctx
        .forge
        .dispatch_workflow(workflow, &info.head_ref, &inputs)
        .await;

    let (status, exit_code) = match &dispatched {
        Ok(()) => (Status::Success, 0),
        Err(e) => {
            tracing::error!(workflow, error = %e, "Workflow dispatch failed");
            (Status::Failure, 1)
        }
    };

    if let (Some(key), Some(reporter)) = (stage_key, reporter.as_mut()) {
        let update = StageUpdate::new(key, status).link(Some(&workflow_url));
        diagnostics.dashboard_saved(reporter.update_stage(update).await);
    }

    Ok((exit_code, reporter))
}

/// Post the command table on the pull request.
pub(super) async fn post_help(
    ctx: &Context<'_>,
    args: HelpArgs,
    diagnostics: &mut Diagnostics,
) -> i32 {
    let layers: Vec<String> = ctx.config.layers.names().map(|n| n.to_string()).collect();
    let body = format!("### 💬 Commands\n\n{}", help_table(&layers));
    if let Err(e) = ctx.forge.create_comment(args.pr, &body).await {
        diagnostics.warn(Warning::reporting(
            WarningKind::ResultComment,
            "help comment failed",
            &e,
        ));
    }
    0
}
