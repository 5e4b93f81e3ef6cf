// ABOUTME: Dashboard maintenance handlers: create the PR dashboard, or set stages by hand.
// ABOUTME: Used by workflow steps that run outside the plan/apply pipeline.

use layerci::dashboard::{Dashboard, LoadOutcome, StageUpdate, Status};
use layerci::error::{Error, Result};
use layerci::output::Output;
use layerci::types::PrNumber;

use super::Session;

/// Pseudo stage key selecting every plan stage.
const ALL_PLAN_STAGES: &str = "plan";

async fn open(session: &Session, number: u64) -> Result<Dashboard> {
    let pr: PrNumber = session.pull_request(number).await?;
    let info = session.forge().get_pull_request(pr).await?;
    Ok(Dashboard::from_config(pr, info.head_sha, &session.config)
        .with_trigger("cli")
        .with_run_id(session.env.run_id.clone()))
}

fn print_offline(session: &Session, dashboard: &Dashboard, output: &Output) {
    if !session.offline() {
        return;
    }
    match dashboard.render() {
        Ok(body) => output.document(&body),
        Err(e) => output.warning(&format!("could not render dashboard: {e}")),
    }
}

pub async fn dashboard_init(session: &Session, pr: u64, output: Output) -> Result<i32> {
    let mut dashboard = open(session, pr).await?;
    let outcome = dashboard.ensure(session.forge()).await?;

    match outcome {
        LoadOutcome::Loaded => output.success(&format!(
            "Dashboard for PR #{pr} at {} already exists",
            dashboard.sha().short()
        )),
        LoadOutcome::Reset(e) => output.warning(&format!(
            "Dashboard for PR #{pr} exists but its state is unreadable ({e}); defaults are in effect"
        )),
        LoadOutcome::Missing | LoadOutcome::Carried { .. } => output.success(&format!(
            "Created dashboard for PR #{pr} at {}",
            dashboard.sha().short()
        )),
    }
    print_offline(session, &dashboard, &output);
    Ok(0)
}

pub async fn dashboard_update(
    session: &Session,
    pr: u64,
    stage: &str,
    status: &str,
    link: Option<&str>,
    output: Output,
) -> Result<i32> {
    let status: Status = status
        .parse()
        .map_err(|e: layerci::dashboard::UnknownStatus| Error::InvalidArgument(e.to_string()))?;

    let mut dashboard = open(session, pr).await?;
    let outcome = dashboard.load(session.forge()).await?;
    if !outcome.exists() {
        output.warning(&format!(
            "No dashboard for PR #{pr} at {}; nothing updated",
            dashboard.sha().short()
        ));
        return Ok(0);
    }

    let keys = if stage == ALL_PLAN_STAGES {
        dashboard.plan_stage_keys()
    } else {
        vec![stage.to_string()]
    };

    for key in &keys {
        let update = StageUpdate::new(key.as_str(), status)
            .link(link)
            .trigger("cli");
        dashboard
            .apply(update)
            .map_err(|e| Error::InvalidArgument(e.to_string()))?;
    }
    let saved = dashboard.save(session.forge()).await?;
    if saved.compacted > 0 {
        output.warning(&format!(
            "Dashboard history too long, dropped the {} oldest entries",
            saved.compacted
        ));
    }

    output.success(&format!("Set {} to {status}", keys.join(", ")));
    print_offline(session, &dashboard, &output);
    Ok(0)
}
