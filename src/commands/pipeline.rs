// ABOUTME: Handlers that run the pipeline: routing the Actions event, or one explicit action.
// ABOUTME: Terminal output mirrors what the dashboard shows on the pull request.

use layerci::error::{Error, Result};
use layerci::output::Output;
use layerci::router::{Action, DispatchTable, Event, Router};

use super::Session;

/// Trigger label recorded in the action history for CLI runs.
const CLI_TRIGGER: &str = "cli";

/// Route the event described by the Actions environment.
pub async fn run_event(session: &Session, mut output: Output) -> Result<i32> {
    let event_name = session
        .env
        .event_name
        .as_deref()
        .ok_or_else(|| Error::MissingEnvVar("GITHUB_EVENT_NAME".to_string()))?;
    let event_path = session
        .env
        .event_path
        .as_deref()
        .ok_or_else(|| Error::MissingEnvVar("GITHUB_EVENT_PATH".to_string()))?;

    let Some(event) = Event::load(event_name, event_path)? else {
        output.success(&format!("Nothing to do for {event_name} events"));
        return Ok(0);
    };

    if session.offline()
        && let Some(pr) = event.pr()
    {
        session.pull_request(pr.get()).await?;
    }

    output.start_timer();
    let table = DispatchTable::from_config(&session.config);
    let outcome = Router::new(session.context(), &table).route(&event).await;

    output.warnings(&outcome.diagnostics);
    if let Some(execution) = &outcome.execution {
        session.finish(execution, &output);
    }
    let exit_code = outcome.exit_code;

    match (&outcome.trigger, exit_code) {
        (Some(trigger), 0) if trigger.action == Action::Nothing => {
            output.success("Nothing to do");
        }
        (Some(trigger), 0) => output.success(&format!("{} succeeded", trigger.action)),
        (Some(trigger), _) => output.error(&format!("{} failed", trigger.action)),
        (None, _) => output.error("event could not be routed"),
    }
    Ok(exit_code)
}

/// Run one action from the command line.
pub async fn execute(session: &Session, action: Action, mut output: Output) -> Result<i32> {
    if session.offline()
        && let Some(pr) = action.pr()
    {
        session.pull_request(pr.get()).await?;
    }

    output.start_timer();
    output.progress(&format!("Running {action}"));
    let execution = session.context().execute(&action, CLI_TRIGGER).await?;
    let exit_code = session.finish(&execution, &output);

    if exit_code == 0 {
        output.success(&format!("{action} succeeded"));
    } else {
        output.error(&format!("{action} failed"));
    }
    Ok(exit_code)
}
