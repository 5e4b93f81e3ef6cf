// ABOUTME: Parse handler: turns a comment or the current event into a command.
// ABOUTME: Event mode writes step outputs for the workflow to branch on.

use layerci::command::CommandParser;
use layerci::config::Config;
use layerci::error::{Error, Result};
use layerci::github::GitHubEnv;
use layerci::output::Output;
use layerci::router::{Action, DispatchTable, Event, EventOutputs, Trigger};

pub fn parse(config: &Config, comment: Option<&str>, output: Output) -> Result<i32> {
    match comment {
        Some(text) => {
            match CommandParser::from_config(config).parse(text) {
                Some(command) => output.value(&command),
                None => output.success("Not a command"),
            }
            Ok(0)
        }
        None => parse_event(config, &GitHubEnv::from_env(), output),
    }
}

fn parse_event(config: &Config, env: &GitHubEnv, output: Output) -> Result<i32> {
    let event_name = env
        .event_name
        .as_deref()
        .ok_or_else(|| Error::MissingEnvVar("GITHUB_EVENT_NAME".to_string()))?;
    let event_path = env
        .event_path
        .as_deref()
        .ok_or_else(|| Error::MissingEnvVar("GITHUB_EVENT_PATH".to_string()))?;

    let event = Event::load(event_name, event_path)?;
    let table = DispatchTable::from_config(config);
    let (trigger, pr) = match &event {
        Some(event) => (table.resolve(event)?, event.pr()),
        None => (
            Trigger {
                action: Action::Nothing,
                command: None,
            },
            None,
        ),
    };

    let outputs = EventOutputs::from_trigger(&trigger, pr);
    match &env.output_path {
        Some(path) => {
            outputs.write_to(path)?;
            output.success(&format!(
                "command={} should_run={}",
                outputs.command, outputs.should_run
            ));
        }
        None => output.document(outputs.render().trim_end()),
    }
    Ok(0)
}
