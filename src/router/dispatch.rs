// ABOUTME: Immutable dispatch table from events and commands to actions.
// ABOUTME: Built once from configuration and handed to the router.

use std::collections::{BTreeMap, HashMap};

use super::action::{
    Action, AuxKind, BootstrapArgs, HelpArgs, PlanArgs, VerifyArgs, WorkflowArgs,
};
use super::event::{Event, EventKind};
use crate::command::{CommandKind, CommandParser, ParsedCommand};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::pipeline::BootstrapAction;
use crate::registry::LayerSelection;
use crate::types::{ALL_LAYERS, PrNumber};

/// Pull request actions that trigger an automatic plan.
const PLAN_ON: &[&str] = &["opened", "synchronize", "reopened"];

type EventHandler = fn(&DispatchTable, &Event) -> Result<Trigger>;
type CommandHandler = fn(&ParsedCommand, Option<PrNumber>) -> Result<Action>;

/// A routed event: the action plus the command it came from, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub action: Action,
    pub command: Option<ParsedCommand>,
}

impl Trigger {
    fn implicit(action: Action) -> Self {
        Self {
            action,
            command: None,
        }
    }
}

pub struct DispatchTable {
    parser: CommandParser,
    trunk_ref: String,
    events: HashMap<EventKind, EventHandler>,
    commands: HashMap<CommandKind, CommandHandler>,
}

impl DispatchTable {
    pub fn new(parser: CommandParser, trunk_branch: &str) -> Self {
        let events: HashMap<EventKind, EventHandler> = HashMap::from([
            (EventKind::PullRequest, on_pull_request as EventHandler),
            (EventKind::Push, on_push),
            (EventKind::Comment, on_comment),
            (EventKind::Dispatch, on_dispatch),
        ]);

        let commands: HashMap<CommandKind, CommandHandler> = HashMap::from([
            (CommandKind::Plan, plan as CommandHandler),
            (CommandKind::Apply, apply),
            (CommandKind::BootstrapPlan, bootstrap_plan),
            (CommandKind::BootstrapApply, bootstrap_apply),
            (CommandKind::E2e, e2e),
            (CommandKind::Health, health),
            (CommandKind::Review, review),
            (CommandKind::Help, help),
        ]);

        Self {
            parser,
            trunk_ref: format!("refs/heads/{trunk_branch}"),
            events,
            commands,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(CommandParser::from_config(config), &config.trunk_branch)
    }

    pub fn parser(&self) -> &CommandParser {
        &self.parser
    }

    /// Map an event to the action it asks for.
    pub fn resolve(&self, event: &Event) -> Result<Trigger> {
        match self.events.get(&event.kind()) {
            Some(handler) => handler(self, event),
            None => Ok(Trigger::implicit(Action::Nothing)),
        }
    }

    /// Map a parsed command to its action. Unknown commands do nothing.
    pub fn command(&self, command: &ParsedCommand, pr: Option<PrNumber>) -> Result<Action> {
        match self.commands.get(&command.command) {
            Some(handler) => handler(command, pr),
            None => Ok(Action::Nothing),
        }
    }

    fn routed(&self, command: Option<ParsedCommand>, pr: Option<PrNumber>) -> Result<Trigger> {
        let Some(command) = command else {
            return Ok(Trigger::implicit(Action::Nothing));
        };
        let action = self.command(&command, pr)?;
        Ok(Trigger {
            action,
            command: Some(command),
        })
    }
}

fn on_pull_request(_: &DispatchTable, event: &Event) -> Result<Trigger> {
    let Event::PullRequest { number, action, .. } = event else {
        return Ok(Trigger::implicit(Action::Nothing));
    };
    if !PLAN_ON.contains(&action.as_str()) {
        tracing::debug!(action, "Pull request action does not trigger a plan");
        return Ok(Trigger::implicit(Action::Nothing));
    }
    Ok(Trigger::implicit(Action::Plan(PlanArgs {
        layers: LayerSelection::All,
        pr: Some(*number),
    })))
}

fn on_push(table: &DispatchTable, event: &Event) -> Result<Trigger> {
    let Event::Push { git_ref } = event else {
        return Ok(Trigger::implicit(Action::Nothing));
    };
    if *git_ref != table.trunk_ref {
        tracing::debug!(git_ref, "Push is not to the trunk branch");
        return Ok(Trigger::implicit(Action::Nothing));
    }
    Ok(Trigger::implicit(Action::Verify(VerifyArgs {
        pr: None,
        fail_on_drift: false,
    })))
}

fn on_comment(table: &DispatchTable, event: &Event) -> Result<Trigger> {
    let Event::Comment { pr, body, .. } = event else {
        return Ok(Trigger::implicit(Action::Nothing));
    };
    if pr.is_none() {
        tracing::debug!("Comment is not on a pull request");
        return Ok(Trigger::implicit(Action::Nothing));
    }
    table.routed(table.parser.parse(body), *pr)
}

fn on_dispatch(table: &DispatchTable, event: &Event) -> Result<Trigger> {
    let Event::Dispatch { inputs } = event else {
        return Ok(Trigger::implicit(Action::Nothing));
    };
    table.routed(command_from_inputs(inputs), event.pr())
}

/// Build a command from structured workflow inputs: `command`, `layers` and `action`.
pub fn command_from_inputs(inputs: &BTreeMap<String, String>) -> Option<ParsedCommand> {
    let name = inputs.get("command").map(|c| c.trim().to_lowercase())?;
    if name.is_empty() {
        return None;
    }
    let layer_list = inputs.get("layers").map(String::as_str).unwrap_or("");
    let bootstrap_action = inputs.get("action").map(|a| a.trim().to_lowercase());

    let command = match (name.as_str(), bootstrap_action.as_deref()) {
        ("bootstrap", Some("apply")) => CommandKind::BootstrapApply,
        ("bootstrap", _) => CommandKind::BootstrapPlan,
        (other, _) => other.parse::<CommandKind>().unwrap_or(CommandKind::Unknown),
    };

    let mut layers = if command.takes_layers() {
        LayerSelection::from_list(layer_list).tokens()
    } else {
        Vec::new()
    };
    if command.takes_layers() && layers.is_empty() {
        layers.push(ALL_LAYERS.to_string());
    }

    Some(ParsedCommand {
        command,
        layers,
        args: bootstrap_action.into_iter().collect(),
        raw: format!("workflow_dispatch: {name} {layer_list}").trim_end().to_string(),
    })
}

fn selection(command: &ParsedCommand) -> LayerSelection {
    LayerSelection::from_tokens(&command.layers)
}

fn require_pr(pr: Option<PrNumber>, command: &'static str) -> Result<PrNumber> {
    pr.ok_or(Error::PullRequestRequired(command))
}

fn plan(command: &ParsedCommand, pr: Option<PrNumber>) -> Result<Action> {
    Ok(Action::Plan(PlanArgs {
        layers: selection(command),
        pr,
    }))
}

fn apply(command: &ParsedCommand, pr: Option<PrNumber>) -> Result<Action> {
    Ok(Action::Apply(PlanArgs {
        layers: selection(command),
        pr,
    }))
}

fn bootstrap_plan(_: &ParsedCommand, pr: Option<PrNumber>) -> Result<Action> {
    Ok(Action::Bootstrap(BootstrapArgs {
        action: BootstrapAction::Plan,
        pr,
    }))
}

fn bootstrap_apply(_: &ParsedCommand, pr: Option<PrNumber>) -> Result<Action> {
    Ok(Action::Bootstrap(BootstrapArgs {
        action: BootstrapAction::Apply,
        pr,
    }))
}

fn workflow(kind: AuxKind, pr: Option<PrNumber>, command: &'static str) -> Result<Action> {
    Ok(Action::Workflow(WorkflowArgs {
        kind,
        pr: require_pr(pr, command)?,
    }))
}

fn e2e(_: &ParsedCommand, pr: Option<PrNumber>) -> Result<Action> {
    workflow(AuxKind::E2e, pr, "/e2e")
}

fn health(_: &ParsedCommand, pr: Option<PrNumber>) -> Result<Action> {
    workflow(AuxKind::Health, pr, "/health")
}

fn review(_: &ParsedCommand, pr: Option<PrNumber>) -> Result<Action> {
    workflow(AuxKind::Review, pr, "/review")
}

fn help(_: &ParsedCommand, pr: Option<PrNumber>) -> Result<Action> {
    Ok(Action::Help(HelpArgs {
        pr: require_pr(pr, "/help")?,
    }))
}
