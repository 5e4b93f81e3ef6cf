// ABOUTME: Typed per-command arguments produced by routing a trigger.
// ABOUTME: Each handler reads only the fields its command defines.

use std::fmt;

use crate::command::CommandKind;
use crate::pipeline::BootstrapAction;
use crate::registry::LayerSelection;
use crate::types::PrNumber;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanArgs {
    pub layers: LayerSelection,
    pub pr: Option<PrNumber>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapArgs {
    pub action: BootstrapAction,
    pub pr: Option<PrNumber>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyArgs {
    pub pr: Option<PrNumber>,
    pub fail_on_drift: bool,
}

/// Commands that hand off to a separate workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuxKind {
    E2e,
    Health,
    Review,
}

impl AuxKind {
    pub fn command(&self) -> CommandKind {
        match self {
            AuxKind::E2e => CommandKind::E2e,
            AuxKind::Health => CommandKind::Health,
            AuxKind::Review => CommandKind::Review,
        }
    }

    /// Dashboard stage tracking this command, if it has one.
    pub fn stage_key(&self) -> Option<&'static str> {
        match self {
            AuxKind::E2e => Some("e2e"),
            AuxKind::Health => None,
            AuxKind::Review => Some("review"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowArgs {
    pub kind: AuxKind,
    pub pr: PrNumber,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HelpArgs {
    pub pr: PrNumber,
}

/// What a trigger asks the pipeline to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Plan(PlanArgs),
    Apply(PlanArgs),
    Bootstrap(BootstrapArgs),
    Verify(VerifyArgs),
    Workflow(WorkflowArgs),
    Help(HelpArgs),
    /// Recognized trigger that needs no work.
    Nothing,
}

impl Action {
    pub fn pr(&self) -> Option<PrNumber> {
        match self {
            Action::Plan(args) | Action::Apply(args) => args.pr,
            Action::Bootstrap(args) => args.pr,
            Action::Verify(args) => args.pr,
            Action::Workflow(args) => Some(args.pr),
            Action::Help(args) => Some(args.pr),
            Action::Nothing => None,
        }
    }

    /// Whether the action runs the IaC engine.
    pub fn runs_engine(&self) -> bool {
        matches!(
            self,
            Action::Plan(_) | Action::Apply(_) | Action::Bootstrap(_) | Action::Verify(_)
        )
    }

    pub fn label(&self) -> String {
        match self {
            Action::Plan(args) => format!("plan {}", args.layers),
            Action::Apply(args) => format!("apply {}", args.layers),
            Action::Bootstrap(args) => format!("bootstrap {}", args.action),
            Action::Verify(_) => "verify".to_string(),
            Action::Workflow(args) => args.kind.command().to_string(),
            Action::Help(_) => "help".to_string(),
            Action::Nothing => "nothing".to_string(),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}
