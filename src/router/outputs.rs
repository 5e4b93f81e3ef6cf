// ABOUTME: Step outputs describing a routed event, for downstream workflow steps.
// ABOUTME: Written as key=value lines to GITHUB_OUTPUT, or printed when unset.

use serde::Serialize;
use std::fmt;
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::Path;

use super::action::Action;
use super::dispatch::Trigger;
use crate::error::Result;
use crate::types::PrNumber;

/// Which downstream job handles the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// Layer plan or apply.
    Pipeline,
    /// Trunk push: post-merge verification.
    PostMerge,
    /// Bootstrap, verify, workflow hand-off or help.
    Handler,
    Skip,
}

impl RunMode {
    pub fn from_trigger(trigger: &Trigger) -> Self {
        match &trigger.action {
            Action::Nothing => RunMode::Skip,
            Action::Plan(_) | Action::Apply(_) => RunMode::Pipeline,
            Action::Verify(_) if trigger.command.is_none() => RunMode::PostMerge,
            _ => RunMode::Handler,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Pipeline => "pipeline",
            RunMode::PostMerge => "post-merge",
            RunMode::Handler => "handler",
            RunMode::Skip => "skip",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventOutputs {
    pub mode: RunMode,
    pub command: String,
    pub layers: String,
    pub pr_number: String,
    pub should_run: bool,
}

impl EventOutputs {
    pub fn from_trigger(trigger: &Trigger, pr: Option<PrNumber>) -> Self {
        let command = match (&trigger.command, &trigger.action) {
            (Some(parsed), _) => parsed.command.to_string(),
            (None, Action::Plan(_)) => "plan".to_string(),
            (None, Action::Verify(_)) => "verify".to_string(),
            (None, _) => String::new(),
        };
        let layers = match &trigger.action {
            Action::Plan(args) | Action::Apply(args) => args.layers.to_string(),
            _ => String::new(),
        };
        Self {
            mode: RunMode::from_trigger(trigger),
            command,
            layers,
            pr_number: pr.map(|p| p.to_string()).unwrap_or_default(),
            should_run: trigger.action != Action::Nothing,
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "mode={}", self.mode);
        let _ = writeln!(out, "command={}", self.command);
        let _ = writeln!(out, "layers={}", self.layers);
        let _ = writeln!(out, "pr_number={}", self.pr_number);
        let _ = writeln!(out, "should_run={}", self.should_run);
        out
    }

    /// Append to the step output file.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        file.write_all(self.render().as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{AliasTable, CommandParser};
    use crate::registry::{LayerRegistry, LayerSelection};
    use crate::router::action::{HelpArgs, PlanArgs, VerifyArgs};

    #[test]
    fn renders_key_value_lines() {
        let trigger = Trigger {
            action: Action::Plan(PlanArgs {
                layers: LayerSelection::All,
                pr: Some(PrNumber::new(8)),
            }),
            command: None,
        };
        let outputs = EventOutputs::from_trigger(&trigger, Some(PrNumber::new(8)));
        assert_eq!(
            outputs.render(),
            "mode=pipeline\ncommand=plan\nlayers=all\npr_number=8\nshould_run=true\n"
        );
    }

    #[test]
    fn mode_follows_action() {
        let trunk_verify = Trigger {
            action: Action::Verify(VerifyArgs {
                pr: None,
                fail_on_drift: false,
            }),
            command: None,
        };
        assert_eq!(RunMode::from_trigger(&trunk_verify), RunMode::PostMerge);

        let help = Trigger {
            action: Action::Help(HelpArgs {
                pr: PrNumber::new(4),
            }),
            command: CommandParser::new(&LayerRegistry::builtin(), AliasTable::default())
                .parse("/help"),
        };
        assert_eq!(RunMode::from_trigger(&help), RunMode::Handler);
    }

    #[test]
    fn nothing_to_do() {
        let trigger = Trigger {
            action: Action::Nothing,
            command: None,
        };
        let outputs = EventOutputs::from_trigger(&trigger, None);
        assert!(!outputs.should_run);
        assert_eq!(outputs.mode, RunMode::Skip);
        assert_eq!(outputs.command, "");
    }

    #[test]
    fn appends_to_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output");
        std::fs::write(&path, "existing=1\n").unwrap();

        let outputs = EventOutputs {
            mode: RunMode::Pipeline,
            command: "apply".to_string(),
            layers: "platform".to_string(),
            pr_number: "3".to_string(),
            should_run: true,
        };
        outputs.write_to(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("existing=1\nmode=pipeline\ncommand=apply\n"));
    }
}
