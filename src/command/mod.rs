// ABOUTME: Parses pull request comments into structured commands.
// ABOUTME: Applies alias rewriting, recognizes command names and partitions layers from arguments.

mod aliases;

pub use aliases::AliasTable;

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::fmt::Write as _;
use std::str::FromStr;

use crate::config::Config;
use crate::registry::LayerRegistry;
use crate::types::ALL_LAYERS;

pub const COMMAND_PREFIX: char = '/';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandKind {
    Plan,
    Apply,
    Health,
    E2e,
    Review,
    Help,
    BootstrapPlan,
    BootstrapApply,
    Unknown,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::Plan => "plan",
            CommandKind::Apply => "apply",
            CommandKind::Health => "health",
            CommandKind::E2e => "e2e",
            CommandKind::Review => "review",
            CommandKind::Help => "help",
            CommandKind::BootstrapPlan => "bootstrap-plan",
            CommandKind::BootstrapApply => "bootstrap-apply",
            CommandKind::Unknown => "unknown",
        }
    }

    /// Whether the command targets layers.
    pub fn takes_layers(&self) -> bool {
        matches!(self, CommandKind::Plan | CommandKind::Apply)
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandKind {
    type Err = std::convert::Infallible;

    /// Unrecognized names become `Unknown`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "plan" => CommandKind::Plan,
            "apply" => CommandKind::Apply,
            "health" => CommandKind::Health,
            "e2e" => CommandKind::E2e,
            "review" => CommandKind::Review,
            "help" => CommandKind::Help,
            "bootstrap-plan" => CommandKind::BootstrapPlan,
            "bootstrap-apply" => CommandKind::BootstrapApply,
            _ => CommandKind::Unknown,
        })
    }
}

/// A normalized trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedCommand {
    pub command: CommandKind,
    /// Layer names in the order written, or `["all"]`.
    pub layers: Vec<String>,
    pub args: Vec<String>,
    pub raw: String,
}

/// Comment parser bound to one registry and alias table.
#[derive(Debug, Clone)]
pub struct CommandParser {
    known_layers: HashSet<String>,
    aliases: AliasTable,
}

impl CommandParser {
    pub fn new(registry: &LayerRegistry, aliases: AliasTable) -> Self {
        Self {
            known_layers: registry.names().map(|n| n.to_string()).collect(),
            aliases,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.layers, AliasTable::new(&config.aliases))
    }

    /// `None` when the text is not a command at all.
    pub fn parse(&self, raw: &str) -> Option<ParsedCommand> {
        let normalized = self.aliases.apply(&raw.trim().to_lowercase());
        let body = normalized.strip_prefix(COMMAND_PREFIX)?;

        let mut tokens = body.split_whitespace();
        let name = if body.starts_with(char::is_whitespace) {
            ""
        } else {
            tokens.next().unwrap_or("")
        };

        let mut layers = Vec::new();
        let mut args = Vec::new();
        for token in tokens {
            if token == ALL_LAYERS || self.known_layers.contains(token) {
                layers.push(token.to_string());
            } else {
                args.push(token.to_string());
            }
        }

        let command = match name {
            "bootstrap" => {
                if args.iter().any(|a| a == "apply") {
                    CommandKind::BootstrapApply
                } else {
                    CommandKind::BootstrapPlan
                }
            }
            "bootstrap-plan" | "bootstrap-apply" => CommandKind::Unknown,
            other => other.parse::<CommandKind>().unwrap_or(CommandKind::Unknown),
        };

        if command.takes_layers() && layers.is_empty() {
            layers.push(ALL_LAYERS.to_string());
        }

        Some(ParsedCommand {
            command,
            layers,
            args,
            raw: raw.to_string(),
        })
    }
}

/// Markdown table of the comment commands.
pub fn help_table(layers: &[String]) -> String {
    let mut out = String::from("| Command | Description |\n|:---|:---|\n");
    let rows = [
        ("/plan [layer...]", "Plan all layers, or only the named ones"),
        ("/apply [layer...]", "Apply layers in order, stopping at the first failure"),
        ("/bootstrap plan\\|apply", "Plan or apply the bootstrap layer with terraform"),
        ("/health", "Run health checks"),
        ("/e2e", "Run end-to-end tests"),
        ("/review", "Request a review"),
        ("/help", "Show this table"),
    ];
    for (command, description) in rows {
        let _ = writeln!(out, "| `{command}` | {description} |");
    }
    if !layers.is_empty() {
        let names: Vec<String> = layers.iter().map(|l| format!("`{l}`")).collect();
        let _ = writeln!(out, "\nLayers: {}", names.join(", "));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> CommandParser {
        CommandParser::new(&LayerRegistry::builtin(), AliasTable::default())
    }

    #[test]
    fn plan_defaults_to_all() {
        let cmd = parser().parse("/plan").unwrap();
        assert_eq!(cmd.command, CommandKind::Plan);
        assert_eq!(cmd.layers, vec!["all"]);
        assert!(cmd.args.is_empty());
    }

    #[test]
    fn apply_keeps_layer_order() {
        let cmd = parser().parse("/apply bootstrap platform").unwrap();
        assert_eq!(cmd.command, CommandKind::Apply);
        assert_eq!(cmd.layers, vec!["bootstrap", "platform"]);
    }

    #[test]
    fn not_a_command() {
        assert!(parser().parse("not a command").is_none());
        assert!(parser().parse("LGTM, /plan later").is_none());
    }

    #[test]
    fn unknown_command_is_populated() {
        let cmd = parser().parse("/unknown-thing").unwrap();
        assert_eq!(cmd.command, CommandKind::Unknown);
        assert_eq!(cmd.raw, "/unknown-thing");
        assert!(cmd.layers.is_empty());
        assert_eq!(parser().parse("/").unwrap().command, CommandKind::Unknown);
        assert_eq!(parser().parse("/ plan").unwrap().command, CommandKind::Unknown);
    }

    #[test]
    fn normalizes_case_and_whitespace() {
        let cmd = parser().parse("  /PLAN   Data-Prod  ").unwrap();
        assert_eq!(cmd.layers, vec!["data-prod"]);
        assert_eq!(cmd.raw, "  /PLAN   Data-Prod  ");
    }

    #[test]
    fn unrecognized_tokens_become_args() {
        let cmd = parser().parse("/plan nope platform -lock=false").unwrap();
        assert_eq!(cmd.layers, vec!["platform"]);
        assert_eq!(cmd.args, vec!["nope", "-lock=false"]);
    }

    #[test]
    fn unknown_layer_names_fall_back_to_all() {
        let cmd = parser().parse("/apply typo").unwrap();
        assert_eq!(cmd.layers, vec!["all"]);
        assert_eq!(cmd.args, vec!["typo"]);
    }

    #[test]
    fn duplicates_are_preserved() {
        let cmd = parser().parse("/plan platform platform").unwrap();
        assert_eq!(cmd.layers, vec!["platform", "platform"]);
    }

    #[test]
    fn bootstrap_subcommands() {
        assert_eq!(
            parser().parse("/bootstrap apply").unwrap().command,
            CommandKind::BootstrapApply
        );
        assert_eq!(
            parser().parse("/bootstrap plan").unwrap().command,
            CommandKind::BootstrapPlan
        );
        assert_eq!(
            parser().parse("/bootstrap").unwrap().command,
            CommandKind::BootstrapPlan
        );
    }

    #[test]
    fn auxiliary_commands_take_no_default_layers() {
        for (text, kind) in [
            ("/e2e", CommandKind::E2e),
            ("/health", CommandKind::Health),
            ("/review", CommandKind::Review),
            ("/help", CommandKind::Help),
        ] {
            let cmd = parser().parse(text).unwrap();
            assert_eq!(cmd.command, kind);
            assert!(cmd.layers.is_empty());
        }
    }

    #[test]
    fn legacy_alias() {
        let cmd = parser().parse("Digger apply platform").unwrap();
        assert_eq!(cmd.command, CommandKind::Apply);
        assert_eq!(cmd.layers, vec!["platform"]);
    }

    #[test]
    fn serializes_kind_kebab_case() {
        let cmd = parser().parse("/bootstrap apply").unwrap();
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["command"], "bootstrap-apply");
    }

    #[test]
    fn help_lists_layers() {
        let table = help_table(&["bootstrap".to_string(), "platform".to_string()]);
        assert!(table.contains("| `/plan [layer...]` |"));
        assert!(table.contains("Layers: `bootstrap`, `platform`"));
    }
}
