// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Args, Parser, Subcommand};
use layerci::pipeline::BootstrapAction;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "layerci")]
#[command(about = "Pull-request driven plan/apply pipeline for layered Terraform stacks")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print only final results
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Print JSON lines
    #[arg(long, global = true)]
    pub json: bool,

    /// Config file (default: discovered in the working directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Use an in-memory forge instead of the GitHub API and print the dashboard
    #[arg(long, global = true)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone)]
pub struct LayerArgs {
    /// Layers to target (default: all)
    pub layers: Vec<String>,

    /// Pull request whose dashboard tracks the run
    #[arg(long)]
    pub pr: Option<u64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Route the current GitHub Actions event
    Run,

    /// Plan layers
    Plan(LayerArgs),

    /// Apply layers in order, stopping at the first failure
    Apply(LayerArgs),

    /// Plan or apply the bootstrap layer with terraform
    Bootstrap {
        #[arg(value_enum)]
        action: BootstrapAction,

        #[arg(long)]
        pr: Option<u64>,
    },

    /// Plan every layer and report drift
    Verify {
        #[arg(long)]
        pr: Option<u64>,

        /// Exit non-zero when any layer has drifted
        #[arg(long)]
        fail_on_drift: bool,
    },

    /// Parse a comment, or the current event, into a command
    Parse {
        /// Comment text (default: read the Actions event)
        comment: Option<String>,
    },

    /// Manage the pull request dashboard
    Dashboard {
        #[command(subcommand)]
        command: DashboardCommands,
    },

    /// Initialize a new layerci.yml configuration file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
pub enum DashboardCommands {
    /// Create the dashboard for the pull request head if missing
    Init {
        #[arg(long)]
        pr: u64,
    },

    /// Set one stage; the key `plan` updates every plan stage
    Update {
        #[arg(long)]
        pr: u64,

        #[arg(long)]
        stage: String,

        #[arg(long)]
        status: String,

        #[arg(long)]
        link: Option<String>,
    },
}
