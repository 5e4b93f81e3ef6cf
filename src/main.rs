// ABOUTME: Entry point for the layerci CLI application.
// ABOUTME: Parses arguments, sets up logging and dispatches to command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands, DashboardCommands, LayerArgs};
use commands::Session;
use layerci::config::{self, Config};
use layerci::error::Result;
use layerci::output::{Output, OutputMode};
use layerci::registry::LayerSelection;
use layerci::router::{Action, BootstrapArgs, PlanArgs, VerifyArgs};
use layerci::types::PrNumber;
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };

    match run(cli, mode).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            Output::new(mode).error(&e.to_string());
            std::process::exit(1);
        }
    }
}

fn plan_args(args: LayerArgs) -> PlanArgs {
    PlanArgs {
        layers: LayerSelection::from_tokens(&args.layers),
        pr: args.pr.map(PrNumber::new),
    }
}

async fn run(cli: Cli, mode: OutputMode) -> Result<i32> {
    let output = Output::new(mode);

    match cli.command {
        Commands::Init { force } => {
            let cwd = env::current_dir()?;
            config::init_config(&cwd, force)?;
            output.success(&format!("Created {}", config::CONFIG_FILENAME));
            Ok(0)
        }
        Commands::Parse { comment } => {
            let config = match &cli.config {
                Some(path) => Config::load(path)?,
                None => Config::discover(&env::current_dir()?)?,
            };
            commands::parse(&config, comment.as_deref(), output)
        }
        Commands::Run => {
            let session = Session::open(cli.config.as_deref(), cli.offline).await?;
            commands::run_event(&session, output).await
        }
        Commands::Plan(args) => {
            let session = Session::open(cli.config.as_deref(), cli.offline).await?;
            commands::execute(&session, Action::Plan(plan_args(args)), output).await
        }
        Commands::Apply(args) => {
            let session = Session::open(cli.config.as_deref(), cli.offline).await?;
            commands::execute(&session, Action::Apply(plan_args(args)), output).await
        }
        Commands::Bootstrap { action, pr } => {
            let session = Session::open(cli.config.as_deref(), cli.offline).await?;
            let action = Action::Bootstrap(BootstrapArgs {
                action,
                pr: pr.map(PrNumber::new),
            });
            commands::execute(&session, action, output).await
        }
        Commands::Verify { pr, fail_on_drift } => {
            let session = Session::open(cli.config.as_deref(), cli.offline).await?;
            let action = Action::Verify(VerifyArgs {
                pr: pr.map(PrNumber::new),
                fail_on_drift,
            });
            commands::execute(&session, action, output).await
        }
        Commands::Dashboard { command } => {
            let session = Session::open(cli.config.as_deref(), cli.offline).await?;
            match command {
                DashboardCommands::Init { pr } => {
                    commands::dashboard_init(&session, pr, output).await
                }
                DashboardCommands::Update {
                    pr,
                    stage,
                    status,
                    link,
                } => {
                    commands::dashboard_update(
                        &session,
                        pr,
                        &stage,
                        &status,
                        link.as_deref(),
                        output,
                    )
                    .await
                }
            }
        }
    }
}
