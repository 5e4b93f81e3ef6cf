// ABOUTME: Command handlers for the layerci CLI.
// ABOUTME: Each handler returns the process exit code; errors are printed by main.

mod dashboard;
mod parse;
mod pipeline;
mod session;

pub use dashboard::{dashboard_init, dashboard_update};
pub use parse::parse;
pub use pipeline::{execute, run_event};
pub use session::Session;
