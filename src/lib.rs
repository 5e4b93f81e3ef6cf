// ABOUTME: Library root for layerci - exposes the pipeline, dashboard and router for the binary and tests.
// ABOUTME: The main binary is in main.rs.

pub mod command;
pub mod config;
pub mod dashboard;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod github;
pub mod output;
pub mod pipeline;
pub mod registry;
pub mod router;
pub mod types;
