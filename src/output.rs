// ABOUTME: Terminal output for layerci commands.
// ABOUTME: Supports normal, quiet (CI), and JSON-lines output modes.

use serde::Serialize;
use std::time::Instant;

use crate::diagnostics::Diagnostics;
use crate::pipeline::RunReport;

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Progress messages and per-layer summaries
    Normal,
    /// Only final results
    Quiet,
    /// JSON lines for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn duration(&self) -> Option<f64> {
        self.start_time.map(|_| self.elapsed_secs())
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Print a success message with optional timing.
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => match self.duration() {
                Some(elapsed) => println!("{message} ({elapsed:.1}s)"),
                None => println!("{message}"),
            },
            OutputMode::Quiet => println!("{message}"),
            OutputMode::Json => self.event("success", message),
        }
    }

    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => eprintln!("Error: {message}"),
            OutputMode::Json => self.event_to_stderr("error", message),
        }
    }

    /// Non-fatal problem; shown in every mode.
    pub fn warning(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => eprintln!("Warning: {message}"),
            OutputMode::Json => self.event_to_stderr("warning", message),
        }
    }

    pub fn warnings(&self, diagnostics: &Diagnostics) {
        for warning in diagnostics.warnings() {
            self.warning(&warning.message);
        }
        if diagnostics.dashboard_stale() {
            self.warning("the pull request dashboard may not reflect this run");
        }
    }

    /// Per-layer summary of a run.
    pub fn report(&self, report: &RunReport) {
        match self.mode {
            OutputMode::Normal => {
                println!("{}", report.kind.title());
                for line in report.summary_lines() {
                    println!("  {line}");
                }
            }
            OutputMode::Quiet => {
                for line in report.summary_lines() {
                    println!("{line}");
                }
            }
            OutputMode::Json => self.value(report),
        }
    }

    /// Machine-readable value: JSON in json mode, pretty JSON otherwise.
    pub fn value<T: Serialize>(&self, value: &T) {
        let rendered = match self.mode {
            OutputMode::Json => serde_json::to_string(value),
            _ => serde_json::to_string_pretty(value),
        };
        match rendered {
            Ok(json) => println!("{json}"),
            Err(e) => self.error(&format!("could not serialize output: {e}")),
        }
    }

    /// A document printed verbatim, such as a rendered dashboard.
    pub fn document(&self, body: &str) {
        match self.mode {
            OutputMode::Json => self.value(&serde_json::json!({ "document": body })),
            _ => println!("{body}"),
        }
    }

    fn event(&self, event: &str, message: &str) {
        if let Ok(json) = serde_json::to_string(&self.json_event(event, message)) {
            println!("{json}");
        }
    }

    fn event_to_stderr(&self, event: &str, message: &str) {
        if let Ok(json) = serde_json::to_string(&self.json_event(event, message)) {
            eprintln!("{json}");
        }
    }

    fn json_event<'a>(&self, event: &'a str, message: &'a str) -> JsonEvent<'a> {
        JsonEvent {
            event,
            message,
            duration_secs: self.duration(),
        }
    }
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_event_omits_duration_without_timer() {
        let output = Output::new(OutputMode::Json);
        let json = serde_json::to_string(&output.json_event("warning", "stale")).unwrap();
        assert_eq!(json, r#"{"event":"warning","message":"stale"}"#);
    }

    #[test]
    fn timer_reports_duration() {
        let mut output = Output::new(OutputMode::Quiet);
        assert_eq!(output.duration(), None);
        output.start_timer();
        assert!(output.duration().is_some());
    }
}
