// ABOUTME: Diagnostics accumulator for non-fatal reporting problems.
// ABOUTME: Dashboard, comment and status failures never fail a run but are shown to operators.

use crate::dashboard::SaveOutcome;
use crate::github::{ReportingError, ReportingErrorKind};

/// Collects non-fatal warnings during a pipeline run.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    /// Get all collected warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Check if any warnings were collected.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Whether the dashboard may not reflect this run.
    pub fn dashboard_stale(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w.kind, WarningKind::DashboardLoad | WarningKind::DashboardSave))
    }

    /// Record the outcome of a dashboard write: failures and compaction both warn.
    pub fn dashboard_saved(&mut self, result: Result<SaveOutcome, ReportingError>) {
        match result {
            Ok(SaveOutcome { compacted: 0 }) => {}
            Ok(SaveOutcome { compacted }) => self.warn(Warning::history_compacted(compacted)),
            Err(e) => self.warn(Warning::reporting(
                WarningKind::DashboardSave,
                "dashboard update failed",
                &e,
            )),
        }
    }

    /// Move warnings collected elsewhere into this accumulator.
    pub fn extend(&mut self, other: Diagnostics) {
        self.warnings.extend(other.warnings);
    }
}

/// A non-fatal warning collected during a run.
#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
    /// Kind of the underlying API failure, when there was one.
    pub cause: Option<ReportingErrorKind>,
}

impl Warning {
    fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    /// Build a warning from a failed reporting call.
    pub fn reporting(kind: WarningKind, context: &str, error: &ReportingError) -> Self {
        Self {
            kind,
            message: format!("{context}: {error}"),
            cause: Some(error.kind()),
        }
    }

    /// Persisted state was unreadable and was replaced with defaults.
    pub fn state_reset(message: impl Into<String>) -> Self {
        Self::new(WarningKind::StateReset, message)
    }

    /// The oldest history entries were dropped to fit the comment size limit.
    pub fn history_compacted(entries: usize) -> Self {
        Self::new(
            WarningKind::HistoryCompacted,
            format!("dashboard history too long, dropped the {entries} oldest entries"),
        )
    }
}

/// Categories of warnings that can occur during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// Failed to read the dashboard comment.
    DashboardLoad,
    /// Failed to write the dashboard comment.
    DashboardSave,
    /// Dashboard state blob was corrupt or foreign.
    StateReset,
    /// Failed to create or update a result comment.
    ResultComment,
    /// Failed to acknowledge the triggering comment.
    Reaction,
    /// Failed to set the commit status.
    CommitStatus,
    /// Dashboard history was trimmed to fit the comment.
    HistoryCompacted,
}
