// ABOUTME: Result comment bodies: the "running" placeholder and the final log comment.
// ABOUTME: Plan summaries and logs are cut so the whole body fits one comment.

use std::fmt::Write as _;

use super::outcome::{LayerOutcome, RunReport};
use crate::engine::PlanSummary;
use crate::github::MAX_COMMENT_CHARS;

/// Longest log excerpt placed in a comment.
pub const MAX_COMMENT_LOG: usize = 60_000;

/// Log space kept free when plan summaries are large.
const MIN_LOG_CHARS: usize = 8_000;

const TRUNCATION_NOTE: &str = "\n...(truncated)";

const LOGS_OPEN: &str = "\n<details open>\n<summary>Logs</summary>\n\n```text\n";

fn char_len(s: &str) -> usize {
    s.chars().count()
}

pub fn running_body(title: &str, pr_url: &str) -> String {
    format!("### ⏳ {title}\n*Work in progress...*\n\n[⬅️ Back to Dashboard]({pr_url})\n")
}

/// Cut `content` to at most `limit` characters, note included.
///
/// The cut backs up to the last line break when there is one.
pub fn truncate_log(content: &str, limit: usize) -> String {
    if char_len(content) <= limit {
        return content.to_string();
    }
    let Some(keep) = limit.checked_sub(char_len(TRUNCATION_NOTE)) else {
        return String::new();
    };
    let cut = content
        .char_indices()
        .nth(keep)
        .map_or(content.len(), |(i, _)| i);
    let cut = content[..cut].rfind('\n').filter(|&i| i > 0).unwrap_or(cut);
    format!("{}{TRUNCATION_NOTE}", &content[..cut])
}

/// Final comment for a run: outcome table, plan summaries, then logs.
pub fn result_body(title: &str, report: &RunReport, pr_url: &str) -> String {
    let icon = if report.success() { "✅" } else { "❌" };
    let mut out = format!("### {icon} {title}\n\n");

    out.push_str("| Layer | Result |\n|:---|:---|\n");
    for layer in &report.layers {
        let _ = writeln!(out, "| {} | {} {} |", layer.layer, layer.outcome.icon(), layer.outcome);
    }

    let footer = format!("\n```\n</details>\n\n[⬅️ Back to Dashboard]({pr_url})\n");
    let fixed = char_len(&out) + char_len(LOGS_OPEN) + char_len(&footer);

    let summaries: Vec<String> = report
        .layers
        .iter()
        .filter_map(|layer| match &layer.summary {
            Some(summary)
                if layer.outcome == LayerOutcome::HasChanges
                    && *summary != PlanSummary::Unparsed =>
            {
                Some(format!("\n#### {}\n{}", layer.layer, summary.to_markdown()))
            }
            _ => None,
        })
        .collect();

    let mut room = MAX_COMMENT_CHARS.saturating_sub(fixed + MIN_LOG_CHARS);
    for (i, section) in summaries.iter().enumerate() {
        let share = room / (summaries.len() - i);
        let section = truncate_log(section, share);
        room -= char_len(&section);
        out.push_str(&section);
    }

    let logs: Vec<String> = report
        .layers
        .iter()
        .map(|l| format!("--- Layer: {} ---\n{}", l.layer, l.output.trim_end()))
        .collect();
    let log_room = MAX_COMMENT_CHARS
        .saturating_sub(char_len(&out) + char_len(LOGS_OPEN) + char_len(&footer))
        .min(MAX_COMMENT_LOG);

    out.push_str(LOGS_OPEN);
    out.push_str(&truncate_log(&logs.join("\n\n"), log_room));
    out.push_str(&footer);
    out
}
