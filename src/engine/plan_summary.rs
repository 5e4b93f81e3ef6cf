// ABOUTME: Extracts a change summary from plan output for result comments.
// ABOUTME: Recognizes the "Plan: N to add..." line and per-resource action headers.

use regex::Regex;
use std::fmt::Write as _;
use std::sync::LazyLock;

static TOTALS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Plan: (\d+) to add, (\d+) to change, (\d+) to destroy").expect("valid regex")
});
static RESOURCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"# ([\w.\-\[\]\x22]+) (will be created|will be updated in-place|must be replaced|will be destroyed)",
    )
    .expect("valid regex")
});

const NO_CHANGES_MARKER: &str = "No changes.";

/// What a plan proposes to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanSummary {
    NoChanges,
    Changes {
        add: u32,
        change: u32,
        destroy: u32,
        created: Vec<String>,
        updated: Vec<String>,
        replaced: Vec<String>,
        destroyed: Vec<String>,
    },
    Unparsed,
}

impl PlanSummary {
    pub fn parse(plan_output: &str) -> Self {
        let Some(totals) = TOTALS_RE.captures(plan_output) else {
            if plan_output.contains(NO_CHANGES_MARKER) {
                return PlanSummary::NoChanges;
            }
            return PlanSummary::Unparsed;
        };

        let count = |i: usize| totals[i].parse().unwrap_or(0);

        let mut created = Vec::new();
        let mut updated = Vec::new();
        let mut replaced = Vec::new();
        let mut destroyed = Vec::new();
        for caps in RESOURCE_RE.captures_iter(plan_output) {
            let address = caps[1].to_string();
            match &caps[2] {
                "will be created" => created.push(address),
                "will be updated in-place" => updated.push(address),
                "must be replaced" => replaced.push(address),
                _ => destroyed.push(address),
            }
        }

        PlanSummary::Changes {
            add: count(1),
            change: count(2),
            destroy: count(3),
            created,
            updated,
            replaced,
            destroyed,
        }
    }

    pub fn to_markdown(&self) -> String {
        match self {
            PlanSummary::NoChanges => "✅ **No changes.** Infrastructure is up-to-date.".to_string(),
            PlanSummary::Unparsed => {
                "⚠️ Could not parse plan summary. Check logs for details.".to_string()
            }
            PlanSummary::Changes {
                add,
                change,
                destroy,
                created,
                updated,
                replaced,
                destroyed,
            } => {
                let mut out = String::new();
                out.push_str("| Action | Count |\n| :--- | :--- |\n");
                let _ = writeln!(out, "| 🟢 **Add** | {add} |");
                let _ = writeln!(out, "| 🟡 **Change** | {change} |");
                let _ = writeln!(out, "| 🔴 **Destroy** | {destroy} |");

                let sections = [
                    ("Created", "+", created),
                    ("Updated", "~", updated),
                    ("Replaced", "+/-", replaced),
                    ("Destroyed", "-", destroyed),
                ];
                for (title, sigil, addresses) in sections {
                    if addresses.is_empty() {
                        continue;
                    }
                    let _ = writeln!(out, "\n**{title}:**");
                    for address in addresses {
                        let _ = writeln!(out, "- `{sigil}` {address}");
                    }
                }
                out
            }
        }
    }
}
