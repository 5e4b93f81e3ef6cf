// ABOUTME: Markdown rendering of the dashboard comment.
// ABOUTME: Identity marker, stage table, history, help block, next-step footer and state block.

use chrono::{DateTime, Utc};
use std::fmt::Write as _;

use super::codec::{CodecError, state_block};
use super::history::HISTORY_ROWS;
use super::Dashboard;

fn short_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.format("%H:%M UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn link_cell(link: Option<&str>) -> String {
    link.map(|l| format!("[View]({l})"))
        .unwrap_or_else(|| "-".to_string())
}

impl Dashboard {
    /// Full comment body, including the embedded state.
    pub fn render(&self) -> Result<String, CodecError> {
        let blob = self.codec.encode(&self.persisted())?;
        let mut out = String::new();

        let _ = writeln!(out, "{}", self.marker());
        let _ = writeln!(out, "## ⚙️ Commit `{}` Pipeline\n", self.sha.short());
        out.push_str("| Stage | Status | Output | Time |\n");
        out.push_str("|:---|:---:|:---|:---|\n");
        for (_, stage) in self.stages.iter() {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} |",
                stage.name,
                stage.status.icon(),
                link_cell(stage.link.as_deref()),
                short_time(stage.time)
            );
        }

        if !self.history.is_empty() {
            let _ = writeln!(
                out,
                "\n<details>\n<summary>📜 Action history ({})</summary>\n",
                self.history.len()
            );
            if self.history.len() > HISTORY_ROWS {
                let _ = writeln!(
                    out,
                    "_Showing newest {HISTORY_ROWS} of {} entries._\n",
                    self.history.len()
                );
            }
            out.push_str("| Time | Action | Trigger | Output |\n");
            out.push_str("|:---|:---|:---|:---|\n");
            for item in self.history.iter().rev().take(HISTORY_ROWS) {
                let output = match &item.link {
                    Some(link) => format!("{} [{}]({link})", item.status.icon(), item.status),
                    None => format!("{} {}", item.status.icon(), item.status),
                };
                let _ = writeln!(
                    out,
                    "| {} | {} | {} | {} |",
                    item.time.format("%Y-%m-%d %H:%M UTC"),
                    item.action,
                    item.trigger,
                    output
                );
            }
            if self.compacted > 0 {
                let _ = writeln!(
                    out,
                    "\n_{} older entries were dropped to fit the comment._",
                    self.compacted
                );
            }
            out.push_str("\n</details>\n");
        }

        out.push_str("\n<details>\n<summary>💬 Commands</summary>\n\n");
        out.push_str(&crate::command::help_table(&self.layers));
        out.push_str("\n</details>\n");

        let _ = writeln!(out, "\n<!-- next-step -->\n{}\n<!-- /next-step -->", self.next_step());
        let _ = write!(out, "\n{}", state_block(&self.sha, &blob));

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use crate::dashboard::{Dashboard, Status};
    use crate::config::Config;
    use crate::types::{CommitSha, PrNumber};

    fn dashboard() -> Dashboard {
        Dashboard::from_config(
            PrNumber::new(5),
            CommitSha::new("0123456789abcdef").unwrap(),
            &Config::default(),
        )
    }

    #[test]
    fn renders_marker_table_and_footer() {
        let body = dashboard().render().unwrap();
        assert!(body.starts_with("<!-- infra-dashboard:0123456789abcdef -->\n"));
        assert!(body.contains("## ⚙️ Commit `0123456` Pipeline"));
        assert!(body.contains("| Plan: bootstrap | ⏳ | - | - |"));
        assert!(body.contains("<!-- next-step -->\n⏳ Waiting for Plan: bootstrap...\n<!-- /next-step -->"));
        assert!(body.contains("`/plan [layer...]`"));
        assert!(!body.contains("Action history"));
    }

    #[test]
    fn history_is_newest_first() {
        let mut dash = dashboard();
        dash.update_stage("plan-bootstrap", Status::Running, None).unwrap();
        dash.update_stage("plan-bootstrap", Status::Success, Some("https://ci/1"))
            .unwrap();

        let body = dash.render().unwrap();
        let success = body.find("✅ [success](https://ci/1)").unwrap();
        let running = body.find("🔄 running").unwrap();
        assert!(success < running);
        assert!(body.contains("Action history (2)"));
        assert!(body.contains("| Plan: bootstrap | ✅ | [View](https://ci/1) |"));
        assert!(!body.contains("Showing newest"));
    }

    #[test]
    fn history_table_shows_newest_rows_only() {
        let mut dash = dashboard();
        for run in 0..20 {
            let link = format!("https://ci/{run}");
            dash.update_stage("plan-bootstrap", Status::Running, Some(link.as_str())).unwrap();
            dash.update_stage("plan-bootstrap", Status::Success, Some(link.as_str())).unwrap();
        }

        let body = dash.render().unwrap();
        assert!(body.contains("Action history (40)"));
        assert!(body.contains("_Showing newest 25 of 40 entries._"));
        assert!(body.contains("✅ [success](https://ci/19)"));
        assert!(!body.contains("🔄 [running](https://ci/7)"));
        assert_eq!(body.matches("✅ [success](https://ci/").count(), 13);
    }
}
