// ABOUTME: Pull request dashboard: stage statuses and action history kept in one comment.
// ABOUTME: The process holds no state between runs; everything round-trips through the comment.

mod codec;
mod history;
mod render;
mod stage;

pub use codec::{
    CodecError, JsonCodec, PersistedStage, PersistedState, STATE_VERSION, StateCodec,
    WriterInfo, extract_state_block, state_block,
};
pub use history::{ActionHistoryItem, CARRY_HISTORY_LIMIT, HISTORY_ROWS, HistoryPolicy};
pub use stage::{APPLY_STAGE, StageSet, StageStatus, Status, UnknownStatus};

use chrono::{DateTime, Utc};
use snafu::ResultExt;

use crate::config::Config;
use crate::github::{Comment, CommentOps, MAX_COMMENT_CHARS, ReportingError};
use crate::types::{CommentId, CommitSha, PrNumber};

const IDENTITY_PREFIX: &str = "<!-- infra-dashboard:";

/// Characters a rendered dashboard may use, a little under the host's comment limit.
pub const DASHBOARD_BUDGET: usize = MAX_COMMENT_CHARS - 1_024;

/// Marker identifying the dashboard comment for `sha`.
pub fn identity_marker(sha: &CommitSha) -> String {
    format!("{IDENTITY_PREFIX}{sha} -->")
}

/// A requested stage transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageUpdate {
    pub key: String,
    pub status: Status,
    pub link: Option<String>,
    pub append_history: bool,
    /// Overrides the dashboard's default trigger in the history entry.
    pub trigger: Option<String>,
}

impl StageUpdate {
    pub fn new(key: impl Into<String>, status: Status) -> Self {
        Self {
            key: key.into(),
            status,
            link: None,
            append_history: true,
            trigger: None,
        }
    }

    pub fn link(mut self, link: Option<&str>) -> Self {
        self.link = link.filter(|l| !l.is_empty()).map(str::to_string);
        self
    }

    pub fn without_history(mut self) -> Self {
        self.append_history = false;
        self
    }

    pub fn trigger(mut self, trigger: impl Into<String>) -> Self {
        self.trigger = Some(trigger.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StageError {
    #[error("unknown dashboard stage: {0}")]
    UnknownStage(String),

    #[error("stage {key} cannot move from {from} to {to}")]
    InvalidTransition {
        key: String,
        from: Status,
        to: Status,
    },
}

/// What `load` found.
#[derive(Debug)]
pub enum LoadOutcome {
    /// No dashboard for this commit yet.
    Missing,
    /// No dashboard for this commit; history carried over from an earlier commit.
    Carried { entries: usize },
    Loaded,
    /// A dashboard exists but its state could not be decoded; defaults are in effect.
    Reset(CodecError),
}

impl LoadOutcome {
    /// Whether a dashboard comment for this commit exists.
    pub fn exists(&self) -> bool {
        matches!(self, LoadOutcome::Loaded | LoadOutcome::Reset(_))
    }
}

/// What `save` had to do to fit the comment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveOutcome {
    /// Oldest history entries dropped by this save.
    pub compacted: usize,
}

#[derive(Debug, Clone)]
struct JournalEntry {
    update: StageUpdate,
    time: DateTime<Utc>,
}

/// Dashboard for one pull request head commit.
#[derive(Debug)]
pub struct Dashboard {
    pr: PrNumber,
    sha: CommitSha,
    comment_id: Option<CommentId>,
    defaults: StageSet,
    stages: StageSet,
    history: Vec<ActionHistoryItem>,
    compacted: u64,
    policy: HistoryPolicy,
    carry_history: bool,
    layers: Vec<String>,
    revision: u64,
    writer: Option<WriterInfo>,
    run_id: Option<String>,
    trigger: String,
    /// Updates applied since the last load or save, replayed on conflict.
    journal: Vec<JournalEntry>,
    codec: Box<dyn StateCodec>,
}

impl Dashboard {
    pub fn new(pr: PrNumber, sha: CommitSha, stages: StageSet, layers: Vec<String>) -> Self {
        Self {
            pr,
            sha,
            comment_id: None,
            defaults: stages.reset(),
            stages,
            history: Vec::new(),
            compacted: 0,
            policy: HistoryPolicy::default(),
            carry_history: true,
            layers,
            revision: 0,
            writer: None,
            run_id: None,
            trigger: "layerci".to_string(),
            journal: Vec::new(),
            codec: Box::new(JsonCodec),
        }
    }

    /// Dashboard with the stage set and policies from `config`.
    pub fn from_config(pr: PrNumber, sha: CommitSha, config: &Config) -> Self {
        let stages = StageSet::defaults(&config.layers, &config.dashboard);
        let layers = config.layers.names().map(|n| n.to_string()).collect();
        Self::new(pr, sha, stages, layers)
            .with_policy(config.dashboard.history_policy)
            .with_carry_history(config.dashboard.carry_history)
    }

    pub fn with_policy(mut self, policy: HistoryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_carry_history(mut self, carry: bool) -> Self {
        self.carry_history = carry;
        self
    }

    pub fn with_codec(mut self, codec: Box<dyn StateCodec>) -> Self {
        self.codec = codec;
        self
    }

    /// Default trigger recorded in history entries.
    pub fn with_trigger(mut self, trigger: impl Into<String>) -> Self {
        self.trigger = trigger.into();
        self
    }

    pub fn with_run_id(mut self, run_id: Option<String>) -> Self {
        self.run_id = run_id;
        self
    }

    pub fn pr(&self) -> PrNumber {
        self.pr
    }

    pub fn sha(&self) -> &CommitSha {
        &self.sha
    }

    pub fn comment_id(&self) -> Option<CommentId> {
        self.comment_id
    }

    pub fn marker(&self) -> String {
        identity_marker(&self.sha)
    }

    pub fn stages(&self) -> &StageSet {
        &self.stages
    }

    pub fn stage(&self, key: &str) -> Option<&StageStatus> {
        self.stages.get(key)
    }

    pub fn history(&self) -> &[ActionHistoryItem] {
        &self.history
    }

    /// History entries dropped so far to stay under the size budget.
    pub fn compacted(&self) -> u64 {
        self.compacted
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn writer(&self) -> Option<&WriterInfo> {
        self.writer.as_ref()
    }

    /// Keys of every per-layer plan stage.
    pub fn plan_stage_keys(&self) -> Vec<String> {
        self.stages
            .keys()
            .filter(|k| k.starts_with("plan-"))
            .map(str::to_string)
            .collect()
    }

    /// Move `key` to `status`. Returns whether a history entry was appended.
    pub fn update_stage(
        &mut self,
        key: &str,
        status: Status,
        link: Option<&str>,
    ) -> Result<bool, StageError> {
        self.apply(StageUpdate::new(key, status).link(link))
    }

    pub fn apply(&mut self, update: StageUpdate) -> Result<bool, StageError> {
        let time = Utc::now();
        let recorded = self.apply_at(&update, time)?;
        self.journal.push(JournalEntry { update, time });
        Ok(recorded)
    }

    fn apply_at(&mut self, update: &StageUpdate, time: DateTime<Utc>) -> Result<bool, StageError> {
        let stage = self
            .stages
            .get_mut(&update.key)
            .ok_or_else(|| StageError::UnknownStage(update.key.clone()))?;

        let previous = stage.status;
        if !previous.can_transition_to(update.status) {
            return Err(StageError::InvalidTransition {
                key: update.key.clone(),
                from: previous,
                to: update.status,
            });
        }

        stage.status = update.status;
        stage.time = Some(time);
        if let Some(link) = &update.link {
            stage.link = Some(link.clone());
        }

        let record = update.append_history && self.policy.should_record(previous, update.status);
        if record {
            self.history.push(ActionHistoryItem {
                action: stage.name.clone(),
                trigger: update
                    .trigger
                    .clone()
                    .unwrap_or_else(|| self.trigger.clone()),
                status: update.status,
                link: stage.link.clone(),
                time,
            });
        }

        tracing::debug!(
            pr = %self.pr,
            stage = %update.key,
            "Stage {} -> {}",
            previous,
            update.status
        );
        Ok(record)
    }

    /// Human guidance for the footer.
    pub fn next_step(&self) -> String {
        if let Some((_, stage)) = self
            .stages
            .iter()
            .find(|(_, s)| s.status == Status::Failure)
        {
            return format!("❌ {} failed. Check output and fix.", stage.name);
        }

        if let Some((_, stage)) = self
            .stages
            .iter()
            .find(|(_, s)| s.status == Status::Running)
        {
            return format!("🔄 {} in progress...", stage.name);
        }

        if self.is_ready() {
            return "✅ **Ready to merge!**".to_string();
        }

        if let Some((_, stage)) = self
            .stages
            .iter()
            .find(|(_, s)| s.required && s.status == Status::Pending)
        {
            return format!("⏳ Waiting for {}...", stage.name);
        }

        "⏳ Waiting...".to_string()
    }

    /// No failures, nothing running, every required stage succeeded or was skipped.
    pub fn is_ready(&self) -> bool {
        self.stages.iter().all(|(_, s)| {
            !matches!(s.status, Status::Failure | Status::Running)
                && (!s.required || s.status.is_done())
        })
    }

    /// Snapshot of what gets persisted.
    pub fn persisted(&self) -> PersistedState {
        PersistedState {
            version: STATE_VERSION,
            revision: self.revision,
            writer: self.writer.clone(),
            stages: self
                .stages
                .iter()
                .map(|(key, s)| {
                    (
                        key.to_string(),
                        PersistedStage {
                            status: s.status,
                            link: s.link.clone(),
                            time: s.time,
                        },
                    )
                })
                .collect(),
            history: self.history.clone(),
            compacted: self.compacted,
        }
    }

    /// Replace in-memory state with `state`. Unknown stage keys are ignored.
    pub fn restore(&mut self, state: PersistedState) {
        self.stages = self.defaults.clone();
        for (key, persisted) in state.stages {
            match self.stages.get_mut(&key) {
                Some(stage) => {
                    stage.status = persisted.status;
                    stage.link = persisted.link;
                    stage.time = persisted.time;
                }
                None => tracing::debug!(stage = %key, "Ignoring unknown persisted stage"),
            }
        }
        self.history = state.history;
        self.compacted = state.compacted;
        self.revision = state.revision;
        self.writer = state.writer;
    }

    fn reset(&mut self) {
        self.stages = self.defaults.clone();
        self.history.clear();
        self.compacted = 0;
        self.revision = 0;
        self.writer = None;
    }

    fn decode_body(&self, body: &str) -> Result<PersistedState, CodecError> {
        let (sha, blob) = extract_state_block(body).ok_or(CodecError::MissingBlock)?;
        if sha != self.sha.as_str() {
            return Err(CodecError::MissingBlock);
        }
        self.codec.decode(blob)
    }

    fn find_own<'c>(&self, comments: &'c [Comment]) -> Option<&'c Comment> {
        let marker = self.marker();
        comments.iter().find(|c| c.body.contains(&marker))
    }

    /// Newest history of the most recent dashboard for another commit of this PR.
    fn previous_history(&self, comments: &[Comment]) -> Option<Vec<ActionHistoryItem>> {
        comments.iter().rev().find_map(|c| {
            let (sha, blob) = extract_state_block(&c.body)?;
            if sha == self.sha.as_str() {
                return None;
            }
            match self.codec.decode(blob) {
                Ok(mut state) => {
                    let excess = state.history.len().saturating_sub(CARRY_HISTORY_LIMIT);
                    state.history.drain(..excess);
                    Some(state.history)
                }
                Err(e) => {
                    tracing::debug!(comment = %c.id, "Skipping undecodable dashboard: {}", e);
                    None
                }
            }
        })
    }

    /// Load the dashboard for this commit, falling back to fresh defaults.
    pub async fn load<F>(&mut self, forge: &F) -> Result<LoadOutcome, ReportingError>
    where
        F: CommentOps + ?Sized,
    {
        let comments = forge.list_comments(self.pr).await?;
        self.journal.clear();

        if let Some(comment) = self.find_own(&comments) {
            self.comment_id = Some(comment.id);
            return match self.decode_body(&comment.body) {
                Ok(state) => {
                    self.restore(state);
                    tracing::debug!(pr = %self.pr, revision = self.revision, "Loaded dashboard");
                    Ok(LoadOutcome::Loaded)
                }
                Err(e) => {
                    tracing::warn!(pr = %self.pr, "Dashboard state unreadable, starting fresh: {}", e);
                    self.reset();
                    Ok(LoadOutcome::Reset(e))
                }
            };
        }

        self.comment_id = None;
        self.reset();

        if self.carry_history
            && let Some(history) = self.previous_history(&comments)
        {
            let entries = history.len();
            self.history = history;
            tracing::debug!(pr = %self.pr, entries, "Carried history from previous commit");
            return Ok(LoadOutcome::Carried { entries });
        }

        Ok(LoadOutcome::Missing)
    }

    /// Load, creating the comment when none exists for this commit.
    pub async fn ensure<F>(&mut self, forge: &F) -> Result<LoadOutcome, ReportingError>
    where
        F: CommentOps + ?Sized,
    {
        let outcome = self.load(forge).await?;
        if !outcome.exists() {
            self.save(forge).await?;
        }
        Ok(outcome)
    }

    /// Render the body, dropping the oldest history until it fits `DASHBOARD_BUDGET`.
    fn render_within_budget(&mut self) -> Result<(String, usize), CodecError> {
        let mut dropped = 0;
        loop {
            let body = self.render()?;
            let chars = body.chars().count();
            if chars <= DASHBOARD_BUDGET {
                return Ok((body, dropped));
            }
            if self.history.is_empty() {
                return Err(CodecError::TooLarge {
                    chars,
                    limit: DASHBOARD_BUDGET,
                });
            }
            let batch = self.history.len().div_ceil(4);
            self.history.drain(..batch);
            self.compacted += batch as u64;
            dropped += batch;
        }
    }

    /// Write the dashboard, merging with any revision written since we loaded.
    pub async fn save<F>(&mut self, forge: &F) -> Result<SaveOutcome, ReportingError>
    where
        F: CommentOps + ?Sized,
    {
        let comments = forge.list_comments(self.pr).await?;
        let remote = self.find_own(&comments).cloned();

        if let Some(remote) = &remote
            && let Ok(state) = self.decode_body(&remote.body)
            && state.revision != self.revision
        {
            tracing::warn!(
                pr = %self.pr,
                "Dashboard changed remotely (revision {} vs {}), replaying {} update(s)",
                state.revision,
                self.revision,
                self.journal.len()
            );
            self.restore(state);
            self.replay();
        }
        self.comment_id = remote.map(|c| c.id);

        self.revision += 1;
        self.writer = Some(WriterInfo::current(self.run_id.clone()));
        let (body, compacted) = self
            .render_within_budget()
            .context(crate::github::EncodeSnafu)?;
        if compacted > 0 {
            tracing::warn!(
                pr = %self.pr,
                compacted,
                "Dashboard over {} characters, dropped oldest history",
                DASHBOARD_BUDGET
            );
        }

        let comment = match self.comment_id {
            Some(id) => forge.update_comment(id, &body).await?,
            None => forge.create_comment(self.pr, &body).await?,
        };

        tracing::debug!(pr = %self.pr, revision = self.revision, comment = %comment.id, "Saved dashboard");
        self.comment_id = Some(comment.id);
        self.journal.clear();
        Ok(SaveOutcome { compacted })
    }

    fn replay(&mut self) {
        let journal = std::mem::take(&mut self.journal);
        for entry in &journal {
            if let Err(e) = self.apply_at(&entry.update, entry.time) {
                tracing::warn!(pr = %self.pr, "Dropping update during replay: {}", e);
            }
        }
        self.journal = journal;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DashboardConfig;
    use crate::github::{ForgeOp, MemoryForge};

    fn sha(s: &str) -> CommitSha {
        CommitSha::new(s).unwrap()
    }

    fn dashboard() -> Dashboard {
        Dashboard::from_config(PrNumber::new(1), sha("aaaaaaa"), &Config::default())
    }

    fn finish_required(dash: &mut Dashboard) {
        for key in dash.plan_stage_keys() {
            dash.update_stage(&key, Status::Success, None).unwrap();
        }
        dash.update_stage(APPLY_STAGE, Status::Success, None).unwrap();
    }

    #[test]
    fn terminal_repeat_appends_one_entry() {
        let mut dash = dashboard();
        dash.update_stage("apply", Status::Success, Some("l")).unwrap();
        let before = dash.history().len();
        assert!(dash.update_stage("apply", Status::Success, Some("l")).unwrap());
        assert_eq!(dash.history().len(), before + 1);
    }

    #[test]
    fn repeated_running_is_not_recorded() {
        let mut dash = dashboard();
        assert!(dash.update_stage("apply", Status::Running, None).unwrap());
        assert!(!dash.update_stage("apply", Status::Running, None).unwrap());
        assert_eq!(dash.history().len(), 1);
    }

    #[test]
    fn empty_link_keeps_previous() {
        let mut dash = dashboard();
        dash.update_stage("apply", Status::Running, Some("https://run/1"))
            .unwrap();
        dash.update_stage("apply", Status::Success, Some("")).unwrap();
        assert_eq!(
            dash.stage("apply").unwrap().link.as_deref(),
            Some("https://run/1")
        );
    }

    #[test]
    fn rejects_unknown_stage_and_bad_transitions() {
        let mut dash = dashboard();
        assert_eq!(
            dash.update_stage("nope", Status::Running, None),
            Err(StageError::UnknownStage("nope".to_string()))
        );
        dash.update_stage("apply", Status::Success, None).unwrap();
        assert!(matches!(
            dash.update_stage("apply", Status::Pending, None),
            Err(StageError::InvalidTransition { .. })
        ));
        assert!(dash.update_stage("e2e", Status::Skipped, None).is_ok());
    }

    #[test]
    fn without_history_skips_entry() {
        let mut dash = dashboard();
        let recorded = dash
            .apply(StageUpdate::new("apply", Status::Running).without_history())
            .unwrap();
        assert!(!recorded);
        assert!(dash.history().is_empty());
    }

    #[test]
    fn next_step_priorities() {
        let mut dash = dashboard();
        assert_eq!(dash.next_step(), "⏳ Waiting for Plan: bootstrap...");

        dash.update_stage("plan-platform", Status::Running, None).unwrap();
        assert_eq!(dash.next_step(), "🔄 Plan: platform in progress...");

        dash.update_stage("e2e", Status::Failure, None).unwrap();
        assert_eq!(dash.next_step(), "❌ E2E Tests failed. Check output and fix.");
    }

    #[test]
    fn ready_ignores_optional_pending_stages() {
        let mut dash = dashboard();
        finish_required(&mut dash);
        assert_eq!(dash.next_step(), "✅ **Ready to merge!**");
        assert!(dash.is_ready());
    }

    #[test]
    fn waiting_when_only_required_apply_left() {
        let mut dash = dashboard();
        for key in dash.plan_stage_keys() {
            dash.update_stage(&key, Status::Success, None).unwrap();
        }
        assert_eq!(dash.next_step(), "⏳ Waiting for Apply...");
    }

    #[test]
    fn restore_ignores_unknown_keys() {
        let mut state = dashboard().persisted();
        state.stages.insert(
            "legacy".to_string(),
            PersistedStage {
                status: Status::Failure,
                link: None,
                time: None,
            },
        );
        state.stages.remove("apply");
        state
            .stages
            .get_mut("plan-bootstrap")
            .unwrap()
            .status = Status::Success;

        let mut dash = dashboard();
        dash.restore(state);
        assert!(dash.stage("legacy").is_none());
        assert_eq!(dash.stage("apply").unwrap().status, Status::Pending);
        assert_eq!(dash.stage("plan-bootstrap").unwrap().status, Status::Success);
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let forge = MemoryForge::default();
        let mut dash = dashboard();
        dash.update_stage("plan-bootstrap", Status::Success, Some("https://x"))
            .unwrap();
        dash.save(&forge).await.unwrap();
        assert_eq!(dash.revision(), 1);

        let mut fresh = dashboard();
        let outcome = fresh.load(&forge).await.unwrap();
        assert!(matches!(outcome, LoadOutcome::Loaded));
        assert_eq!(fresh.stages(), dash.stages());
        assert_eq!(fresh.history(), dash.history());
        assert_eq!(fresh.comment_id(), dash.comment_id());
        assert_eq!(forge.comments(PrNumber::new(1)).len(), 1);
    }

    #[tokio::test]
    async fn second_save_updates_same_comment() {
        let forge = MemoryForge::default();
        let mut dash = dashboard();
        dash.save(&forge).await.unwrap();
        dash.update_stage("apply", Status::Running, None).unwrap();
        dash.save(&forge).await.unwrap();
        assert_eq!(forge.comments(PrNumber::new(1)).len(), 1);
        assert_eq!(dash.revision(), 2);
    }

    #[tokio::test]
    async fn corrupt_state_resets_to_defaults() {
        let forge = MemoryForge::default();
        let body = format!(
            "{}\n<!-- infra-dashboard-state:aaaaaaa {{not json /infra-dashboard-state -->",
            identity_marker(&sha("aaaaaaa"))
        );
        let existing = forge.create_comment(PrNumber::new(1), &body).await.unwrap();

        let mut dash = dashboard();
        let outcome = dash.load(&forge).await.unwrap();
        assert!(matches!(outcome, LoadOutcome::Reset(CodecError::Decode(_))));
        assert_eq!(dash.comment_id(), Some(existing.id));
        assert!(dash.stages().iter().all(|(_, s)| s.status == Status::Pending));
    }

    #[tokio::test]
    async fn concurrent_writer_updates_are_merged() {
        let forge = MemoryForge::default();
        let mut first = dashboard();
        first.save(&forge).await.unwrap();

        let mut second = dashboard();
        second.load(&forge).await.unwrap();
        first.load(&forge).await.unwrap();

        second.update_stage("e2e", Status::Running, None).unwrap();
        second.save(&forge).await.unwrap();

        first.update_stage("plan-platform", Status::Success, None).unwrap();
        first.save(&forge).await.unwrap();
        assert_eq!(first.revision(), 3);

        let mut check = dashboard();
        check.load(&forge).await.unwrap();
        assert_eq!(check.stage("e2e").unwrap().status, Status::Running);
        assert_eq!(check.stage("plan-platform").unwrap().status, Status::Success);
    }

    #[tokio::test]
    async fn new_commit_carries_history() {
        let forge = MemoryForge::default();
        let mut old = dashboard();
        old.update_stage("apply", Status::Failure, None).unwrap();
        old.save(&forge).await.unwrap();

        let mut new =
            Dashboard::from_config(PrNumber::new(1), sha("bbbbbbb"), &Config::default());
        let outcome = new.load(&forge).await.unwrap();
        assert!(matches!(outcome, LoadOutcome::Carried { entries: 1 }));
        assert_eq!(new.stage("apply").unwrap().status, Status::Pending);

        let mut no_carry = Dashboard::from_config(PrNumber::new(1), sha("bbbbbbb"), &Config::default())
            .with_carry_history(false);
        assert!(matches!(
            no_carry.load(&forge).await.unwrap(),
            LoadOutcome::Missing
        ));
    }

    #[tokio::test]
    async fn save_failure_is_reported() {
        let forge = MemoryForge::default();
        forge.fail(ForgeOp::CreateComment);
        let mut dash = dashboard();
        assert!(dash.save(&forge).await.is_err());
        assert!(dash.comment_id().is_none());
    }

    fn plan_run(dash: &mut Dashboard, link: &str) {
        for key in dash.plan_stage_keys() {
            dash.update_stage(&key, Status::Running, Some(link)).unwrap();
            dash.update_stage(&key, Status::Success, Some(link)).unwrap();
        }
    }

    #[tokio::test]
    async fn repeated_runs_stay_under_comment_limit() {
        let forge = MemoryForge::default();
        let mut dash = dashboard();
        let link = "https://github.com/acme/infra/actions/runs/12345678901";

        let mut compacted = 0;
        for _ in 0..120 {
            plan_run(&mut dash, link);
            compacted += dash.save(&forge).await.unwrap().compacted;
        }

        let body = &forge.comments(PrNumber::new(1))[0].body;
        assert!(body.chars().count() <= DASHBOARD_BUDGET);
        assert!(compacted > 0);
        assert_eq!(dash.compacted(), compacted as u64);
        assert_eq!(dash.history().len() + compacted, 120 * 8);
        assert!(body.contains(&format!("_{compacted} older entries were dropped")));

        let mut fresh = dashboard();
        assert!(matches!(fresh.load(&forge).await.unwrap(), LoadOutcome::Loaded));
        assert_eq!(fresh.history(), dash.history());
        assert_eq!(fresh.compacted(), dash.compacted());
    }

    #[tokio::test]
    async fn oversized_stage_link_cannot_be_saved() {
        let forge = MemoryForge::default();
        let mut dash = dashboard();
        let link = format!("https://ci/{}", "x".repeat(MAX_COMMENT_CHARS));
        dash.apply(StageUpdate::new("apply", Status::Running).link(Some(link.as_str())).without_history())
            .unwrap();

        let err = dash.save(&forge).await.unwrap_err();
        assert!(matches!(
            err,
            ReportingError::Encode {
                source: CodecError::TooLarge { .. }
            }
        ));
        assert!(forge.comments(PrNumber::new(1)).is_empty());
    }

    #[tokio::test]
    async fn carried_history_keeps_newest_entries() {
        let forge = MemoryForge::default();
        let mut old = dashboard();
        for run in 0..20 {
            plan_run(&mut old, &format!("https://ci/{run}"));
        }
        old.save(&forge).await.unwrap();
        assert_eq!(old.history().len(), 160);

        let mut new =
            Dashboard::from_config(PrNumber::new(1), sha("bbbbbbb"), &Config::default());
        let outcome = new.load(&forge).await.unwrap();
        assert!(matches!(
            outcome,
            LoadOutcome::Carried {
                entries: CARRY_HISTORY_LIMIT
            }
        ));
        assert_eq!(new.history(), &old.history()[160 - CARRY_HISTORY_LIMIT..]);
    }

    /// Stores the JSON blob reversed.
    #[derive(Debug)]
    struct ReversedCodec;

    impl StateCodec for ReversedCodec {
        fn encode(&self, state: &PersistedState) -> Result<String, CodecError> {
            Ok(JsonCodec.encode(state)?.chars().rev().collect())
        }

        fn decode(&self, blob: &str) -> Result<PersistedState, CodecError> {
            JsonCodec.decode(&blob.chars().rev().collect::<String>())
        }
    }

    #[tokio::test]
    async fn custom_codec_round_trips_through_comment() {
        let forge = MemoryForge::default();
        let mut dash = dashboard().with_codec(Box::new(ReversedCodec));
        dash.update_stage("e2e", Status::Failure, None).unwrap();
        dash.save(&forge).await.unwrap();

        let mut same = dashboard().with_codec(Box::new(ReversedCodec));
        assert!(matches!(same.load(&forge).await.unwrap(), LoadOutcome::Loaded));
        assert_eq!(same.stage("e2e").unwrap().status, Status::Failure);

        let mut json = dashboard();
        assert!(matches!(
            json.load(&forge).await.unwrap(),
            LoadOutcome::Reset(CodecError::Decode(_))
        ));
    }

    #[test]
    fn custom_stage_set() {
        let config = DashboardConfig {
            stages: vec![],
            ..DashboardConfig::default()
        };
        let stages = StageSet::defaults(&crate::registry::LayerRegistry::builtin(), &config);
        assert_eq!(stages.len(), 5);
    }
}
