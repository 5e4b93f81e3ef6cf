// ABOUTME: Pull request side of a pipeline run: dashboard stages and the result comment.
// ABOUTME: Every call is best-effort; failures come back as ReportingError for the caller to record.

use snafu::ResultExt;

use super::outcome::RunReport;
use super::report;
use crate::config::Config;
use crate::dashboard::{Dashboard, LoadOutcome, SaveOutcome, StageUpdate};
use crate::diagnostics::{Diagnostics, Warning, WarningKind};
use crate::github::{Comment, Forge, GitHubEnv, ReportingError, StageSnafu};
use crate::types::PrNumber;

/// Dashboard and result comment for one pull request.
pub struct PrReporter<'a> {
    forge: &'a dyn Forge,
    dashboard: Dashboard,
    pr_url: String,
    /// Default stage link: the result comment once created, else the workflow run.
    link: Option<String>,
    result_comment: Option<Comment>,
}

impl<'a> PrReporter<'a> {
    pub fn new(forge: &'a dyn Forge, dashboard: Dashboard, pr_url: String) -> Self {
        Self {
            forge,
            dashboard,
            pr_url,
            link: None,
            result_comment: None,
        }
    }

    /// Fetch the PR head and load its dashboard. Load problems become warnings.
    pub async fn open(
        forge: &'a dyn Forge,
        config: &Config,
        env: &GitHubEnv,
        pr: PrNumber,
        trigger: &str,
        diagnostics: &mut Diagnostics,
    ) -> Result<Self, ReportingError> {
        let info = forge.get_pull_request(pr).await?;
        let dashboard = Dashboard::from_config(pr, info.head_sha, config)
            .with_trigger(trigger)
            .with_run_id(env.run_id.clone());

        let pr_url = if info.html_url.is_empty() {
            env.pull_request_url(pr)
        } else {
            info.html_url
        };

        let mut reporter = Self::new(forge, dashboard, pr_url).with_link(env.run_url());
        reporter.load(diagnostics).await;
        Ok(reporter)
    }

    pub fn with_link(mut self, link: Option<String>) -> Self {
        self.link = link;
        self
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    pub fn into_dashboard(self) -> Dashboard {
        self.dashboard
    }

    pub fn pr(&self) -> PrNumber {
        self.dashboard.pr()
    }

    pub fn link(&self) -> Option<&str> {
        self.link.as_deref()
    }

    async fn load(&mut self, diagnostics: &mut Diagnostics) {
        match self.dashboard.load(self.forge).await {
            Ok(LoadOutcome::Reset(e)) => diagnostics.warn(Warning::state_reset(format!(
                "dashboard state for PR #{} was unreadable and has been reset: {e}",
                self.pr()
            ))),
            Ok(_) => {}
            Err(e) => diagnostics.warn(Warning::reporting(
                WarningKind::DashboardLoad,
                "dashboard load failed",
                &e,
            )),
        }
    }

    /// Apply one stage transition and persist it immediately.
    pub async fn update_stage(
        &mut self,
        update: StageUpdate,
    ) -> Result<SaveOutcome, ReportingError> {
        let update = match (&update.link, &self.link) {
            (None, Some(link)) => StageUpdate {
                link: Some(link.clone()),
                ..update
            },
            _ => update,
        };
        self.dashboard.apply(update).context(StageSnafu)?;
        self.dashboard.save(self.forge).await
    }

    /// Post the "running" comment; its URL becomes the default stage link.
    pub async fn start_result(&mut self, title: &str) -> Result<(), ReportingError> {
        let body = report::running_body(title, &self.pr_url);
        let comment = self.forge.create_comment(self.pr(), &body).await?;
        if !comment.html_url.is_empty() {
            self.link = Some(comment.html_url.clone());
        }
        self.result_comment = Some(comment);
        Ok(())
    }

    /// Replace the running comment with the final results, or post them fresh.
    pub async fn finish_result(
        &mut self,
        title: &str,
        run: &RunReport,
    ) -> Result<(), ReportingError> {
        let body = report::result_body(title, run, &self.pr_url);
        match &self.result_comment {
            Some(comment) => self.forge.update_comment(comment.id, &body).await?,
            None => self.forge.create_comment(self.pr(), &body).await?,
        };
        Ok(())
    }

    pub async fn post(&self, body: &str) -> Result<Comment, ReportingError> {
        self.forge.create_comment(self.pr(), body).await
    }
}
