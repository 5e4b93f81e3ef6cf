// ABOUTME: GitHub REST implementation of the forge traits.
// ABOUTME: Thin reqwest wrapper with bearer auth, pagination and typed errors.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use snafu::ResultExt;
use std::collections::BTreeMap;
use std::time::Duration;

use super::env::GitHubEnv;
use super::error::{ApiSnafu, DecodeSnafu, ReportingError, TransportSnafu};
use super::traits::{CommentOps, PullRequestOps, ReactionOps, StatusOps, WorkflowOps};
use super::types::{Comment, CommitStatus, PullRequestInfo, Reaction};
use crate::error::{Error, Result};
use crate::types::{CommentId, CommitSha, PrNumber};

const PAGE_SIZE: usize = 100;
const API_VERSION: &str = "2022-11-28";
const MAX_ERROR_BODY: usize = 200;

/// REST client scoped to one repository.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: Client,
    api_url: String,
    server_url: String,
    repository: String,
}

#[derive(Deserialize)]
struct RawPullRequest {
    number: PrNumber,
    #[serde(default)]
    title: String,
    #[serde(default)]
    html_url: String,
    head: RawRef,
    base: RawRef,
}

#[derive(Deserialize)]
struct RawRef {
    sha: CommitSha,
    #[serde(rename = "ref")]
    git_ref: String,
}

impl GitHubClient {
    pub fn new(env: &GitHubEnv, timeout: Duration) -> Result<Self> {
        let token = env.require_token()?;
        let repository = env.require_repository()?.to_string();

        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| Error::InvalidConfig("GITHUB_TOKEN contains invalid characters".into()))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("layerci/", env!("CARGO_PKG_VERSION"))),
        );
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));

        let http = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context(TransportSnafu {
                operation: "build http client",
            })?;

        Ok(Self {
            http,
            api_url: env.api_url.trim_end_matches('/').to_string(),
            server_url: env.server_url.trim_end_matches('/').to_string(),
            repository,
        })
    }

    fn repo_url(&self, path: &str) -> String {
        format!("{}/repos/{}{}", self.api_url, self.repository, path)
    }

    async fn send_raw(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> std::result::Result<String, ReportingError> {
        let response = request.send().await.context(TransportSnafu { operation })?;
        let status = response.status();
        let body = response.text().await.context(TransportSnafu { operation })?;

        if !status.is_success() {
            return ApiSnafu {
                operation,
                status: status.as_u16(),
                message: body.chars().take(MAX_ERROR_BODY).collect::<String>(),
            }
            .fail();
        }

        tracing::debug!(operation, status = status.as_u16(), "GitHub API call succeeded");
        Ok(body)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> std::result::Result<T, ReportingError> {
        let body = self.send_raw(operation, request).await?;
        serde_json::from_str(&body).context(DecodeSnafu { operation })
    }
}

#[async_trait]
impl CommentOps for GitHubClient {
    async fn list_comments(
        &self,
        pr: PrNumber,
    ) -> std::result::Result<Vec<Comment>, ReportingError> {
        let url = self.repo_url(&format!("/issues/{pr}/comments"));
        let mut comments = Vec::new();

        for page in 1.. {
            let request = self
                .http
                .get(&url)
                .query(&[("per_page", PAGE_SIZE), ("page", page)]);
            let batch: Vec<Comment> = self.send("list comments", request).await?;
            let done = batch.len() < PAGE_SIZE;
            comments.extend(batch);
            if done {
                break;
            }
        }

        Ok(comments)
    }

    async fn create_comment(
        &self,
        pr: PrNumber,
        body: &str,
    ) -> std::result::Result<Comment, ReportingError> {
        let request = self
            .http
            .post(self.repo_url(&format!("/issues/{pr}/comments")))
            .json(&json!({ "body": body }));
        self.send("create comment", request).await
    }

    async fn update_comment(
        &self,
        id: CommentId,
        body: &str,
    ) -> std::result::Result<Comment, ReportingError> {
        let request = self
            .http
            .patch(self.repo_url(&format!("/issues/comments/{id}")))
            .json(&json!({ "body": body }));
        self.send("update comment", request).await
    }
}

#[async_trait]
impl ReactionOps for GitHubClient {
    async fn add_reaction(
        &self,
        comment: CommentId,
        reaction: Reaction,
    ) -> std::result::Result<(), ReportingError> {
        let request = self
            .http
            .post(self.repo_url(&format!("/issues/comments/{comment}/reactions")))
            .json(&json!({ "content": reaction.as_str() }));
        self.send_raw("add reaction", request).await.map(|_| ())
    }
}

#[async_trait]
impl StatusOps for GitHubClient {
    async fn set_commit_status(
        &self,
        sha: &CommitSha,
        status: &CommitStatus,
    ) -> std::result::Result<(), ReportingError> {
        let request = self
            .http
            .post(self.repo_url(&format!("/statuses/{sha}")))
            .json(status);
        self.send_raw("set commit status", request).await.map(|_| ())
    }
}

#[async_trait]
impl PullRequestOps for GitHubClient {
    async fn get_pull_request(
        &self,
        pr: PrNumber,
    ) -> std::result::Result<PullRequestInfo, ReportingError> {
        let request = self.http.get(self.repo_url(&format!("/pulls/{pr}")));
        let raw: RawPullRequest = self.send("get pull request", request).await?;
        Ok(PullRequestInfo {
            number: raw.number,
            head_sha: raw.head.sha,
            head_ref: raw.head.git_ref,
            base_ref: raw.base.git_ref,
            title: raw.title,
            html_url: raw.html_url,
        })
    }
}

#[async_trait]
impl WorkflowOps for GitHubClient {
    async fn dispatch_workflow(
        &self,
        workflow: &str,
        git_ref: &str,
        inputs: &BTreeMap<String, String>,
    ) -> std::result::Result<(), ReportingError> {
        let path = format!(
            "/actions/workflows/{}/dispatches",
            urlencoding::encode(workflow)
        );
        let request = self
            .http
            .post(self.repo_url(&path))
            .json(&json!({ "ref": git_ref, "inputs": inputs }));
        self.send_raw("dispatch workflow", request).await.map(|_| ())
    }

    fn workflow_url(&self, workflow: &str) -> String {
        format!(
            "{}/{}/actions/workflows/{}",
            self.server_url,
            self.repository,
            urlencoding::encode(workflow)
        )
    }
}
