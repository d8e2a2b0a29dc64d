//! Source-host collaborator
//!
//! [`SourceHost`] covers the GitHub operations the suite performs on the
//! component repositories; [`GithubClient`] implements it over the REST API.

mod checks;
mod contents;
mod pulls;
mod refs;

use async_trait::async_trait;
use gantry_core::domain::{CheckRun, FileCommit, MergeResult, PullRequest};
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::error::{ClientError, Result};

/// Default GitHub REST endpoint
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const API_VERSION_HEADER: &str = "X-GitHub-Api-Version";
const API_VERSION: &str = "2022-11-28";

/// Branch, file and pull request operations on repositories of one organization
#[async_trait]
pub trait SourceHost: Send + Sync {
    /// Creates `new_branch` at `sha`, or at the head of `base_branch` when no sha is given
    async fn create_ref(
        &self,
        repo: &str,
        base_branch: &str,
        sha: Option<&str>,
        new_branch: &str,
    ) -> Result<()>;

    async fn delete_ref(&self, repo: &str, branch: &str) -> Result<()>;

    /// Open pull requests of a repository
    async fn list_pull_requests(&self, repo: &str) -> Result<Vec<PullRequest>>;

    async fn create_pull_request(
        &self,
        repo: &str,
        title: &str,
        body: &str,
        head: &str,
        base: &str,
    ) -> Result<PullRequest>;

    async fn merge_pull_request(&self, repo: &str, number: u64) -> Result<MergeResult>;

    /// Commits a new file on a branch
    async fn create_file(
        &self,
        repo: &str,
        path: &str,
        content: &str,
        branch: &str,
    ) -> Result<FileCommit>;

    /// Check runs reported for a commit
    async fn list_check_runs(&self, repo: &str, sha: &str) -> Result<Vec<CheckRun>>;
}

/// GitHub REST client
///
/// All repositories are addressed relative to the organization the client
/// was created for.
#[derive(Debug, Clone)]
pub struct GithubClient {
    /// Base URL of the REST API (e.g., "https://api.github.com")
    base_url: String,
    /// Organization owning the repositories
    org: String,
    /// Personal access token
    token: String,
    /// HTTP client instance
    client: Client,
}

impl GithubClient {
    /// Create a client for the public GitHub API
    pub fn new(token: impl Into<String>, org: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_API_URL, token, org)
    }

    /// Create a client for a GitHub Enterprise or mock endpoint
    pub fn with_base_url(
        base_url: impl Into<String>,
        token: impl Into<String>,
        org: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            org: org.into(),
            token: token.into(),
            client: Client::new(),
        }
    }

    /// Get the base URL of the API
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn org(&self) -> &str {
        &self.org
    }

    fn repo_url(&self, repo: &str) -> String {
        format!("{}/repos/{}/{}", self.base_url, self.org, repo)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/vnd.github+json")
            .header(USER_AGENT, "gantry-e2e")
            .header(API_VERSION_HEADER, API_VERSION)
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let response = self.check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Handle an API response whose body is not needed
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        self.check_status(response).await.map(|_| ())
    }

    async fn check_status(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().to_string();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ClientError::not_found(url));
        }
        Err(ClientError::api_error(status.as_u16(), error_text))
    }
}

#[async_trait]
impl SourceHost for GithubClient {
    async fn create_ref(
        &self,
        repo: &str,
        base_branch: &str,
        sha: Option<&str>,
        new_branch: &str,
    ) -> Result<()> {
        GithubClient::create_ref(self, repo, base_branch, sha, new_branch).await
    }

    async fn delete_ref(&self, repo: &str, branch: &str) -> Result<()> {
        GithubClient::delete_ref(self, repo, branch).await
    }

    async fn list_pull_requests(&self, repo: &str) -> Result<Vec<PullRequest>> {
        GithubClient::list_pull_requests(self, repo).await
    }

    async fn create_pull_request(
        &self,
        repo: &str,
        title: &str,
        body: &str,
        head: &str,
        base: &str,
    ) -> Result<PullRequest> {
        GithubClient::create_pull_request(self, repo, title, body, head, base).await
    }

    async fn merge_pull_request(&self, repo: &str, number: u64) -> Result<MergeResult> {
        GithubClient::merge_pull_request(self, repo, number).await
    }

    async fn create_file(
        &self,
        repo: &str,
        path: &str,
        content: &str,
        branch: &str,
    ) -> Result<FileCommit> {
        GithubClient::create_file(self, repo, path, content, branch).await
    }

    async fn list_check_runs(&self, repo: &str, sha: &str) -> Result<Vec<CheckRun>> {
        GithubClient::list_check_runs(self, repo, sha).await
    }
}
