//! Pull request endpoints

use gantry_core::domain::{MergeResult, PullRequest};
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info};

use super::GithubClient;
use crate::error::Result;

/// Page size used when listing pull requests
const PER_PAGE: usize = 100;

impl GithubClient {
    // =============================================================================
    // Pull Requests
    // =============================================================================

    /// List all open pull requests of a repository
    ///
    /// Follows pagination until a short page is returned.
    pub async fn list_pull_requests(&self, repo: &str) -> Result<Vec<PullRequest>> {
        let url = format!("{}/pulls", self.repo_url(repo));
        let mut pulls = Vec::new();

        for page in 1.. {
            let response = self
                .request(Method::GET, &url)
                .query(&[
                    ("state", "open".to_string()),
                    ("per_page", PER_PAGE.to_string()),
                    ("page", page.to_string()),
                ])
                .send()
                .await?;

            let batch: Vec<PullRequest> = self.handle_response(response).await?;
            let last_page = batch.len() < PER_PAGE;
            pulls.extend(batch);

            if last_page {
                break;
            }
        }

        debug!(repo = %repo, count = pulls.len(), "Listed pull requests");
        Ok(pulls)
    }

    /// Open a pull request from `head` into `base`
    pub async fn create_pull_request(
        &self,
        repo: &str,
        title: &str,
        body: &str,
        head: &str,
        base: &str,
    ) -> Result<PullRequest> {
        let url = format!("{}/pulls", self.repo_url(repo));
        let response = self
            .request(Method::POST, &url)
            .json(&json!({
                "title": title,
                "body": body,
                "head": head,
                "base": base,
            }))
            .send()
            .await?;

        let pr: PullRequest = self.handle_response(response).await?;

        info!(repo = %repo, number = pr.number, head = %head, base = %base, "Created pull request");
        Ok(pr)
    }

    /// Merge a pull request
    ///
    /// GitHub answers 405 while the pull request is not mergeable yet.
    pub async fn merge_pull_request(&self, repo: &str, number: u64) -> Result<MergeResult> {
        let url = format!("{}/pulls/{}/merge", self.repo_url(repo), number);
        let response = self
            .request(Method::PUT, &url)
            .json(&json!({}))
            .send()
            .await?;

        let result: MergeResult = self.handle_response(response).await?;

        info!(repo = %repo, number, sha = ?result.sha, "Merged pull request");
        Ok(result)
    }
}
