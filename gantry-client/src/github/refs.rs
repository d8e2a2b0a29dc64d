//! Branch (git ref) endpoints

use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use super::GithubClient;
use crate::error::Result;

#[derive(Debug, Deserialize)]
struct RefResponse {
    object: RefObject,
}

#[derive(Debug, Deserialize)]
struct RefObject {
    sha: String,
}

impl GithubClient {
    // =============================================================================
    // Branches
    // =============================================================================

    /// Get the commit sha a branch points to
    pub async fn branch_head(&self, repo: &str, branch: &str) -> Result<String> {
        let url = format!("{}/git/ref/heads/{}", self.repo_url(repo), branch);
        let response = self.request(Method::GET, &url).send().await?;

        let reference: RefResponse = self.handle_response(response).await?;
        Ok(reference.object.sha)
    }

    /// Create a branch
    ///
    /// # Arguments
    /// * `repo` - Repository name inside the organization
    /// * `base_branch` - Branch whose head is used when `sha` is `None` or empty
    /// * `sha` - Commit the new branch points to
    /// * `new_branch` - Name of the branch to create
    pub async fn create_ref(
        &self,
        repo: &str,
        base_branch: &str,
        sha: Option<&str>,
        new_branch: &str,
    ) -> Result<()> {
        let sha = match sha.filter(|s| !s.is_empty()) {
            Some(sha) => sha.to_string(),
            None => {
                debug!(repo = %repo, branch = %base_branch, "Resolving branch head");
                self.branch_head(repo, base_branch).await?
            }
        };

        let url = format!("{}/git/refs", self.repo_url(repo));
        let response = self
            .request(Method::POST, &url)
            .json(&json!({
                "ref": format!("refs/heads/{}", new_branch),
                "sha": sha,
            }))
            .send()
            .await?;

        self.handle_empty_response(response).await?;

        info!(repo = %repo, branch = %new_branch, sha = %sha, "Created branch");
        Ok(())
    }

    /// Delete a branch
    pub async fn delete_ref(&self, repo: &str, branch: &str) -> Result<()> {
        let url = format!("{}/git/refs/heads/{}", self.repo_url(repo), branch);
        let response = self.request(Method::DELETE, &url).send().await?;

        self.handle_empty_response(response).await?;

        info!(repo = %repo, branch = %branch, "Deleted branch");
        Ok(())
    }
}
