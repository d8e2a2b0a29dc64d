//! Check run endpoints

use gantry_core::domain::CheckRun;
use reqwest::Method;
use serde::Deserialize;

use super::GithubClient;
use crate::error::Result;

#[derive(Debug, Deserialize)]
struct CheckRunList {
    check_runs: Vec<CheckRun>,
}

impl GithubClient {
    // =============================================================================
    // Checks
    // =============================================================================

    /// List the check runs reported for a commit
    pub async fn list_check_runs(&self, repo: &str, sha: &str) -> Result<Vec<CheckRun>> {
        let url = format!("{}/commits/{}/check-runs", self.repo_url(repo), sha);
        let response = self
            .request(Method::GET, &url)
            .query(&[("per_page", "100")])
            .send()
            .await?;

        let list: CheckRunList = self.handle_response(response).await?;
        Ok(list.check_runs)
    }
}
