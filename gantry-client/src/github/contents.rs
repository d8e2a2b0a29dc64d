//! Repository contents endpoints

use base64::{Engine, engine::general_purpose::STANDARD};
use gantry_core::domain::FileCommit;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::GithubClient;
use crate::error::Result;

#[derive(Debug, Deserialize)]
struct ContentResponse {
    content: Option<ContentEntry>,
    commit: Option<CommitEntry>,
}

#[derive(Debug, Deserialize)]
struct ContentEntry {
    path: String,
    sha: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommitEntry {
    sha: Option<String>,
}

impl ContentResponse {
    fn into_file_commit(self, path: &str) -> FileCommit {
        let (path, sha) = match self.content {
            Some(entry) => (entry.path, entry.sha),
            None => (path.to_string(), None),
        };
        FileCommit {
            path,
            sha,
            commit_sha: self.commit.and_then(|c| c.sha),
        }
    }
}

impl GithubClient {
    // =============================================================================
    // Contents
    // =============================================================================

    /// Commit a new file on a branch
    ///
    /// # Arguments
    /// * `repo` - Repository name inside the organization
    /// * `path` - Path of the file to create
    /// * `content` - Plain text content; encoded before upload
    /// * `branch` - Branch receiving the commit
    pub async fn create_file(
        &self,
        repo: &str,
        path: &str,
        content: &str,
        branch: &str,
    ) -> Result<FileCommit> {
        let url = format!("{}/contents/{}", self.repo_url(repo), path);
        let response = self
            .request(Method::PUT, &url)
            .json(&json!({
                "message": format!("e2e test commit message for file {}", path),
                "content": STANDARD.encode(content),
                "branch": branch,
            }))
            .send()
            .await?;

        let created: ContentResponse = self.handle_response(response).await?;
        let file = created.into_file_commit(path);

        info!(repo = %repo, path = %file.path, branch = %branch, "Created file");
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_response_mapping() {
        let response: ContentResponse = serde_json::from_value(json!({
            "content": { "path": "c1/sample-file-for-c1.txt", "sha": "blob1", "size": 26 },
            "commit": { "sha": "commit1", "message": "e2e" }
        }))
        .unwrap();

        let file = response.into_file_commit("ignored");
        assert_eq!(file.path, "c1/sample-file-for-c1.txt");
        assert_eq!(file.sha.as_deref(), Some("blob1"));
        assert_eq!(file.commit_sha.as_deref(), Some("commit1"));
    }

    #[test]
    fn test_content_response_without_sha() {
        let response: ContentResponse =
            serde_json::from_value(json!({ "content": null, "commit": null })).unwrap();

        let file = response.into_file_commit("c1/file.txt");
        assert_eq!(file.path, "c1/file.txt");
        assert!(file.sha.is_none());
        assert!(file.commit_sha.is_none());
    }
}
