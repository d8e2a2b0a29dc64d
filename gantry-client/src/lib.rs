//! Gantry collaborator clients
//!
//! The suite talks to two external systems:
//! - the cluster hosting the CI platform's controllers ([`Cluster`])
//! - the source host holding the component repositories ([`SourceHost`])
//!
//! Both are traits so the scenario can run against in-memory doubles; the
//! real implementations are [`KubeCluster`] and [`GithubClient`].
//!
//! # Example
//!
//! ```no_run
//! use gantry_client::{GithubClient, SourceHost};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let github = GithubClient::new("ghp_token", "redhat-appstudio-qe");
//!
//!     let pulls = github.list_pull_requests("group-snapshot-monorepo").await?;
//!     println!("{} open pull request(s)", pulls.len());
//!     Ok(())
//! }
//! ```

pub mod cluster;
pub mod error;
pub mod github;
pub mod names;

// Re-export commonly used types
pub use cluster::{Cluster, KubeCluster};
pub use error::{ClientError, Result};
pub use github::{GithubClient, SourceHost};
