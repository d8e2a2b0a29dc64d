//! Gantry Runner
//!
//! Runs the group snapshot end-to-end scenario against a live cluster and
//! GitHub organization.
//!
//! Architecture:
//! - Configuration: CLI flags with environment fallbacks
//! - Platform: waits on PipelineRuns and snapshots through the condition poller
//! - Scenario: the ordered steps, sharing one explicit context
//! - Report: per-step outcome printed at the end
//!
//! The process exits non-zero when any step failed.

mod config;
mod context;
mod platform;
mod report;
mod scenario;
#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use clap::Parser;
use gantry_client::{Cluster, GithubClient, KubeCluster, SourceHost};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, TestSource};
use crate::scenario::GroupSnapshotScenario;

#[derive(Parser)]
#[command(name = "gantry")]
#[command(about = "Group snapshot end-to-end suite", long_about = None)]
struct Cli {
    /// GitHub token with repo scope
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: String,

    /// GitHub organization owning the test repositories
    #[arg(long, env = "MY_GITHUB_ORG", default_value = "redhat-appstudio-qe")]
    github_org: String,

    /// GitHub REST endpoint
    #[arg(long, env = "GITHUB_API_URL", default_value = gantry_client::github::DEFAULT_API_URL)]
    github_api_url: String,

    /// Monorepo holding one component per context directory
    #[arg(long, env = "GANTRY_MONOREPO", default_value = "group-snapshot-multi-component")]
    monorepo: String,

    /// Second repository changed together with the monorepo
    #[arg(long, env = "GANTRY_MULTI_REPO", default_value = "group-snapshot-multi-repo")]
    multi_repo: String,

    /// Default branch of both repositories
    #[arg(long, env = "GANTRY_DEFAULT_BRANCH", default_value = "main")]
    default_branch: String,

    /// Commit the monorepo base branch starts from
    #[arg(long, env = "GANTRY_MONOREPO_REVISION")]
    monorepo_revision: Option<String>,

    /// Commit the multi-repo base branch starts from
    #[arg(long, env = "GANTRY_MULTI_REPO_REVISION")]
    multi_repo_revision: Option<String>,

    /// Component directories inside the monorepo
    #[arg(
        long,
        env = "GANTRY_CONTEXT_DIRS",
        value_delimiter = ',',
        default_value = "go-component,python-component"
    )]
    context_dirs: Vec<String>,

    /// Repository of the integration test pipeline
    #[arg(
        long,
        env = "GANTRY_SCENARIO_GIT_URL",
        default_value = "https://github.com/konflux-ci/integration-examples.git"
    )]
    scenario_git_url: String,

    #[arg(long, env = "GANTRY_SCENARIO_REVISION", default_value = "main")]
    scenario_revision: String,

    #[arg(
        long,
        env = "GANTRY_SCENARIO_PATH",
        default_value = "pipelines/integration_resolver_pipeline_pass.yaml"
    )]
    scenario_path: String,

    /// Console host of the cluster; private hosts skip the scenario
    #[arg(long, env = "GANTRY_CONSOLE_HOST")]
    console_host: Option<String>,

    /// Branch prefix of the PaC onboarding pull requests
    #[arg(long, env = "GANTRY_PAC_BRANCH_PREFIX", default_value = "konflux-")]
    pac_branch_prefix: String,

    /// Rebuilds requested when a build PipelineRun fails
    #[arg(long, env = "GANTRY_BUILD_RETRIES", default_value_t = 2)]
    build_retries: u32,

    /// Multiplies every timeout, for slow clusters
    #[arg(long, env = "GANTRY_TIMEOUT_SCALE", default_value_t = 1)]
    timeout_scale: u32,

    /// Skip the scenario (PaC tests disabled in this environment)
    #[arg(long, env = "SKIP_PAC_TESTS", default_value_t = false)]
    skip_pac_tests: bool,
}

impl Cli {
    fn into_config(self) -> Config {
        let mut config = Config::new(self.github_token, self.github_org);
        config.github_api_url = self.github_api_url;
        config.monorepo = self.monorepo;
        config.multi_repo = self.multi_repo;
        config.default_branch = self.default_branch;
        config.monorepo_revision = self.monorepo_revision;
        config.multi_repo_revision = self.multi_repo_revision;
        config.context_dirs = self.context_dirs;
        config.test_source = TestSource {
            git_url: self.scenario_git_url,
            revision: self.scenario_revision,
            path_in_repo: self.scenario_path,
        };
        config.console_host = self.console_host;
        config.pac_branch_prefix = self.pac_branch_prefix;
        config.build_retries = self.build_retries;
        config.skip_pac_tests = self.skip_pac_tests;
        config.timeouts = config.timeouts.scaled(self.timeout_scale.max(1));
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gantry_runner=info,gantry_client=info,gantry_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Cli::parse().into_config();
    config.validate().context("Invalid configuration")?;
    info!(
        "Loaded configuration: org={}, monorepo={}, multi_repo={}",
        config.github_org, config.monorepo, config.multi_repo
    );

    let cluster: Arc<dyn Cluster> = Arc::new(
        KubeCluster::try_default()
            .await
            .context("Failed to connect to the cluster")?,
    );
    let source: Arc<dyn SourceHost> = Arc::new(GithubClient::with_base_url(
        config.github_api_url.clone(),
        config.github_token.clone(),
        config.github_org.clone(),
    ));

    let report = GroupSnapshotScenario::new(config, cluster, source).run().await;
    report.print();

    if let Some(failure) = report.first_failure() {
        anyhow::bail!("Step '{}' failed", failure.name);
    }
    Ok(())
}
