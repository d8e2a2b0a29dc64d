//! Runner configuration
//!
//! Defines the repositories, integration test source and timeouts of the
//! group snapshot scenario.

use anyhow::Result;
use gantry_core::poll::PollConfig;
use std::time::Duration;

const fn minutes(n: u64) -> Duration {
    Duration::from_secs(n * 60)
}

/// Poll bounds of every wait in the scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Build PipelineRun appears and starts
    pub build_start: PollConfig,
    /// PaC onboarding pull request is opened
    pub pac_pull_request: PollConfig,
    /// Build PipelineRun finishes
    pub build_finish: PollConfig,
    /// Check run reaches a conclusion
    pub check_run: PollConfig,
    /// Snapshot is created for a build
    pub snapshot: PollConfig,
    /// Integration PipelineRun is created for a snapshot
    pub integration_run: PollConfig,
    /// Integration PipelineRun starts
    pub integration_start: PollConfig,
    /// Pull request becomes mergeable
    pub merge: PollConfig,
    /// Group snapshot is created
    pub group_snapshot: PollConfig,
}

impl Default for Timeouts {
    fn default() -> Self {
        let pipeline_run_interval = Duration::from_secs(20);
        Self {
            build_start: PollConfig::new(minutes(10), Duration::from_secs(1)),
            pac_pull_request: PollConfig::new(minutes(5), Duration::from_secs(1)),
            build_finish: PollConfig::new(minutes(30), pipeline_run_interval),
            check_run: PollConfig::new(minutes(5), Duration::from_secs(10)),
            snapshot: PollConfig::new(minutes(10), Duration::from_secs(2)),
            integration_run: PollConfig::new(minutes(5), Duration::from_secs(2)),
            integration_start: PollConfig::new(minutes(10), pipeline_run_interval),
            merge: PollConfig::new(minutes(1), Duration::from_secs(1)),
            group_snapshot: PollConfig::new(minutes(20), pipeline_run_interval),
        }
    }
}

impl Timeouts {
    fn all(&self) -> [(&'static str, PollConfig); 9] {
        [
            ("build_start", self.build_start),
            ("pac_pull_request", self.pac_pull_request),
            ("build_finish", self.build_finish),
            ("check_run", self.check_run),
            ("snapshot", self.snapshot),
            ("integration_run", self.integration_run),
            ("integration_start", self.integration_start),
            ("merge", self.merge),
            ("group_snapshot", self.group_snapshot),
        ]
    }

    /// Same intervals, every timeout multiplied by `factor`
    pub fn scaled(mut self, factor: u32) -> Self {
        for config in [
            &mut self.build_start,
            &mut self.pac_pull_request,
            &mut self.build_finish,
            &mut self.check_run,
            &mut self.snapshot,
            &mut self.integration_run,
            &mut self.integration_start,
            &mut self.merge,
            &mut self.group_snapshot,
        ] {
            config.timeout *= factor;
        }
        self
    }
}

/// Integration test pipeline used by the scenario
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestSource {
    pub git_url: String,
    pub revision: String,
    pub path_in_repo: String,
}

/// Runner configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// GitHub organization owning both repositories
    pub github_org: String,

    /// GitHub token with repo scope
    pub github_token: String,

    /// GitHub REST endpoint
    pub github_api_url: String,

    /// Monorepo holding one component per context directory
    pub monorepo: String,

    /// Second repository changed together with the monorepo
    pub multi_repo: String,

    /// Default branch of both repositories
    pub default_branch: String,

    /// Commit the monorepo base branch starts from (default branch head when unset)
    pub monorepo_revision: Option<String>,

    /// Commit the multi-repo base branch starts from (default branch head when unset)
    pub multi_repo_revision: Option<String>,

    /// Component directories inside the monorepo
    pub context_dirs: Vec<String>,

    /// Integration test pipeline
    pub test_source: TestSource,

    /// Console host of the cluster, checked for reachability from GitHub
    pub console_host: Option<String>,

    /// Branch prefix of the PaC onboarding pull requests
    pub pac_branch_prefix: String,

    /// Prefix of the generated namespace
    pub namespace_prefix: String,

    /// Rebuilds requested when a build PipelineRun fails
    pub build_retries: u32,

    /// Skip everything (PaC tests disabled in this environment)
    pub skip_pac_tests: bool,

    pub timeouts: Timeouts,
}

impl Config {
    /// Creates a configuration with defaults for everything but the credentials
    pub fn new(github_token: String, github_org: String) -> Self {
        Self {
            github_org,
            github_token,
            github_api_url: gantry_client::github::DEFAULT_API_URL.to_string(),
            monorepo: "group-snapshot-multi-component".to_string(),
            multi_repo: "group-snapshot-multi-repo".to_string(),
            default_branch: "main".to_string(),
            monorepo_revision: None,
            multi_repo_revision: None,
            context_dirs: vec!["go-component".to_string(), "python-component".to_string()],
            test_source: TestSource {
                git_url: "https://github.com/konflux-ci/integration-examples.git".to_string(),
                revision: "main".to_string(),
                path_in_repo: "pipelines/integration_resolver_pipeline_pass.yaml".to_string(),
            },
            console_host: None,
            pac_branch_prefix: "konflux-".to_string(),
            namespace_prefix: "group".to_string(),
            build_retries: 2,
            skip_pac_tests: false,
            timeouts: Timeouts::default(),
        }
    }

    /// Clone URL of the monorepo
    pub fn monorepo_url(&self) -> String {
        format!("https://github.com/{}/{}", self.github_org, self.monorepo)
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.github_token.is_empty() {
            anyhow::bail!("github_token cannot be empty");
        }

        if self.github_org.is_empty() {
            anyhow::bail!("github_org cannot be empty");
        }

        if !self.github_api_url.starts_with("http://") && !self.github_api_url.starts_with("https://")
        {
            anyhow::bail!("github_api_url must start with http:// or https://");
        }

        if self.monorepo.is_empty() || self.multi_repo.is_empty() {
            anyhow::bail!("repository names cannot be empty");
        }

        if self.monorepo == self.multi_repo {
            anyhow::bail!("monorepo and multi_repo must be different repositories");
        }

        if self.context_dirs.is_empty() {
            anyhow::bail!("at least one context directory is required");
        }

        if self.context_dirs.iter().any(|d| d.trim().is_empty()) {
            anyhow::bail!("context directories cannot be empty");
        }

        if self.test_source.git_url.is_empty() || self.test_source.path_in_repo.is_empty() {
            anyhow::bail!("integration test source needs a git url and a path");
        }

        for (name, poll) in self.timeouts.all() {
            poll.validate()
                .map_err(|e| anyhow::anyhow!("invalid {} timeout: {}", name, e))?;
        }

        Ok(())
    }
}
