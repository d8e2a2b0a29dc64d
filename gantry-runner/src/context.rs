//! Scenario state
//!
//! One [`ScenarioContext`] is created per scenario run and handed by `&mut`
//! to every step, so steps exchange results (PR numbers, merge shas,
//! snapshots) without any process-wide state. Each monorepo component gets
//! its own [`ComponentLane`].

use gantry_core::domain::{IntegrationTestScenario, PipelineRun, PullRequest, Snapshot};
use std::collections::BTreeMap;

/// State accumulated by one component's steps
#[derive(Debug, Clone, Default)]
pub struct ComponentLane {
    /// Directory of the component inside the monorepo
    pub context_dir: String,

    /// Generated component name (`<context_dir>-<random>`)
    pub component_name: String,

    /// Branch of the PaC onboarding pull request
    pub pac_branch: String,

    /// Set once the component exists in the cluster
    pub created: bool,

    /// Onboarding pull request
    pub pr_number: Option<u64>,
    pub pr_head_sha: Option<String>,

    /// Build PipelineRun of the onboarding pull request
    pub build_run: Option<PipelineRun>,

    pub snapshot: Option<Snapshot>,

    pub integration_run: Option<PipelineRun>,

    /// Sha of the merge commit of the onboarding pull request
    pub merge_sha: Option<String>,

    /// Build PipelineRun triggered by the grouped monorepo pull request
    pub group_build: Option<PipelineRun>,
}

impl ComponentLane {
    pub fn new(context_dir: &str, component_name: String, pac_branch_prefix: &str) -> Self {
        let pac_branch = format!("{}{}", pac_branch_prefix, component_name);
        Self {
            context_dir: context_dir.to_string(),
            component_name,
            pac_branch,
            ..Default::default()
        }
    }
}

/// State shared by the steps of one scenario run
#[derive(Debug, Clone, Default)]
pub struct ScenarioContext {
    pub namespace: Option<String>,
    pub application: Option<String>,
    pub test_scenario: Option<IntegrationTestScenario>,

    /// Base branch created in both repositories
    pub base_branch: String,
    /// Branch carrying the grouped changes in both repositories
    pub pr_branch: String,

    pub lanes: Vec<ComponentLane>,

    /// PR numbers keyed by component name
    pub pr_numbers: BTreeMap<String, u64>,

    /// Last onboarding merge commit in the monorepo
    pub merge_sha: Option<String>,

    /// Pull requests opened on `pr_branch`, keyed by repository
    pub group_prs: BTreeMap<String, PullRequest>,

    pub group_snapshots: Vec<Snapshot>,

    /// Set when any step failed; resources are kept for debugging
    pub failed: bool,
}

impl ScenarioContext {
    pub fn new(base_branch: String, pr_branch: String) -> Self {
        Self {
            base_branch,
            pr_branch,
            ..Default::default()
        }
    }

    /// Namespace and application, once setup created them
    pub fn target(&self) -> anyhow::Result<(String, String)> {
        match (&self.namespace, &self.application) {
            (Some(ns), Some(app)) => Ok((ns.clone(), app.clone())),
            _ => anyhow::bail!("namespace and application have not been created"),
        }
    }

    /// Names of the components created so far
    pub fn component_names(&self) -> Vec<&str> {
        self.lanes
            .iter()
            .filter(|l| l.created)
            .map(|l| l.component_name.as_str())
            .collect()
    }

    /// Branches PaC opened onboarding pull requests from
    pub fn pac_branches(&self) -> impl Iterator<Item = &str> {
        self.lanes
            .iter()
            .filter(|l| l.created)
            .map(|l| l.pac_branch.as_str())
    }
}
