//! Grouped pull requests and group snapshot checks

use anyhow::{Context, Result};
use gantry_core::domain::Snapshot;
use tracing::info;

use super::GroupSnapshotScenario;
use crate::context::ScenarioContext;

const MONOREPO_FILE_CONTENT: &str = "Test content for component";
const MULTI_REPO_FILE_CONTENT: &str = "Sometimes I drink water to surprise my liver";
const MONOREPO_PR_TITLE: &str = "SingleRepo multi-component PR";
const MULTI_REPO_PR_TITLE: &str = "Multirepo component PR";
const PR_BODY: &str = "sample PR body";

fn sample_file_path(component: &str) -> String {
    format!("{0}/sample-file-for-{0}.txt", component)
}

impl GroupSnapshotScenario {
    pub(super) async fn push_monorepo_changes(&self, ctx: &mut ScenarioContext) -> Result<()> {
        let repo = self.config.monorepo.clone();
        let start = ctx.merge_sha.clone();
        self.open_group_pull_request(ctx, &repo, start, MONOREPO_FILE_CONTENT, MONOREPO_PR_TITLE)
            .await
    }

    /// Nothing is merged in the multi-repo, so its branch starts at the default branch head
    pub(super) async fn push_multi_repo_changes(&self, ctx: &mut ScenarioContext) -> Result<()> {
        let repo = self.config.multi_repo.clone();
        self.open_group_pull_request(ctx, &repo, None, MULTI_REPO_FILE_CONTENT, MULTI_REPO_PR_TITLE)
            .await
    }

    async fn open_group_pull_request(
        &self,
        ctx: &mut ScenarioContext,
        repo: &str,
        start: Option<String>,
        content: &str,
        title: &str,
    ) -> Result<()> {
        self.source
            .create_ref(repo, &self.config.default_branch, start.as_deref(), &ctx.pr_branch)
            .await
            .with_context(|| format!("Failed to create branch {} in {}", ctx.pr_branch, repo))?;

        let mut last_file_sha = None;
        for component in ctx.component_names() {
            let path = sample_file_path(component);
            let commit = self
                .source
                .create_file(repo, &path, content, &ctx.pr_branch)
                .await
                .with_context(|| format!("error while creating file: {}", path))?;
            last_file_sha = commit.sha.or(last_file_sha);
        }

        let pull = self
            .source
            .create_pull_request(repo, title, PR_BODY, &ctx.pr_branch, &ctx.base_branch)
            .await
            .with_context(|| format!("Failed to open pull request in {}", repo))?;

        info!(
            repo = %repo,
            number = pull.number,
            file_sha = ?last_file_sha,
            "Opened grouped pull request"
        );
        ctx.group_prs.insert(repo.to_string(), pull);
        Ok(())
    }

    pub(super) async fn wait_group_builds(&self, ctx: &mut ScenarioContext) -> Result<()> {
        let (namespace, application) = ctx.target()?;
        let sha = ctx
            .group_prs
            .get(&self.config.monorepo)
            .map(|p| p.head.sha.clone())
            .context("no monorepo pull request recorded")?;

        for lane in ctx.lanes.iter_mut().filter(|l| l.created) {
            let run = self
                .platform
                .wait_for_latest_build_finished(
                    &namespace,
                    &lane.component_name,
                    &application,
                    Some(&sha),
                )
                .await?;
            lane.group_build = Some(run);
        }
        Ok(())
    }

    pub(super) async fn check_group_components(&self, ctx: &mut ScenarioContext) -> Result<()> {
        let (namespace, application) = ctx.target()?;
        ctx.group_snapshots = self
            .platform
            .wait_for_group_snapshots(&namespace, &application)
            .await?;

        let info = group_test_info(&ctx.group_snapshots)?;
        for component in ctx.component_names() {
            anyhow::ensure!(
                info.contains(component),
                "group snapshot annotation does not mention component {}",
                component
            );
        }
        Ok(())
    }

    pub(super) async fn check_group_builds(&self, ctx: &mut ScenarioContext) -> Result<()> {
        let info = group_test_info(&ctx.group_snapshots)?;

        for lane in ctx.lanes.iter().filter(|l| l.created) {
            let run = lane
                .group_build
                .as_ref()
                .with_context(|| format!("no grouped build recorded for {}", lane.component_name))?;
            anyhow::ensure!(
                info.contains(run.name()),
                "group snapshot annotation does not mention build PipelineRun {} of {}",
                run.name(),
                lane.component_name
            );
        }
        Ok(())
    }
}

/// Group test annotation of the newest group snapshot
fn group_test_info(snapshots: &[Snapshot]) -> Result<&str> {
    let newest = snapshots.first().context("no group snapshot recorded")?;
    newest
        .group_test_info()
        .with_context(|| format!("group snapshot {} has no group test annotation", newest.name()))
}
