//! Group snapshot scenario
//!
//! Onboards every monorepo component through its PaC pull request, then
//! opens pull requests sharing one branch name in the monorepo and the
//! multi-repo and verifies that the integration service groups the
//! resulting builds into a group snapshot.
//!
//! Steps run in order and the first failure stops the rest. Cleanup always
//! runs; cluster resources are kept for debugging when a step failed.

mod group;
mod lane;
mod setup;

use gantry_client::names::generate_name;
use gantry_client::{Cluster, SourceHost};
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::context::{ComponentLane, ScenarioContext};
use crate::platform::Platform;
use crate::report::ScenarioReport;

const SCENARIO_NAME: &str = "Creation of group snapshots for monorepo and multiple repos";

/// The group snapshot end-to-end scenario
pub struct GroupSnapshotScenario {
    config: Config,
    platform: Platform,
    source: Arc<dyn SourceHost>,
}

impl GroupSnapshotScenario {
    pub fn new(config: Config, cluster: Arc<dyn Cluster>, source: Arc<dyn SourceHost>) -> Self {
        let platform = Platform::new(cluster, config.timeouts);
        Self {
            config,
            platform,
            source,
        }
    }

    fn cluster(&self) -> &dyn Cluster {
        self.platform.cluster()
    }

    /// Runs every step, then cleans up
    pub async fn run(&self) -> ScenarioReport {
        let mut report = ScenarioReport::new(SCENARIO_NAME);

        if let Some(reason) = self.skip_reason().await {
            report.skip(SCENARIO_NAME, reason);
            return report;
        }

        let mut ctx = ScenarioContext::new(
            generate_name("multi-repo"),
            generate_name("pr-branch"),
        );
        info!(
            base_branch = %ctx.base_branch,
            pr_branch = %ctx.pr_branch,
            "Starting group snapshot scenario"
        );

        if self.run_steps(&mut ctx, &mut report).await.is_none() {
            info!("Scenario stopped at the first failed step");
        }

        ctx.failed = report.failed();
        self.cleanup(&ctx).await;
        report
    }

    async fn run_steps(&self, ctx: &mut ScenarioContext, report: &mut ScenarioReport) -> Option<()> {
        report
            .step("creates namespace and application", self.create_application(ctx))
            .await?;
        report
            .step("creates base branches in both repositories", self.create_base_branches(ctx))
            .await?;
        report
            .step("creates an IntegrationTestScenario", self.create_test_scenario(ctx))
            .await?;

        for context_dir in &self.config.context_dirs {
            ctx.lanes.push(ComponentLane::new(
                context_dir,
                generate_name(context_dir),
                &self.config.pac_branch_prefix,
            ));
        }

        for index in 0..ctx.lanes.len() {
            let component = ctx.lanes[index].component_name.clone();

            report
                .step(
                    format!("creates component {}", component),
                    self.create_component(ctx, index),
                )
                .await?;
            report
                .step(
                    format!("triggers a build PipelineRun for {}", component),
                    self.wait_build_started(ctx, index),
                )
                .await?;
            report
                .step(
                    format!("opens a PaC pull request for {}", component),
                    self.find_pac_pull_request(ctx, index),
                )
                .await?;
            report
                .step(
                    format!("finishes the build PipelineRun of {}", component),
                    self.wait_build_finished(ctx, index),
                )
                .await?;
            report
                .step(
                    format!("reports a successful check run for {}", component),
                    self.check_run_succeeded(ctx, index),
                )
                .await?;
            report
                .step(
                    format!("creates a snapshot for {}", component),
                    self.wait_snapshot(ctx, index),
                )
                .await?;
            report
                .step(
                    format!("creates an integration PipelineRun for {}", component),
                    self.find_integration_run(ctx, index),
                )
                .await?;
            report
                .step(
                    format!("starts the integration PipelineRun for {}", component),
                    self.wait_integration_started(ctx, index),
                )
                .await?;
            report
                .step(
                    format!("merges the PaC pull request of {}", component),
                    self.merge_pac_pull_request(ctx, index),
                )
                .await?;
        }

        report
            .step("opens a multi-component pull request in the monorepo", self.push_monorepo_changes(ctx))
            .await?;
        report
            .step("opens a pull request in the multi-repo", self.push_multi_repo_changes(ctx))
            .await?;
        report
            .step("finishes the builds of the grouped pull request", self.wait_group_builds(ctx))
            .await?;
        report
            .step("creates a group snapshot with every component", self.check_group_components(ctx))
            .await?;
        report
            .step("records the latest build of every component", self.check_group_builds(ctx))
            .await?;

        Some(())
    }
}
