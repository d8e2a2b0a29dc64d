//! Onboarding steps of one monorepo component

use anyhow::{Context, Result, anyhow};
use gantry_core::domain::{CheckRunConclusion, MergeResult, PullRequest};
use gantry_core::dto::ComponentSpec;
use gantry_core::labels;
use gantry_core::poll::{Condition, Poller};
use tracing::info;

use super::GroupSnapshotScenario;
use crate::context::ScenarioContext;
use crate::platform::{Check, pending};

impl GroupSnapshotScenario {
    pub(super) async fn create_component(&self, ctx: &mut ScenarioContext, index: usize) -> Result<()> {
        let (namespace, application) = ctx.target()?;
        let lane = &ctx.lanes[index];
        let spec = ComponentSpec::new(
            &lane.component_name,
            &application,
            self.config.monorepo_url(),
            &ctx.base_branch,
        )
        .with_context_dir(&lane.context_dir);

        let component = self
            .cluster()
            .create_component(&namespace, &spec)
            .await
            .with_context(|| format!("Failed to create component {}", spec.name))?;

        info!(
            component = %component.name(),
            context_dir = %lane.context_dir,
            "Created component"
        );
        ctx.lanes[index].created = true;
        Ok(())
    }

    pub(super) async fn wait_build_started(&self, ctx: &mut ScenarioContext, index: usize) -> Result<()> {
        let (namespace, application) = ctx.target()?;
        let lane = &mut ctx.lanes[index];

        let run = self
            .platform
            .wait_for_build_started(&namespace, &lane.component_name, &application)
            .await?;
        lane.build_run = Some(run);
        Ok(())
    }

    pub(super) async fn find_pac_pull_request(&self, ctx: &mut ScenarioContext, index: usize) -> Result<()> {
        let (namespace, application) = ctx.target()?;
        let component = ctx.lanes[index].component_name.clone();
        let branch = ctx.lanes[index].pac_branch.clone();

        let pull = Poller::from_config(self.platform.timeouts().pac_pull_request)
            .until_ok(
                format!(
                    "timed out when waiting for init PaC PR to be created for the {} component",
                    component
                ),
                || self.check_pac_pull_request(&branch),
            )
            .await?;

        info!(component = %component, number = pull.number, sha = %pull.head.sha, "Found PaC pull request");

        let build_run = self
            .platform
            .component_pipeline_run(&namespace, &component, &application, Some(&pull.head.sha))
            .await
            .with_context(|| format!("No build PipelineRun for PaC pull request #{}", pull.number))?;

        ctx.pr_numbers.insert(component, pull.number);
        let lane = &mut ctx.lanes[index];
        lane.pr_number = Some(pull.number);
        lane.pr_head_sha = Some(pull.head.sha);
        lane.build_run = Some(build_run);
        Ok(())
    }

    async fn check_pac_pull_request(&self, branch: &str) -> Check<PullRequest> {
        let pulls = self
            .source
            .list_pull_requests(&self.config.monorepo)
            .await
            .map_err(|e| Condition::abort(anyhow::Error::new(e).context("Failed to list pull requests")))?;

        pulls
            .into_iter()
            .find(|p| p.head.ref_name == branch)
            .ok_or_else(|| pending(format!("no pull request from branch {} yet", branch)))
    }

    pub(super) async fn wait_build_finished(&self, ctx: &mut ScenarioContext, index: usize) -> Result<()> {
        let (namespace, application) = ctx.target()?;
        let lane = &mut ctx.lanes[index];
        let run = lane
            .build_run
            .clone()
            .context("no build PipelineRun recorded")?;

        let finished = self
            .platform
            .wait_for_pipeline_finished(
                &namespace,
                &lane.component_name,
                &application,
                &run,
                self.config.build_retries,
            )
            .await?;
        lane.build_run = Some(finished);
        Ok(())
    }

    pub(super) async fn check_run_succeeded(&self, ctx: &mut ScenarioContext, index: usize) -> Result<()> {
        let lane = &ctx.lanes[index];
        let sha = lane.pr_head_sha.as_deref().context("no PaC pull request recorded")?;
        let check_name = format!("{}-{}", lane.component_name, labels::PULL_REQUEST_CHECK_SUFFIX);

        let conclusion = Poller::from_config(self.platform.timeouts().check_run)
            .until_ok(
                format!("timed out waiting for the PaC check run {} to finish", check_name),
                || self.check_run_conclusion(sha, &check_name),
            )
            .await?;

        anyhow::ensure!(
            conclusion == CheckRunConclusion::Success,
            "check run {} concluded {:?}",
            check_name,
            conclusion
        );
        info!(check_run = %check_name, "Check run succeeded");
        Ok(())
    }

    async fn check_run_conclusion(&self, sha: &str, name: &str) -> Check<CheckRunConclusion> {
        let runs = self
            .source
            .list_check_runs(&self.config.monorepo, sha)
            .await
            .context("Failed to list check runs")?;

        let run = runs
            .into_iter()
            .find(|r| r.name == name)
            .ok_or_else(|| pending(format!("check run {} not reported yet", name)))?;

        if !run.is_completed() {
            return Err(pending(format!("check run {} is {}", name, run.status)));
        }
        run.conclusion
            .ok_or_else(|| pending(format!("check run {} has no conclusion yet", name)))
    }

    pub(super) async fn wait_snapshot(&self, ctx: &mut ScenarioContext, index: usize) -> Result<()> {
        let (namespace, application) = ctx.target()?;
        let lane = &mut ctx.lanes[index];
        let build_run = lane
            .build_run
            .as_ref()
            .map(|r| r.name().to_string())
            .context("no build PipelineRun recorded")?;

        let snapshot = self
            .platform
            .wait_for_snapshot(&namespace, &application, &lane.component_name, &build_run)
            .await?;
        lane.snapshot = Some(snapshot);
        Ok(())
    }

    pub(super) async fn find_integration_run(&self, ctx: &mut ScenarioContext, index: usize) -> Result<()> {
        let (namespace, _) = ctx.target()?;
        let scenario = ctx
            .test_scenario
            .as_ref()
            .map(|s| s.name().to_string())
            .context("no IntegrationTestScenario recorded")?;
        let lane = &mut ctx.lanes[index];
        let snapshot = lane
            .snapshot
            .as_ref()
            .map(|s| s.name().to_string())
            .context("no snapshot recorded")?;

        let run = self
            .platform
            .wait_for_integration_run(&namespace, &scenario, &snapshot)
            .await?;

        anyhow::ensure!(
            run.snapshot() == Some(snapshot.as_str()) && run.scenario() == Some(scenario.as_str()),
            "integration PipelineRun {} is not labelled with snapshot {} and scenario {}",
            run.name(),
            snapshot,
            scenario
        );
        lane.integration_run = Some(run);
        Ok(())
    }

    pub(super) async fn wait_integration_started(&self, ctx: &mut ScenarioContext, index: usize) -> Result<()> {
        let (namespace, _) = ctx.target()?;
        let scenario = ctx
            .test_scenario
            .as_ref()
            .map(|s| s.name().to_string())
            .context("no IntegrationTestScenario recorded")?;
        let lane = &mut ctx.lanes[index];
        let snapshot = lane
            .snapshot
            .as_ref()
            .map(|s| s.name().to_string())
            .context("no snapshot recorded")?;

        let run = self
            .platform
            .wait_for_integration_started(&namespace, &scenario, &snapshot)
            .await?;
        lane.integration_run = Some(run);
        Ok(())
    }

    pub(super) async fn merge_pac_pull_request(&self, ctx: &mut ScenarioContext, index: usize) -> Result<()> {
        let number = ctx.lanes[index]
            .pr_number
            .context("no PaC pull request recorded")?;

        let merged = Poller::from_config(self.platform.timeouts().merge)
            .until_ok(
                format!(
                    "error when merging PaC pull request #{} in repo {}",
                    number, self.config.monorepo
                ),
                || self.try_merge(number),
            )
            .await?;

        let sha = merged
            .sha
            .with_context(|| format!("merge of pull request #{} returned no sha", number))?;
        info!(number, sha = %sha, "Merged PaC pull request");

        ctx.lanes[index].merge_sha = Some(sha.clone());
        ctx.merge_sha = Some(sha);
        Ok(())
    }

    async fn try_merge(&self, number: u64) -> Check<MergeResult> {
        match self
            .source
            .merge_pull_request(&self.config.monorepo, number)
            .await
        {
            Ok(result) if result.merged => Ok(result),
            Ok(result) => Err(pending(format!(
                "pull request #{} not merged: {}",
                number, result.message
            ))),
            Err(e) if e.is_not_found() => Err(Condition::abort(anyhow!(
                "pull request #{} does not exist: {}",
                number,
                e
            ))),
            Err(e) => Err(Condition::retry(
                anyhow::Error::new(e).context(format!("Failed to merge pull request #{}", number)),
            )),
        }
    }
}
