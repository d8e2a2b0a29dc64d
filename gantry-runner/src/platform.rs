//! Platform queries
//!
//! Waits on the state the platform controllers converge to: build and
//! integration PipelineRuns, snapshots and group snapshots. Every wait is a
//! [`Poller`] session bounded by the configured [`Timeouts`].

use anyhow::{Context, Result, anyhow};
use gantry_client::{ClientError, Cluster};
use gantry_core::domain::{PipelineRun, Snapshot};
use gantry_core::dto::PipelineRunQuery;
use gantry_core::poll::{Condition, Poller};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Timeouts;

/// Outcome of one predicate evaluation
pub type Check<T> = std::result::Result<T, Condition<anyhow::Error>>;

/// "Not there yet", retried until the deadline
pub(crate) fn pending(message: impl Into<String>) -> Condition<anyhow::Error> {
    let message: String = message.into();
    Condition::retry(anyhow!(message))
}

/// Newest run by creation time (name breaks ties)
fn newest(runs: Vec<PipelineRun>) -> Option<PipelineRun> {
    runs.into_iter().max_by(|a, b| {
        a.metadata
            .creation_timestamp
            .cmp(&b.metadata.creation_timestamp)
            .then_with(|| a.name().cmp(b.name()))
    })
}

/// Cluster state queries used by the scenario steps
pub struct Platform {
    cluster: Arc<dyn Cluster>,
    timeouts: Timeouts,
}

impl Platform {
    pub fn new(cluster: Arc<dyn Cluster>, timeouts: Timeouts) -> Self {
        Self { cluster, timeouts }
    }

    pub fn cluster(&self) -> &dyn Cluster {
        self.cluster.as_ref()
    }

    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    /// Newest build PipelineRun of a component, optionally for a commit
    pub async fn component_pipeline_run(
        &self,
        namespace: &str,
        component: &str,
        application: &str,
        sha: Option<&str>,
    ) -> gantry_client::Result<PipelineRun> {
        let query = PipelineRunQuery::build(component, application).with_sha(sha);
        let runs = self.cluster.list_pipeline_runs(namespace, &query).await?;

        newest(runs).ok_or_else(|| {
            ClientError::not_found(format!(
                "build PipelineRun for component {}/{}",
                namespace, component
            ))
        })
    }

    // =============================================================================
    // Build PipelineRuns
    // =============================================================================

    /// Waits until the newest build PipelineRun of a component has started
    pub async fn wait_for_build_started(
        &self,
        namespace: &str,
        component: &str,
        application: &str,
    ) -> Result<PipelineRun> {
        let run = Poller::from_config(self.timeouts.build_start)
            .until_ok(
                format!(
                    "Timed out waiting for build PipelineRun for {}/{}",
                    namespace, component
                ),
                || self.check_build_started(namespace, component, application),
            )
            .await?;

        info!(pipeline_run = %run.metadata.qualified_name(), "Build PipelineRun started");
        Ok(run)
    }

    async fn check_build_started(
        &self,
        namespace: &str,
        component: &str,
        application: &str,
    ) -> Check<PipelineRun> {
        let run = self
            .component_pipeline_run(namespace, component, application, None)
            .await
            .context("build PipelineRun not found")?;

        if !run.has_started() {
            return Err(pending(format!(
                "build PipelineRun {} hasn't started yet",
                run.metadata.qualified_name()
            )));
        }
        Ok(run)
    }

    /// Waits for a build PipelineRun to finish, requesting rebuilds on failure
    ///
    /// Up to `retries` rebuilds are requested; the run that finally succeeds
    /// is returned.
    pub async fn wait_for_pipeline_finished(
        &self,
        namespace: &str,
        component: &str,
        application: &str,
        run: &PipelineRun,
        retries: u32,
    ) -> Result<PipelineRun> {
        let finish = Poller::from_config(self.timeouts.build_finish);
        let mut current = run.name().to_string();
        let mut attempt = 0;

        loop {
            let finished = finish
                .until_ok(
                    format!(
                        "Timed out waiting for PipelineRun {}/{} to finish",
                        namespace, current
                    ),
                    || self.check_run_done(namespace, component, application, &current),
                )
                .await?;

            if finished.succeeded() {
                info!(pipeline_run = %finished.name(), "PipelineRun succeeded");
                return Ok(finished);
            }

            let reason = finished.failure_reason().unwrap_or_default();
            if attempt >= retries {
                anyhow::bail!(
                    "PipelineRun {} failed after {} rebuild(s): {}",
                    finished.metadata.qualified_name(),
                    attempt,
                    reason
                );
            }

            attempt += 1;
            warn!(
                pipeline_run = %finished.name(),
                reason = %reason,
                attempt,
                retries,
                "PipelineRun failed, requesting rebuild"
            );

            self.cluster
                .request_build(namespace, component)
                .await
                .with_context(|| format!("Failed to request rebuild of {}", component))?;

            let rebuilt = Poller::from_config(self.timeouts.build_start)
                .until_ok(
                    format!("Timed out waiting for rebuild of {}/{}", namespace, component),
                    || self.check_new_build(namespace, component, application, finished.name()),
                )
                .await?;
            current = rebuilt.name().to_string();
        }
    }

    async fn check_run_done(
        &self,
        namespace: &str,
        component: &str,
        application: &str,
        name: &str,
    ) -> Check<PipelineRun> {
        let query = PipelineRunQuery::build(component, application);
        let runs = self
            .cluster
            .list_pipeline_runs(namespace, &query)
            .await
            .context("Failed to list build PipelineRuns")?;

        let run = runs
            .into_iter()
            .find(|r| r.name() == name)
            .ok_or_else(|| pending(format!("PipelineRun {}/{} not found", namespace, name)))?;

        if !run.is_done() {
            return Err(pending(format!("PipelineRun {}/{} is still running", namespace, name)));
        }
        Ok(run)
    }

    async fn check_new_build(
        &self,
        namespace: &str,
        component: &str,
        application: &str,
        previous: &str,
    ) -> Check<PipelineRun> {
        let run = self
            .component_pipeline_run(namespace, component, application, None)
            .await
            .context("build PipelineRun not found")?;

        if run.name() == previous {
            return Err(pending(format!("no new build of {} yet", component)));
        }
        if !run.has_started() {
            return Err(pending(format!("rebuild {} hasn't started yet", run.name())));
        }
        Ok(run)
    }

    /// Waits until the newest build of a component (for `sha`, if given) has finished
    ///
    /// A failed build ends the wait at once.
    pub async fn wait_for_latest_build_finished(
        &self,
        namespace: &str,
        component: &str,
        application: &str,
        sha: Option<&str>,
    ) -> Result<PipelineRun> {
        let run = Poller::from_config(self.timeouts.build_finish)
            .until_ok(
                format!(
                    "Timed out waiting for the build of {}/{} to finish",
                    namespace, component
                ),
                || self.check_latest_build(namespace, component, application, sha),
            )
            .await?;

        info!(pipeline_run = %run.name(), component = %component, "Build finished");
        Ok(run)
    }

    async fn check_latest_build(
        &self,
        namespace: &str,
        component: &str,
        application: &str,
        sha: Option<&str>,
    ) -> Check<PipelineRun> {
        let run = self
            .component_pipeline_run(namespace, component, application, sha)
            .await
            .context("build PipelineRun not found")?;

        if run.failed() {
            return Err(Condition::abort(anyhow!(
                "build PipelineRun {} failed: {}",
                run.metadata.qualified_name(),
                run.failure_reason().unwrap_or_default()
            )));
        }
        if !run.is_done() {
            return Err(pending(format!("build PipelineRun {} is still running", run.name())));
        }
        Ok(run)
    }

    // =============================================================================
    // Snapshots
    // =============================================================================

    /// Waits for the snapshot created from a component's build PipelineRun
    pub async fn wait_for_snapshot(
        &self,
        namespace: &str,
        application: &str,
        component: &str,
        build_run: &str,
    ) -> Result<Snapshot> {
        let snapshot = Poller::from_config(self.timeouts.snapshot)
            .until_ok(
                format!(
                    "Timed out waiting for the snapshot of {} (build {}) in {}",
                    component, build_run, namespace
                ),
                || self.check_snapshot(namespace, application, component, build_run),
            )
            .await?;

        info!(snapshot = %snapshot.name(), component = %component, "Snapshot created");
        Ok(snapshot)
    }

    async fn check_snapshot(
        &self,
        namespace: &str,
        application: &str,
        component: &str,
        build_run: &str,
    ) -> Check<Snapshot> {
        let snapshots = self
            .cluster
            .list_snapshots(namespace, application)
            .await
            .context("Failed to list snapshots")?;

        snapshots
            .into_iter()
            .find(|s| {
                !s.is_group()
                    && s.component() == Some(component)
                    && s.build_pipeline_run() == Some(build_run)
            })
            .ok_or_else(|| pending(format!("no snapshot for build {} yet", build_run)))
    }

    /// Waits for at least one group snapshot of the application, newest first
    pub async fn wait_for_group_snapshots(
        &self,
        namespace: &str,
        application: &str,
    ) -> Result<Vec<Snapshot>> {
        let snapshots = Poller::from_config(self.timeouts.group_snapshot)
            .until_ok("timeout while waiting for group snapshot", || {
                self.check_group_snapshots(namespace, application)
            })
            .await?;

        info!(count = snapshots.len(), application = %application, "Group snapshots found");
        Ok(snapshots)
    }

    async fn check_group_snapshots(&self, namespace: &str, application: &str) -> Check<Vec<Snapshot>> {
        let snapshots = self
            .cluster
            .list_snapshots(namespace, application)
            .await
            .context("Failed to get all group snapshots")?;

        let mut groups: Vec<Snapshot> = snapshots.into_iter().filter(Snapshot::is_group).collect();
        if groups.is_empty() {
            return Err(pending("No group snapshot exists at the moment".to_string()));
        }

        groups.sort_by(|a, b| {
            b.metadata
                .creation_timestamp
                .cmp(&a.metadata.creation_timestamp)
        });
        Ok(groups)
    }

    // =============================================================================
    // Integration PipelineRuns
    // =============================================================================

    /// Waits for the integration PipelineRun of a scenario against a snapshot
    pub async fn wait_for_integration_run(
        &self,
        namespace: &str,
        scenario: &str,
        snapshot: &str,
    ) -> Result<PipelineRun> {
        let run = Poller::from_config(self.timeouts.integration_run)
            .until_ok(
                format!(
                    "Timed out waiting for integration PipelineRun of scenario {} for snapshot {}/{}",
                    scenario, namespace, snapshot
                ),
                || self.check_integration_run(namespace, scenario, snapshot, false),
            )
            .await?;

        info!(pipeline_run = %run.name(), snapshot = %snapshot, "Integration PipelineRun found");
        Ok(run)
    }

    /// Waits until that integration PipelineRun has started
    pub async fn wait_for_integration_started(
        &self,
        namespace: &str,
        scenario: &str,
        snapshot: &str,
    ) -> Result<PipelineRun> {
        let run = Poller::from_config(self.timeouts.integration_start)
            .until_ok(
                format!(
                    "Timed out waiting for Integration PipelineRun to start for snapshot {}/{}",
                    namespace, snapshot
                ),
                || self.check_integration_run(namespace, scenario, snapshot, true),
            )
            .await?;

        info!(pipeline_run = %run.name(), "Integration PipelineRun started");
        Ok(run)
    }

    async fn check_integration_run(
        &self,
        namespace: &str,
        scenario: &str,
        snapshot: &str,
        started: bool,
    ) -> Check<PipelineRun> {
        let query = PipelineRunQuery::integration(scenario, snapshot);
        let runs = self
            .cluster
            .list_pipeline_runs(namespace, &query)
            .await
            .context("Failed to list integration PipelineRuns")?;

        let run = newest(runs).ok_or_else(|| {
            pending(format!(
                "integration PipelineRun for snapshot {} hasn't been created yet",
                snapshot
            ))
        })?;

        if started && !run.has_started() {
            return Err(pending(format!(
                "integration PipelineRun {} hasn't started yet",
                run.metadata.qualified_name()
            )));
        }
        Ok(run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeBackend, fast_timeouts};
    use gantry_core::dto::ComponentSpec;

    async fn platform_with_component(cluster: &Arc<FakeBackend>) -> Platform {
        cluster
            .create_component("ns", &ComponentSpec::new("comp", "app", "https://x/y", "main"))
            .await
            .unwrap();
        Platform::new(cluster.clone(), fast_timeouts())
    }

    #[tokio::test(start_paused = true)]
    async fn test_build_started_waits_for_run() {
        let cluster = Arc::new(FakeBackend::new());
        let platform = platform_with_component(&cluster).await;

        let run = platform.wait_for_build_started("ns", "comp", "app").await.unwrap();

        assert!(run.has_started());
        assert_eq!(run.component(), Some("comp"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_build_started_times_out_without_component() {
        let cluster = Arc::new(FakeBackend::new());
        let platform = Platform::new(cluster, fast_timeouts());

        let err = platform
            .wait_for_build_started("ns", "missing", "app")
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Timed out waiting for build PipelineRun for ns/missing"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_build_is_rebuilt() {
        let cluster = Arc::new(FakeBackend::new());
        cluster.fail_builds("comp", 1);
        let platform = platform_with_component(&cluster).await;

        let first = platform.wait_for_build_started("ns", "comp", "app").await.unwrap();
        let finished = platform
            .wait_for_pipeline_finished("ns", "comp", "app", &first, 2)
            .await
            .unwrap();

        assert!(finished.succeeded());
        assert_ne!(finished.name(), first.name());
        assert_eq!(cluster.build_requests("comp"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_build_without_retries() {
        let cluster = Arc::new(FakeBackend::new());
        cluster.fail_builds("comp", 5);
        let platform = platform_with_component(&cluster).await;

        let first = platform.wait_for_build_started("ns", "comp", "app").await.unwrap();
        let err = platform
            .wait_for_pipeline_finished("ns", "comp", "app", &first, 1)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("failed after 1 rebuild(s)"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_latest_build_failure_aborts_immediately() {
        let cluster = Arc::new(FakeBackend::new());
        cluster.fail_builds("comp", 1);
        let platform = platform_with_component(&cluster).await;
        platform.wait_for_build_started("ns", "comp", "app").await.unwrap();
        cluster.complete_all_runs();

        let start = tokio::time::Instant::now();
        let err = platform
            .wait_for_latest_build_finished("ns", "comp", "app", None)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("failed"));
        assert!(start.elapsed() < platform.timeouts().build_finish.timeout);
    }

    #[test]
    fn test_newest_prefers_latest_creation() {
        let run = |name: &str, ts: &str| -> PipelineRun {
            serde_json::from_value(serde_json::json!({
                "metadata": { "name": name, "creationTimestamp": ts }
            }))
            .unwrap()
        };

        let picked = newest(vec![
            run("a", "2026-01-05T10:00:00Z"),
            run("c", "2026-01-05T12:00:00Z"),
            run("b", "2026-01-05T11:00:00Z"),
        ])
        .unwrap();

        assert_eq!(picked.name(), "c");
        assert!(newest(vec![]).is_none());
    }
}
