//! Setup, skip conditions and cleanup

use anyhow::{Context, Result};
use gantry_client::names::generate_name;
use gantry_core::dto::ScenarioSpec;
use std::net::IpAddr;
use tracing::{info, warn};

use super::GroupSnapshotScenario;
use crate::context::ScenarioContext;

impl GroupSnapshotScenario {
    /// Why the scenario cannot run in this environment, if it cannot
    pub(super) async fn skip_reason(&self) -> Option<String> {
        if self.config.skip_pac_tests {
            return Some("Skipping this test due to configuration issue with Spray proxy".to_string());
        }

        if let Some(host) = &self.config.console_host {
            if is_private_hostname(host).await {
                return Some(format!(
                    "Using private cluster ({}), not reachable from GitHub",
                    host
                ));
            }
        }

        None
    }

    pub(super) async fn create_application(&self, ctx: &mut ScenarioContext) -> Result<()> {
        let namespace = self
            .cluster()
            .create_namespace(&self.config.namespace_prefix)
            .await
            .context("Failed to create namespace")?;
        ctx.namespace = Some(namespace.clone());

        let name = generate_name(&format!("{}-app", self.config.namespace_prefix));
        let application = self
            .cluster()
            .create_application(&namespace, &name)
            .await
            .with_context(|| format!("Failed to create application {}", name))?;

        info!(namespace = %namespace, application = %application.metadata.name, "Created application");
        ctx.application = Some(application.metadata.name);
        Ok(())
    }

    pub(super) async fn create_base_branches(&self, ctx: &mut ScenarioContext) -> Result<()> {
        let repos = [
            (&self.config.monorepo, self.config.monorepo_revision.as_deref()),
            (&self.config.multi_repo, self.config.multi_repo_revision.as_deref()),
        ];

        for (repo, revision) in repos {
            self.source
                .create_ref(repo, &self.config.default_branch, revision, &ctx.base_branch)
                .await
                .with_context(|| format!("Failed to create branch {} in {}", ctx.base_branch, repo))?;
            info!(repo = %repo, branch = %ctx.base_branch, "Created base branch");
        }
        Ok(())
    }

    pub(super) async fn create_test_scenario(&self, ctx: &mut ScenarioContext) -> Result<()> {
        let (namespace, application) = ctx.target()?;
        let source = &self.config.test_source;
        let spec = ScenarioSpec {
            name: None,
            git_url: source.git_url.clone(),
            revision: source.revision.clone(),
            path_in_repo: source.path_in_repo.clone(),
            contexts: Vec::new(),
        };

        let scenario = self
            .cluster()
            .create_integration_test_scenario(&namespace, &application, &spec)
            .await
            .context("Failed to create IntegrationTestScenario")?;

        info!(scenario = %scenario.name(), application = %application, "Created IntegrationTestScenario");
        ctx.test_scenario = Some(scenario);
        Ok(())
    }

    /// Deletes what the run created
    ///
    /// Cluster resources survive a failed run; branches never do.
    pub(super) async fn cleanup(&self, ctx: &ScenarioContext) {
        if ctx.failed {
            warn!(namespace = ?ctx.namespace, "Keeping cluster resources of the failed run");
        } else if let Ok((namespace, application)) = ctx.target() {
            self.delete_resources(ctx, &namespace, &application).await;
        }

        self.delete_branches(ctx).await;
    }

    async fn delete_resources(&self, ctx: &ScenarioContext, namespace: &str, application: &str) {
        let cluster = self.cluster();

        for component in ctx.component_names() {
            if let Err(e) = cluster.delete_component(namespace, component).await {
                warn!(component = %component, error = %e, "Failed to delete component");
            }
        }

        match cluster.list_snapshots(namespace, application).await {
            Ok(snapshots) => {
                for snapshot in snapshots {
                    if let Err(e) = cluster.delete_snapshot(namespace, snapshot.name()).await {
                        warn!(snapshot = %snapshot.name(), error = %e, "Failed to delete snapshot");
                    }
                }
            }
            Err(e) => warn!(error = %e, "Failed to list snapshots"),
        }

        if let Some(scenario) = &ctx.test_scenario {
            if let Err(e) = cluster
                .delete_integration_test_scenario(namespace, scenario.name())
                .await
            {
                warn!(scenario = %scenario.name(), error = %e, "Failed to delete IntegrationTestScenario");
            }
        }

        if let Err(e) = cluster.delete_application(namespace, application).await {
            warn!(application = %application, error = %e, "Failed to delete application");
        }

        if let Err(e) = cluster.delete_namespace(namespace).await {
            warn!(namespace = %namespace, error = %e, "Failed to delete namespace");
        }
    }

    async fn delete_branches(&self, ctx: &ScenarioContext) {
        let monorepo = self.config.monorepo.as_str();
        let multi_repo = self.config.multi_repo.as_str();

        let branches = ctx
            .pac_branches()
            .map(|b| (monorepo, b))
            .chain([
                (monorepo, ctx.base_branch.as_str()),
                (monorepo, ctx.pr_branch.as_str()),
                (multi_repo, ctx.base_branch.as_str()),
                (multi_repo, ctx.pr_branch.as_str()),
            ]);

        for (repo, branch) in branches {
            match self.source.delete_ref(repo, branch).await {
                Ok(()) => info!(repo = %repo, branch = %branch, "Deleted branch"),
                Err(e) => warn!(repo = %repo, branch = %branch, error = %e, "Failed to delete branch"),
            }
        }
    }
}

/// Whether a host resolves to an address GitHub webhooks cannot reach
///
/// Resolution failures count as public.
pub async fn is_private_hostname(host: &str) -> bool {
    match tokio::net::lookup_host((host, 443)).await {
        Ok(mut addrs) => addrs.any(|addr| is_private_ip(addr.ip())),
        Err(e) => {
            warn!(host = %host, error = %e, "Failed to resolve console host");
            false
        }
    }
}

pub fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback() || v4.is_link_local(),
        // fc00::/7 unique local
        IpAddr::V6(v6) => v6.is_loopback() || (v6.segments()[0] & 0xfe00) == 0xfc00,
    }
}
