//! Cluster collaborator
//!
//! The application/component controller, the integration service and Tekton
//! all live behind one Kubernetes API. [`Cluster`] is the narrow view the
//! suite needs of them; [`KubeCluster`] implements it against a real cluster.

mod kube_cluster;
mod resources;

pub use kube_cluster::KubeCluster;

use async_trait::async_trait;
use gantry_core::domain::{Application, Component, IntegrationTestScenario, PipelineRun, Snapshot};
use gantry_core::dto::{ComponentSpec, PipelineRunQuery, ScenarioSpec};

use crate::error::Result;

/// Operations on the CI platform's custom resources
#[async_trait]
pub trait Cluster: Send + Sync {
    /// Creates a namespace named `<prefix>-<random>` and returns its name
    async fn create_namespace(&self, prefix: &str) -> Result<String>;

    async fn delete_namespace(&self, name: &str) -> Result<()>;

    async fn create_application(&self, namespace: &str, name: &str) -> Result<Application>;

    async fn delete_application(&self, namespace: &str, name: &str) -> Result<()>;

    /// Creates a component and asks the build service to onboard it with a PaC PR
    async fn create_component(&self, namespace: &str, spec: &ComponentSpec) -> Result<Component>;

    async fn get_component(&self, namespace: &str, name: &str) -> Result<Component>;

    async fn delete_component(&self, namespace: &str, name: &str) -> Result<()>;

    /// Asks the build service to re-run the PaC build of a component
    async fn request_build(&self, namespace: &str, component: &str) -> Result<()>;

    async fn create_integration_test_scenario(
        &self,
        namespace: &str,
        application: &str,
        spec: &ScenarioSpec,
    ) -> Result<IntegrationTestScenario>;

    async fn delete_integration_test_scenario(&self, namespace: &str, name: &str) -> Result<()>;

    async fn list_pipeline_runs(
        &self,
        namespace: &str,
        query: &PipelineRunQuery,
    ) -> Result<Vec<PipelineRun>>;

    /// Snapshots of an application, component and group ones alike
    async fn list_snapshots(&self, namespace: &str, application: &str) -> Result<Vec<Snapshot>>;

    async fn delete_snapshot(&self, namespace: &str, name: &str) -> Result<()>;
}
