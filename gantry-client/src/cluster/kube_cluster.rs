//! Kubernetes-backed [`Cluster`]
//!
//! Custom resources are handled as `DynamicObject`s and decoded into the
//! read-only views of `gantry_core::domain`.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, DeleteParams, DynamicObject, ListParams, Patch, PatchParams, PostParams};
use kube::discovery::ApiResource;
use kube::{Client, ResourceExt};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{debug, info};

use gantry_core::domain::{Application, Component, IntegrationTestScenario, PipelineRun, Snapshot};
use gantry_core::dto::{ComponentSpec, PipelineRunQuery, ScenarioSpec};
use gantry_core::labels;

use super::{Cluster, resources};
use crate::error::{ClientError, Result};
use crate::names;

/// Label marking namespaces created by the suite
const E2E_NAMESPACE_LABEL: &str = "gantry.dev/e2e";

/// Cluster client talking to the Kubernetes API server
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connects using the ambient kubeconfig or in-cluster configuration
    pub async fn try_default() -> Result<Self> {
        let client = Client::try_default().await?;
        Ok(Self::new(client))
    }

    fn api(&self, namespace: &str, resource: &ApiResource) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, resource)
    }

    async fn create_object<T: DeserializeOwned>(
        &self,
        namespace: &str,
        resource: &ApiResource,
        obj: DynamicObject,
    ) -> Result<T> {
        let created = self
            .api(namespace, resource)
            .create(&PostParams::default(), &obj)
            .await?;

        info!(
            kind = %resource.kind,
            name = %created.name_any(),
            namespace = %namespace,
            "Created resource"
        );

        decode(created)
    }

    async fn delete_object(&self, namespace: &str, resource: &ApiResource, name: &str) -> Result<()> {
        self.api(namespace, resource)
            .delete(name, &DeleteParams::default())
            .await?;

        debug!(kind = %resource.kind, name = %name, namespace = %namespace, "Deleted resource");
        Ok(())
    }
}

/// Re-reads a dynamic object as one of the typed views
fn decode<T: DeserializeOwned>(obj: DynamicObject) -> Result<T> {
    let value = serde_json::to_value(obj)?;
    serde_json::from_value(value).map_err(|e| ClientError::ParseError(e.to_string()))
}

fn component_object(resource: &ApiResource, namespace: &str, spec: &ComponentSpec) -> DynamicObject {
    let mut obj = DynamicObject::new(&spec.name, resource)
        .within(namespace)
        .data(json!({
            "spec": {
                "componentName": spec.name,
                "application": spec.application,
                "source": {
                    "git": {
                        "url": spec.git_url,
                        "revision": spec.revision,
                        "context": spec.context_dir,
                        "dockerfileUrl": spec.dockerfile,
                    }
                }
            }
        }));

    let pipeline = json!({ "name": spec.build_pipeline, "bundle": "latest" }).to_string();
    obj.metadata.annotations = Some(BTreeMap::from([
        (
            labels::BUILD_REQUEST_ANNOTATION.to_string(),
            labels::BUILD_REQUEST_CONFIGURE_PAC.to_string(),
        ),
        (labels::BUILD_PIPELINE_ANNOTATION.to_string(), pipeline),
    ]));
    obj
}

fn scenario_object(
    resource: &ApiResource,
    namespace: &str,
    name: &str,
    application: &str,
    spec: &ScenarioSpec,
) -> DynamicObject {
    let mut body = json!({
        "application": application,
        "resolverRef": {
            "resolver": "git",
            "params": [
                { "name": "url", "value": spec.git_url },
                { "name": "revision", "value": spec.revision },
                { "name": "pathInRepo", "value": spec.path_in_repo },
            ]
        }
    });

    if !spec.contexts.is_empty() {
        body["contexts"] = spec
            .contexts
            .iter()
            .map(|c| json!({ "name": c, "description": format!("{} context", c) }))
            .collect();
    }

    DynamicObject::new(name, resource)
        .within(namespace)
        .data(json!({ "spec": body }))
}

#[async_trait]
impl Cluster for KubeCluster {
    async fn create_namespace(&self, prefix: &str) -> Result<String> {
        let name = names::generate_name(prefix);
        let namespace = Namespace {
            metadata: ObjectMeta {
                name: Some(name.clone()),
                labels: Some(BTreeMap::from([(
                    E2E_NAMESPACE_LABEL.to_string(),
                    "true".to_string(),
                )])),
                ..Default::default()
            },
            ..Default::default()
        };

        let api: Api<Namespace> = Api::all(self.client.clone());
        api.create(&PostParams::default(), &namespace).await?;

        info!(namespace = %name, "Created namespace");
        Ok(name)
    }

    async fn delete_namespace(&self, name: &str) -> Result<()> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        api.delete(name, &DeleteParams::default()).await?;

        info!(namespace = %name, "Deleted namespace");
        Ok(())
    }

    async fn create_application(&self, namespace: &str, name: &str) -> Result<Application> {
        let ar = resources::application();
        let obj = DynamicObject::new(name, &ar)
            .within(namespace)
            .data(json!({ "spec": { "displayName": name } }));

        self.create_object(namespace, &ar, obj).await
    }

    async fn delete_application(&self, namespace: &str, name: &str) -> Result<()> {
        self.delete_object(namespace, &resources::application(), name)
            .await
    }

    async fn create_component(&self, namespace: &str, spec: &ComponentSpec) -> Result<Component> {
        let ar = resources::component();
        let obj = component_object(&ar, namespace, spec);

        self.create_object(namespace, &ar, obj).await
    }

    async fn get_component(&self, namespace: &str, name: &str) -> Result<Component> {
        let obj = self.api(namespace, &resources::component()).get(name).await?;
        decode(obj)
    }

    async fn delete_component(&self, namespace: &str, name: &str) -> Result<()> {
        self.delete_object(namespace, &resources::component(), name)
            .await
    }

    async fn request_build(&self, namespace: &str, component: &str) -> Result<()> {
        let patch = json!({
            "metadata": {
                "annotations": {
                    (labels::BUILD_REQUEST_ANNOTATION): labels::BUILD_REQUEST_TRIGGER_PAC
                }
            }
        });

        self.api(namespace, &resources::component())
            .patch(component, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;

        info!(component = %component, namespace = %namespace, "Requested PaC build");
        Ok(())
    }

    async fn create_integration_test_scenario(
        &self,
        namespace: &str,
        application: &str,
        spec: &ScenarioSpec,
    ) -> Result<IntegrationTestScenario> {
        if spec.git_url.is_empty() || spec.path_in_repo.is_empty() {
            return Err(ClientError::InvalidRequest(
                "integration test scenario needs a git url and a path".to_string(),
            ));
        }

        let ar = resources::integration_test_scenario();
        let name = spec
            .name
            .clone()
            .unwrap_or_else(|| names::generate_name("my-integration-test"));
        let obj = scenario_object(&ar, namespace, &name, application, spec);

        self.create_object(namespace, &ar, obj).await
    }

    async fn delete_integration_test_scenario(&self, namespace: &str, name: &str) -> Result<()> {
        self.delete_object(namespace, &resources::integration_test_scenario(), name)
            .await
    }

    async fn list_pipeline_runs(
        &self,
        namespace: &str,
        query: &PipelineRunQuery,
    ) -> Result<Vec<PipelineRun>> {
        let selector = query.label_selector();
        let params = if selector.is_empty() {
            ListParams::default()
        } else {
            ListParams::default().labels(&selector)
        };

        let list = self
            .api(namespace, &resources::pipeline_run())
            .list(&params)
            .await?;

        debug!(
            namespace = %namespace,
            selector = %selector,
            count = list.items.len(),
            "Listed PipelineRuns"
        );

        list.items.into_iter().map(decode::<PipelineRun>).collect()
    }

    async fn list_snapshots(&self, namespace: &str, application: &str) -> Result<Vec<Snapshot>> {
        let list = self
            .api(namespace, &resources::snapshot())
            .list(&ListParams::default())
            .await?;

        let snapshots = list
            .items
            .into_iter()
            .map(decode::<Snapshot>)
            .collect::<Result<Vec<_>>>()?;

        Ok(snapshots
            .into_iter()
            .filter(|s| s.spec.application == application)
            .collect())
    }

    async fn delete_snapshot(&self, namespace: &str, name: &str) -> Result<()> {
        self.delete_object(namespace, &resources::snapshot(), name)
            .await
    }
}
