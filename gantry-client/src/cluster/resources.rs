//! API resources of the platform's custom resource kinds

use kube::discovery::ApiResource;

fn resource(group: &str, version: &str, kind: &str, plural: &str) -> ApiResource {
    ApiResource {
        group: group.to_string(),
        version: version.to_string(),
        api_version: format!("{}/{}", group, version),
        kind: kind.to_string(),
        plural: plural.to_string(),
    }
}

pub(super) fn application() -> ApiResource {
    resource("appstudio.redhat.com", "v1alpha1", "Application", "applications")
}

pub(super) fn component() -> ApiResource {
    resource("appstudio.redhat.com", "v1alpha1", "Component", "components")
}

pub(super) fn snapshot() -> ApiResource {
    resource("appstudio.redhat.com", "v1alpha1", "Snapshot", "snapshots")
}

pub(super) fn integration_test_scenario() -> ApiResource {
    resource(
        "appstudio.redhat.com",
        "v1beta2",
        "IntegrationTestScenario",
        "integrationtestscenarios",
    )
}

pub(super) fn pipeline_run() -> ApiResource {
    resource("tekton.dev", "v1", "PipelineRun", "pipelineruns")
}
