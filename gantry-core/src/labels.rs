//! Well-known labels and annotations
//!
//! Keys written by the platform controllers on PipelineRuns, Snapshots and
//! Components. The suite only reads them, except for the build request
//! annotation it writes on components.

/// Component a PipelineRun or Snapshot belongs to
pub const COMPONENT_LABEL: &str = "appstudio.openshift.io/component";

/// Application a PipelineRun or Snapshot belongs to
pub const APPLICATION_LABEL: &str = "appstudio.openshift.io/application";

/// Kind of pipeline (`build` or `test`)
pub const PIPELINE_TYPE_LABEL: &str = "pipelines.appstudio.openshift.io/type";

pub const PIPELINE_TYPE_BUILD: &str = "build";
pub const PIPELINE_TYPE_TEST: &str = "test";

/// Commit sha a Pipelines-as-Code run was triggered for
pub const PAC_SHA_LABEL: &str = "pipelinesascode.tekton.dev/sha";

/// Snapshot an integration PipelineRun is testing
pub const SNAPSHOT_LABEL: &str = "appstudio.openshift.io/snapshot";

/// IntegrationTestScenario an integration PipelineRun was started from
pub const SCENARIO_LABEL: &str = "test.appstudio.openshift.io/scenario";

/// Build PipelineRun a Snapshot was created from
pub const BUILD_PIPELINE_RUN_LABEL: &str = "appstudio.openshift.io/build-pipelinerun";

/// Snapshot type; group snapshots carry [`SNAPSHOT_TYPE_GROUP`]
pub const SNAPSHOT_TYPE_LABEL: &str = "test.appstudio.openshift.io/type";

pub const SNAPSHOT_TYPE_GROUP: &str = "group";

/// Summary of the components and build runs aggregated in a group snapshot
pub const GROUP_TEST_INFO_ANNOTATION: &str = "test.appstudio.openshift.io/group-test-info";

/// Request annotation read by the build service on components
pub const BUILD_REQUEST_ANNOTATION: &str = "build.appstudio.openshift.io/request";

/// Ask the build service to open the Pipelines-as-Code onboarding PR
pub const BUILD_REQUEST_CONFIGURE_PAC: &str = "configure-pac";

/// Ask the build service to re-run the PaC build of a component
pub const BUILD_REQUEST_TRIGGER_PAC: &str = "trigger-pac-build";

/// Build pipeline selection on components
pub const BUILD_PIPELINE_ANNOTATION: &str = "build.appstudio.openshift.io/pipeline";

/// Suffix of the check run PaC reports for pull request builds
pub const PULL_REQUEST_CHECK_SUFFIX: &str = "on-pull-request";
