//! Application, Component and IntegrationTestScenario views

use serde::{Deserialize, Serialize};

use super::meta::ObjectMeta;

/// Application grouping a set of components
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub metadata: ObjectMeta,
}

/// Component built from a git repository
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ComponentSpecView,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSpecView {
    #[serde(default)]
    pub component_name: String,
    #[serde(default)]
    pub application: String,
    #[serde(default)]
    pub source: ComponentSourceView,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComponentSourceView {
    #[serde(default)]
    pub git: Option<ComponentSource>,
}

/// Git source of a component
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSource {
    pub url: String,
    #[serde(default)]
    pub revision: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub dockerfile_url: Option<String>,
}

impl Component {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn git_source(&self) -> Option<&ComponentSource> {
        self.spec.source.git.as_ref()
    }
}

/// Scenario the integration service runs against every new snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationTestScenario {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ScenarioSpecView,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioSpecView {
    #[serde(default)]
    pub application: String,
}

impl IntegrationTestScenario {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }
}
