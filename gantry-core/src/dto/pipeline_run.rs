//! PipelineRun lookup filter

use crate::labels;

/// Label filter for PipelineRun listings
///
/// Every field that is set narrows the query with an exact label match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineRunQuery {
    pub component: Option<String>,
    pub application: Option<String>,
    pub pipeline_type: Option<String>,
    pub sha: Option<String>,
    pub snapshot: Option<String>,
    pub scenario: Option<String>,
}

impl PipelineRunQuery {
    /// Build runs of a component in an application
    pub fn build(component: impl Into<String>, application: impl Into<String>) -> Self {
        Self {
            component: Some(component.into()),
            application: Some(application.into()),
            pipeline_type: Some(labels::PIPELINE_TYPE_BUILD.to_string()),
            ..Default::default()
        }
    }

    /// Integration runs of a scenario against a snapshot
    pub fn integration(scenario: impl Into<String>, snapshot: impl Into<String>) -> Self {
        Self {
            pipeline_type: Some(labels::PIPELINE_TYPE_TEST.to_string()),
            snapshot: Some(snapshot.into()),
            scenario: Some(scenario.into()),
            ..Default::default()
        }
    }

    /// Restricts the query to runs triggered for a commit
    pub fn with_sha(mut self, sha: Option<&str>) -> Self {
        self.sha = sha.filter(|s| !s.is_empty()).map(str::to_string);
        self
    }

    /// Label selector pairs, in a stable order
    pub fn selectors(&self) -> Vec<(&'static str, &str)> {
        [
            (labels::COMPONENT_LABEL, &self.component),
            (labels::APPLICATION_LABEL, &self.application),
            (labels::PIPELINE_TYPE_LABEL, &self.pipeline_type),
            (labels::PAC_SHA_LABEL, &self.sha),
            (labels::SNAPSHOT_LABEL, &self.snapshot),
            (labels::SCENARIO_LABEL, &self.scenario),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_deref().map(|v| (key, v)))
        .collect()
    }

    /// Kubernetes label selector string (`k1=v1,k2=v2`)
    pub fn label_selector(&self) -> String {
        self.selectors()
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Whether a set of labels satisfies the query
    pub fn matches(&self, labels: &std::collections::BTreeMap<String, String>) -> bool {
        self.selectors()
            .iter()
            .all(|(k, v)| labels.get(*k).map(String::as_str) == Some(*v))
    }
}
