//! Snapshot view

use serde::{Deserialize, Serialize};

use super::meta::ObjectMeta;
use crate::labels;

/// Set of component images the integration service tests together
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: SnapshotSpec,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotSpec {
    #[serde(default)]
    pub application: String,
    #[serde(default)]
    pub components: Vec<SnapshotComponent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotComponent {
    pub name: String,
    #[serde(default)]
    pub container_image: String,
}

impl Snapshot {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn is_group(&self) -> bool {
        self.metadata.label(labels::SNAPSHOT_TYPE_LABEL) == Some(labels::SNAPSHOT_TYPE_GROUP)
    }

    pub fn component(&self) -> Option<&str> {
        self.metadata.label(labels::COMPONENT_LABEL)
    }

    /// Build PipelineRun this snapshot was created from
    ///
    /// The integration service writes it as an annotation; older releases
    /// used a label, so both are checked.
    pub fn build_pipeline_run(&self) -> Option<&str> {
        self.metadata
            .annotation(labels::BUILD_PIPELINE_RUN_LABEL)
            .or_else(|| self.metadata.label(labels::BUILD_PIPELINE_RUN_LABEL))
    }

    pub fn group_test_info(&self) -> Option<&str> {
        self.metadata.annotation(labels::GROUP_TEST_INFO_ANNOTATION)
    }
}
