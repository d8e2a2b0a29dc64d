//! Tekton PipelineRun view

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::meta::ObjectMeta;
use crate::labels;

/// PipelineRun as reported by Tekton
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub status: PipelineRunStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRunStatus {
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completion_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub conditions: Vec<PipelineRunCondition>,
}

/// Status condition (only `Succeeded` is meaningful for PipelineRuns)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRunCondition {
    #[serde(rename = "type")]
    pub condition_type: String,
    pub status: ConditionStatus,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl PipelineRun {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn has_started(&self) -> bool {
        self.status.start_time.is_some()
    }

    fn succeeded_condition(&self) -> Option<&PipelineRunCondition> {
        self.status
            .conditions
            .iter()
            .find(|c| c.condition_type == "Succeeded")
    }

    /// Done once the `Succeeded` condition is no longer `Unknown`
    pub fn is_done(&self) -> bool {
        matches!(
            self.succeeded_condition().map(|c| c.status),
            Some(ConditionStatus::True | ConditionStatus::False)
        )
    }

    pub fn succeeded(&self) -> bool {
        self.succeeded_condition()
            .is_some_and(|c| c.status == ConditionStatus::True)
    }

    pub fn failed(&self) -> bool {
        self.succeeded_condition()
            .is_some_and(|c| c.status == ConditionStatus::False)
    }

    /// Reason and message of a failed run, for diagnostics
    pub fn failure_reason(&self) -> Option<String> {
        let condition = self.succeeded_condition()?;
        if condition.status != ConditionStatus::False {
            return None;
        }
        Some(format!(
            "{}: {}",
            condition.reason.as_deref().unwrap_or("Failed"),
            condition.message.as_deref().unwrap_or("no message")
        ))
    }

    pub fn component(&self) -> Option<&str> {
        self.metadata.label(labels::COMPONENT_LABEL)
    }

    pub fn snapshot(&self) -> Option<&str> {
        self.metadata.label(labels::SNAPSHOT_LABEL)
    }

    pub fn scenario(&self) -> Option<&str> {
        self.metadata.label(labels::SCENARIO_LABEL)
    }
}
