//! IntegrationTestScenario creation request

use serde::{Deserialize, Serialize};

/// Integration test pipeline resolved from git
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSpec {
    /// Name of the scenario; generated when empty
    pub name: Option<String>,
    pub git_url: String,
    pub revision: String,
    pub path_in_repo: String,
    /// Environment contexts the scenario applies to; all when empty
    pub contexts: Vec<String>,
}
