//! Component creation request

use serde::{Deserialize, Serialize};

/// Component to create from a git repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSpec {
    pub name: String,
    pub application: String,
    pub git_url: String,
    /// Branch the component builds from
    pub revision: String,
    /// Directory of the component inside the repository
    pub context_dir: Option<String>,
    /// Dockerfile path relative to the context directory
    pub dockerfile: String,
    /// Build pipeline bundle to use (`docker-build` by default)
    pub build_pipeline: String,
}

impl ComponentSpec {
    pub fn new(
        name: impl Into<String>,
        application: impl Into<String>,
        git_url: impl Into<String>,
        revision: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            application: application.into(),
            git_url: git_url.into(),
            revision: revision.into(),
            context_dir: None,
            dockerfile: "Dockerfile".to_string(),
            build_pipeline: "docker-build".to_string(),
        }
    }

    pub fn with_context_dir(mut self, context_dir: impl Into<String>) -> Self {
        self.context_dir = Some(context_dir.into());
        self
    }
}
