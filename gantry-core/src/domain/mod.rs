//! Core domain types
//!
//! Views of the resources owned by the external collaborators: the
//! application/component controller, the integration service, Tekton and
//! GitHub. Only the fields the suite inspects are modelled; everything else
//! in the payloads is ignored on deserialization.

pub mod application;
pub mod meta;
pub mod pipeline_run;
pub mod snapshot;
pub mod source;

pub use application::{Application, Component, ComponentSource, IntegrationTestScenario};
pub use meta::ObjectMeta;
pub use pipeline_run::{ConditionStatus, PipelineRun, PipelineRunCondition};
pub use snapshot::{Snapshot, SnapshotComponent};
pub use source::{CheckRun, CheckRunConclusion, FileCommit, GitRef, MergeResult, PullRequest};
