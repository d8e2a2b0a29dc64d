//! Requests sent to the external collaborators
//!
//! DTOs describe what the suite asks for; the client crate turns them into
//! cluster objects or REST payloads.

mod component;
mod pipeline_run;
mod scenario;

pub use component::ComponentSpec;
pub use pipeline_run::PipelineRunQuery;
pub use scenario::ScenarioSpec;
