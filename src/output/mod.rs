//! Pipeline definitions: schema, assembly from workflows, and rendering of
//! resolved substitutions into a stored config body.

mod builder;
mod render;
pub mod schema;

pub use builder::{
    ConfigBuilder, DEFAULT_STEP_LIB_SOURCE, DEPLOY_WORKFLOW, FORMAT_VERSION, PRIMARY_WORKFLOW,
};
pub use render::{render_config, render_definition};
pub use schema::{AppSection, PipelineDefinition, TriggerMapItem, Workflow};
