//! The pipeline composer.
//!
//! - [`PipelineFile`]: the declarative input, checked by [`validate_pipeline_file`]
//! - [`PipelineComposer`]: deploys phases in order and assembles a [`PipelineDefinition`]
//! - [`SecretSource`]: where phase secrets come from

mod definition;
mod file;
mod pipeline;
mod secrets;

pub use definition::PipelineDefinition;
pub use file::{validate_pipeline_file, PipelineConfig, PipelineFile, SOURCE_PHASE_TYPES, SUPPORTED_VERSION};
pub use pipeline::{output_artifact_name, pipeline_resource_name, pipeline_role_name, PipelineComposer};
pub use secrets::{SecretPrompter, SecretSource};
