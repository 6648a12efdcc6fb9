//! What a phase deployer gets to work with.

use super::{PhaseSpec, SecretBundle};
use serde::Serialize;

/// Everything one phase needs to deploy or delete.
#[derive(Debug, Clone, Serialize)]
pub struct PhaseContext {
    /// The application name.
    pub app_name: String,
    /// The pipeline name.
    pub pipeline_name: String,
    /// The phase name.
    pub phase_name: String,
    /// The phase type tag.
    pub phase_type: String,
    /// Phase-specific parameters.
    pub params: serde_json::Map<String, serde_json::Value>,
    /// Secrets resolved for this phase.
    #[serde(skip)]
    pub secrets: SecretBundle,
    /// 1-based declaration position.
    pub position: usize,
    /// Artifact this phase consumes, if any.
    pub input_artifact: Option<String>,
    /// Artifact this phase produces, if any.
    pub output_artifact: Option<String>,
    /// Bucket the pipeline stores artifacts in.
    pub artifact_bucket: String,
}

impl PhaseContext {
    /// Creates a context for `phase` with no artifacts or secrets.
    #[must_use]
    pub fn new(app_name: impl Into<String>, pipeline_name: impl Into<String>, phase: &PhaseSpec) -> Self {
        Self {
            app_name: app_name.into(),
            pipeline_name: pipeline_name.into(),
            phase_name: phase.name.clone(),
            phase_type: phase.phase_type.clone(),
            params: phase.params.clone(),
            secrets: SecretBundle::new(),
            position: phase.position,
            input_artifact: None,
            output_artifact: None,
            artifact_bucket: String::new(),
        }
    }

    /// Sets the secrets.
    #[must_use]
    pub fn with_secrets(mut self, secrets: SecretBundle) -> Self {
        self.secrets = secrets;
        self
    }

    /// Sets the artifacts consumed and produced.
    #[must_use]
    pub fn with_artifacts(mut self, input: Option<String>, output: Option<String>) -> Self {
        self.input_artifact = input;
        self.output_artifact = output;
        self
    }

    /// Sets the artifact bucket.
    #[must_use]
    pub fn with_artifact_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.artifact_bucket = bucket.into();
        self
    }

    /// Stable cloud resource name for this phase: `{app}-{pipeline}-{phase}`.
    #[must_use]
    pub fn resource_name(&self) -> String {
        format!("{}-{}-{}", self.app_name, self.pipeline_name, self.phase_name)
    }

    /// Name of the pipeline this phase belongs to: `{app}-{pipeline}`.
    #[must_use]
    pub fn pipeline_resource_name(&self) -> String {
        format!("{}-{}", self.app_name, self.pipeline_name)
    }

    /// Reads a string parameter.
    #[must_use]
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(serde_json::Value::as_str)
    }
}
