//! The assembled pipeline, stored as the pipeline resource's config.

use crate::phases::PhaseActionSpec;
use serde::{Deserialize, Serialize};

/// Every phase action of one pipeline, in run order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineDefinition {
    /// Pipeline resource name, `{app}-{pipeline}`.
    pub name: String,
    /// Role the pipeline runs as.
    pub role_arn: String,
    /// Bucket artifacts are passed through.
    pub artifact_bucket: String,
    /// One action per phase.
    pub actions: Vec<PhaseActionSpec>,
}

impl PipelineDefinition {
    /// The action for a phase.
    #[must_use]
    pub fn action(&self, phase_name: &str) -> Option<&PhaseActionSpec> {
        self.actions.iter().find(|action| action.name == phase_name)
    }
}
