//! Realized pipeline actions.

use super::PhaseContext;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The pipeline stage category an action belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionCategory {
    /// Pulls source code.
    Source,
    /// Compiles or packages.
    Build,
    /// Runs tests.
    Test,
    /// Deploys.
    Deploy,
    /// Waits for a human.
    Approval,
    /// Invokes a function.
    Invoke,
}

/// One action of the pipeline definition, produced by a phase deployer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseActionSpec {
    /// Action name (the phase name).
    pub name: String,
    /// Stage category.
    pub category: ActionCategory,
    /// Action owner (`AWS`, `ThirdParty` or `Custom`).
    pub owner: String,
    /// Action provider (e.g. `GitHub`, `CodeBuild`).
    pub provider: String,
    /// Provider action version.
    pub version: String,
    /// Artifacts consumed.
    #[serde(default)]
    pub input_artifacts: Vec<String>,
    /// Artifacts produced.
    #[serde(default)]
    pub output_artifacts: Vec<String>,
    /// Provider-specific configuration.
    #[serde(default)]
    pub configuration: BTreeMap<String, String>,
    /// 1-based position in the pipeline.
    pub run_order: usize,
}

impl PhaseActionSpec {
    /// Creates an action for a phase, wired to the phase's artifacts and position.
    #[must_use]
    pub fn for_phase(
        ctx: &PhaseContext,
        category: ActionCategory,
        owner: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            name: ctx.phase_name.clone(),
            category,
            owner: owner.into(),
            provider: provider.into(),
            version: "1".to_string(),
            input_artifacts: ctx.input_artifact.iter().cloned().collect(),
            output_artifacts: ctx.output_artifact.iter().cloned().collect(),
            configuration: BTreeMap::new(),
            run_order: ctx.position,
        }
    }

    /// Adds a configuration entry.
    #[must_use]
    pub fn with_configuration(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.configuration.insert(key.into(), value.into());
        self
    }

    /// Forces the name, position and artifacts to match `ctx`.
    ///
    /// An action without inputs keeps none.
    #[must_use]
    pub fn wired_to(mut self, ctx: &PhaseContext) -> Self {
        self.name.clone_from(&ctx.phase_name);
        self.run_order = ctx.position;
        if !self.input_artifacts.is_empty() {
            self.input_artifacts = ctx.input_artifact.iter().cloned().collect();
        }
        self.output_artifacts = ctx.output_artifact.iter().cloned().collect();
        self
    }

    /// Drops the input artifacts. Approval actions take none.
    #[must_use]
    pub fn without_inputs(mut self) -> Self {
        self.input_artifacts.clear();
        self
    }
}
