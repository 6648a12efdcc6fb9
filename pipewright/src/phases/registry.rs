//! Type tag to [`PhaseDeployer`] lookup.

use super::builtin::{
    ApprovalPhase, CodeBuildPhase, CodeCommitPhase, GitHubPhase, HandelPhase, RunscopePhase,
};
use super::{PhaseDeployer, PhaseSpec};
use crate::errors::{codes, ContractErrorInfo, ErrorSuggestions, ValidationError};
use crate::orchestrator::EnvironmentOrchestrator;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Maps phase type tags to deployers. Built once, then shared read-only.
#[derive(Clone, Default)]
pub struct PhaseDeployerRegistry {
    deployers: BTreeMap<String, Arc<dyn PhaseDeployer>>,
}

impl fmt::Debug for PhaseDeployerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseDeployerRegistry")
            .field("types", &self.types())
            .finish()
    }
}

impl PhaseDeployerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in phase type.
    ///
    /// `environments` provisions the `extra_resources` of build and deploy phases.
    #[must_use]
    pub fn builtin(environments: Arc<EnvironmentOrchestrator>) -> Self {
        Self::new()
            .with("approval", Arc::new(ApprovalPhase))
            .with("codebuild", Arc::new(CodeBuildPhase::new(Arc::clone(&environments))))
            .with("codecommit", Arc::new(CodeCommitPhase))
            .with("github", Arc::new(GitHubPhase))
            .with("handel", Arc::new(HandelPhase::new(environments)))
            .with("runscope", Arc::new(RunscopePhase))
    }

    /// Registers a deployer, replacing any previous one for the tag.
    #[must_use]
    pub fn with(mut self, phase_type: impl Into<String>, deployer: Arc<dyn PhaseDeployer>) -> Self {
        self.register(phase_type, deployer);
        self
    }

    /// Registers a deployer in place.
    pub fn register(&mut self, phase_type: impl Into<String>, deployer: Arc<dyn PhaseDeployer>) {
        self.deployers.insert(phase_type.into(), deployer);
    }

    /// Looks a deployer up.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for an unknown tag.
    pub fn get(&self, phase_type: &str) -> Result<Arc<dyn PhaseDeployer>, ValidationError> {
        self.deployers.get(phase_type).cloned().ok_or_else(|| {
            let mut info = ContractErrorInfo::new(
                codes::UNKNOWN_TYPE,
                format!("Unsupported phase type '{phase_type}'"),
            )
            .with_context_entry("supported", self.types().join(", "));
            if let Some(hint) = ErrorSuggestions::get(codes::UNKNOWN_TYPE) {
                info = info.with_fix_hint(hint);
            }
            ValidationError::new(format!("phase type '{phase_type}' is not supported"))
                .with_subject(phase_type)
                .with_error_info(info)
        })
    }

    /// Returns true if the tag is registered.
    #[must_use]
    pub fn contains(&self, phase_type: &str) -> bool {
        self.deployers.contains_key(phase_type)
    }

    /// Registered tags, sorted.
    #[must_use]
    pub fn types(&self) -> Vec<String> {
        self.deployers.keys().cloned().collect()
    }

    /// One error per phase whose type is not registered.
    #[must_use]
    pub fn validate_types(&self, phases: &[PhaseSpec]) -> Vec<ValidationError> {
        phases
            .iter()
            .filter_map(|phase| {
                self.get(&phase.phase_type).err().map(|err| ValidationError {
                    message: format!("phase '{}': {}", phase.name, err.message),
                    subjects: vec![phase.name.clone(), phase.phase_type.clone()],
                    error_info: err.error_info,
                })
            })
            .collect()
    }
}
