//! Terminal outcomes of environment deploy and delete.

use super::{DeployContext, DeployStatus};
use crate::errors::PipewrightError;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Outcome of deploying an environment.
///
/// Internal errors never escape the orchestrator; they end up here with
/// `status == Failure`.
#[derive(Debug, Clone)]
pub struct EnvironmentDeployResult {
    /// Whether the deploy succeeded.
    pub status: DeployStatus,
    /// Optional human-readable message.
    pub message: Option<String>,
    /// Policies exported by every deployed service.
    pub policies: Vec<serde_json::Value>,
    /// Environment variables exported by every deployed service.
    pub environment_variables: BTreeMap<String, String>,
    /// Deploy contexts keyed by service name.
    pub deploy_contexts: BTreeMap<String, DeployContext>,
    /// The underlying error, if any.
    pub error: Option<Arc<PipewrightError>>,
}

impl EnvironmentDeployResult {
    /// Builds a success result by aggregating every deploy context.
    #[must_use]
    pub fn success(deploy_contexts: BTreeMap<String, DeployContext>) -> Self {
        let mut policies = Vec::new();
        let mut environment_variables = BTreeMap::new();
        for ctx in deploy_contexts.values() {
            policies.extend(ctx.policies.iter().cloned());
            environment_variables.extend(
                ctx.environment_variables
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone())),
            );
        }

        Self {
            status: DeployStatus::Success,
            message: None,
            policies,
            environment_variables,
            deploy_contexts,
            error: None,
        }
    }

    /// Builds a failure result with a message and optional cause.
    #[must_use]
    pub fn failure(message: impl Into<String>, error: Option<PipewrightError>) -> Self {
        Self {
            status: DeployStatus::Failure,
            message: Some(message.into()),
            policies: Vec::new(),
            environment_variables: BTreeMap::new(),
            deploy_contexts: BTreeMap::new(),
            error: error.map(Arc::new),
        }
    }

    /// Returns true on success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Outcome of deleting an environment.
#[derive(Debug, Clone)]
pub struct EnvironmentDeleteResult {
    /// Whether the delete succeeded.
    pub status: DeployStatus,
    /// Optional human-readable message.
    pub message: Option<String>,
    /// The underlying error, if any.
    pub error: Option<Arc<PipewrightError>>,
}

impl EnvironmentDeleteResult {
    /// A successful delete.
    #[must_use]
    pub fn success() -> Self {
        Self {
            status: DeployStatus::Success,
            message: None,
            error: None,
        }
    }

    /// A failed delete carrying its cause.
    #[must_use]
    pub fn failure(message: impl Into<String>, error: Option<PipewrightError>) -> Self {
        Self {
            status: DeployStatus::Failure,
            message: Some(message.into()),
            error: error.map(Arc::new),
        }
    }

    /// Returns true on success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn deploy_ctx(name: &str, var: &str) -> DeployContext {
        let mut ctx = DeployContext {
            service_name: name.to_string(),
            service_type: "s3".to_string(),
            ..DeployContext::default()
        };
        ctx.add_env_var(var, "value");
        ctx.with_policy(serde_json::json!({"Resource": name}))
    }

    #[test]
    fn test_success_aggregates_contexts() {
        let mut contexts = BTreeMap::new();
        contexts.insert("a".to_string(), deploy_ctx("a", "X"));
        contexts.insert("b".to_string(), deploy_ctx("b", "Y"));

        let result = EnvironmentDeployResult::success(contexts);
        assert!(result.is_success());
        assert_eq!(result.policies.len(), 2);
        assert_eq!(
            result.environment_variables.keys().cloned().collect::<Vec<_>>(),
            vec!["A_X".to_string(), "B_Y".to_string()]
        );
    }

    #[test]
    fn test_delete_failure_keeps_cause() {
        let result = EnvironmentDeleteResult::failure(
            "boom",
            Some(PipewrightError::TaskJoin("boom".to_string())),
        );
        assert!(!result.is_success());
        assert!(result.error.is_some());
    }
}
