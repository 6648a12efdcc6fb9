//! Per-service contexts produced by each orchestration stage.
//!
//! Contexts live only for one orchestration run. The orchestrator owns them
//! and hands out shared references; nothing here is persisted.

use crate::graph::ServiceSpec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identity and configuration of one service within one environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceContext {
    /// The application name.
    pub app_name: String,
    /// The environment the service belongs to (`{pipeline}-{phase}` for phase resources).
    pub environment_name: String,
    /// The service name within the environment.
    pub service_name: String,
    /// The service type tag.
    pub service_type: String,
    /// The declared service specification.
    pub spec: ServiceSpec,
}

impl ServiceContext {
    /// Creates a context for `spec` inside the given environment.
    #[must_use]
    pub fn new(app_name: impl Into<String>, environment_name: impl Into<String>, spec: ServiceSpec) -> Self {
        Self {
            app_name: app_name.into(),
            environment_name: environment_name.into(),
            service_name: spec.name.clone(),
            service_type: spec.service_type.clone(),
            spec,
        }
    }

    /// Stable cloud resource name for this service.
    #[must_use]
    pub fn resource_name(&self) -> String {
        format!(
            "{}-{}-{}-{}",
            self.app_name, self.environment_name, self.service_name, self.service_type
        )
    }

    /// Prefix for exported environment variables, e.g. `MY_TABLE`.
    #[must_use]
    pub fn env_var_prefix(&self) -> String {
        env_var_prefix(&self.service_name)
    }

    /// Reads a string parameter from the service spec.
    #[must_use]
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.spec.params.get(key).and_then(serde_json::Value::as_str)
    }
}

/// Upper-cases a service name and maps `-` to `_`.
#[must_use]
pub fn env_var_prefix(service_name: &str) -> String {
    service_name.to_uppercase().replace('-', "_")
}

/// Output of the pre-deploy stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreDeployContext {
    /// The service name.
    pub service_name: String,
    /// Security groups created for the service.
    #[serde(default)]
    pub security_groups: Vec<String>,
    /// Free-form outputs.
    #[serde(default)]
    pub outputs: BTreeMap<String, String>,
}

impl PreDeployContext {
    /// Creates an empty pre-deploy context.
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Self::default()
        }
    }
}

/// Output of the bind stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindContext {
    /// The service name.
    pub service_name: String,
    /// Services this service was wired to.
    #[serde(default)]
    pub bound_to: Vec<String>,
    /// Free-form outputs.
    #[serde(default)]
    pub outputs: BTreeMap<String, String>,
}

impl BindContext {
    /// Creates an empty bind context.
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Self::default()
        }
    }
}

/// Output of the deploy stage.
///
/// Later levels and the enclosing pipeline phase consume the exported
/// policies and environment variables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeployContext {
    /// The service name.
    pub service_name: String,
    /// The service type tag.
    pub service_type: String,
    /// IAM policy statements consumers need to use the service.
    #[serde(default)]
    pub policies: Vec<serde_json::Value>,
    /// Environment variables consumers need to reach the service.
    #[serde(default)]
    pub environment_variables: BTreeMap<String, String>,
    /// Free-form outputs.
    #[serde(default)]
    pub outputs: BTreeMap<String, String>,
}

impl DeployContext {
    /// Creates an empty deploy context for a service.
    #[must_use]
    pub fn new(ctx: &ServiceContext) -> Self {
        Self {
            service_name: ctx.service_name.clone(),
            service_type: ctx.service_type.clone(),
            ..Self::default()
        }
    }

    /// Adds an environment variable named `{SERVICE}_{suffix}`.
    pub fn add_env_var(&mut self, suffix: &str, value: impl Into<String>) {
        let key = format!("{}_{}", env_var_prefix(&self.service_name), suffix);
        self.environment_variables.insert(key, value.into());
    }

    /// Adds a policy statement.
    #[must_use]
    pub fn with_policy(mut self, policy: serde_json::Value) -> Self {
        self.policies.push(policy);
        self
    }
}
