//! Explicit run inputs: the target account and the environment being driven.

use crate::cloud::CloudAdapters;
use crate::config::AccountConfig;
use crate::core::ServiceContext;
use crate::errors::PipewrightError;
use crate::graph::ServiceSpec;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Tag key marking which pipeline phase owns a service.
pub const PHASE_TAG: &str = "pipewright-phase";

/// The account plus one reconciler per resource kind.
///
/// Passed by reference into every operation that touches the cloud.
#[derive(Debug, Clone)]
pub struct CloudContext {
    /// The target account.
    pub account: Arc<AccountConfig>,
    /// Reconcilers for every resource kind.
    pub adapters: CloudAdapters,
}

impl CloudContext {
    /// Creates a cloud context.
    #[must_use]
    pub fn new(account: impl Into<Arc<AccountConfig>>, adapters: CloudAdapters) -> Self {
        Self {
            account: account.into(),
            adapters,
        }
    }

    /// The target account.
    #[must_use]
    pub fn account(&self) -> &AccountConfig {
        &self.account
    }
}

/// One environment: the services a deploy phase provisions.
#[derive(Debug, Clone)]
pub struct EnvironmentContext {
    /// The application name.
    pub app_name: String,
    /// The pipeline the environment belongs to.
    pub pipeline_name: String,
    /// The environment name. Phase environments use `{pipeline}-{phase}`.
    pub environment_name: String,
    /// The declared services.
    pub services: BTreeMap<String, ServiceSpec>,
}

impl EnvironmentContext {
    /// Creates an environment, tagging every service with its owner.
    #[must_use]
    pub fn new(
        app_name: impl Into<String>,
        pipeline_name: impl Into<String>,
        environment_name: impl Into<String>,
        services: BTreeMap<String, ServiceSpec>,
    ) -> Self {
        let app_name = app_name.into();
        let pipeline_name = pipeline_name.into();
        let environment_name = environment_name.into();
        let services = services
            .into_iter()
            .map(|(name, spec)| {
                let spec = spec
                    .with_tag(PHASE_TAG, environment_name.as_str())
                    .with_tag("app", app_name.as_str())
                    .with_tag("pipeline", pipeline_name.as_str())
                    .with_tag("environment", environment_name.as_str());
                (name, spec)
            })
            .collect();

        Self {
            app_name,
            pipeline_name,
            environment_name,
            services,
        }
    }

    /// Parses a `resources` mapping from a phase definition.
    ///
    /// # Errors
    ///
    /// Returns an error if a service body is malformed.
    pub fn from_resources(
        app_name: impl Into<String>,
        pipeline_name: impl Into<String>,
        environment_name: impl Into<String>,
        resources: &serde_json::Value,
    ) -> Result<Self, PipewrightError> {
        let services = ServiceSpec::parse_map(resources)?;
        Ok(Self::new(app_name, pipeline_name, environment_name, services))
    }

    /// Builds the context handed to a service's deployer.
    #[must_use]
    pub fn service_context(&self, spec: &ServiceSpec) -> ServiceContext {
        ServiceContext::new(self.app_name.as_str(), self.environment_name.as_str(), spec.clone())
    }
}
