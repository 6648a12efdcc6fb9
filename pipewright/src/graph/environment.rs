//! Environment graphs: service specs plus their computed levels.

use super::resolver::{DependencyGraphResolver, Level};
use super::spec::ServiceSpec;
use crate::errors::{codes, ContractErrorInfo, PipewrightError, ValidationError};
use std::collections::{BTreeMap, HashMap};

/// The services of one environment and the order they deploy in.
///
/// Built fresh for every orchestration run.
#[derive(Debug, Clone)]
pub struct EnvironmentGraph {
    services: BTreeMap<String, ServiceSpec>,
    levels: Vec<Level>,
}

impl EnvironmentGraph {
    /// Validates dependency names and resolves levels.
    ///
    /// # Errors
    ///
    /// Returns [`PipewrightError::InvalidSpec`] listing every unknown
    /// dependency, or [`PipewrightError::CycleDetected`] if the graph has a
    /// cycle.
    pub fn build(
        services: BTreeMap<String, ServiceSpec>,
        resolver: &dyn DependencyGraphResolver,
    ) -> Result<Self, PipewrightError> {
        let errors = Self::missing_dependencies(&services);
        if !errors.is_empty() {
            return Err(PipewrightError::InvalidSpec { errors });
        }

        let adjacency: HashMap<String, Vec<String>> = services
            .iter()
            .map(|(name, spec)| (name.clone(), spec.dependencies.clone()))
            .collect();
        let levels = resolver.resolve(&adjacency)?;

        Ok(Self { services, levels })
    }

    /// Checks the graph without keeping it, returning every problem found.
    #[must_use]
    pub fn validate(
        services: &BTreeMap<String, ServiceSpec>,
        resolver: &dyn DependencyGraphResolver,
    ) -> Vec<ValidationError> {
        match Self::build(services.clone(), resolver) {
            Ok(_) => Vec::new(),
            Err(PipewrightError::InvalidSpec { errors }) => errors,
            Err(PipewrightError::CycleDetected(cycle)) => vec![cycle.into()],
            Err(other) => vec![ValidationError::new(other.to_string())],
        }
    }

    fn missing_dependencies(services: &BTreeMap<String, ServiceSpec>) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        for (name, spec) in services {
            for dep in &spec.dependencies {
                if !services.contains_key(dep) {
                    let info = ContractErrorInfo::new(
                        codes::MISSING_DEP,
                        format!("Service '{name}' depends on unknown service '{dep}'"),
                    )
                    .with_context_entry("service", name.as_str())
                    .with_context_entry("dependency", dep.as_str());
                    errors.push(
                        ValidationError::new(format!(
                            "service '{name}' depends on '{dep}', which is not declared in this environment"
                        ))
                        .with_subjects(vec![name.clone(), dep.clone()])
                        .with_error_info(info),
                    );
                }
            }
        }
        errors
    }

    /// The ordered levels.
    #[must_use]
    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    /// Looks up one service.
    #[must_use]
    pub fn service(&self, name: &str) -> Option<&ServiceSpec> {
        self.services.get(name)
    }

    /// All services keyed by name.
    #[must_use]
    pub fn services(&self) -> &BTreeMap<String, ServiceSpec> {
        &self.services
    }

    /// The level index a service was placed in.
    #[must_use]
    pub fn level_of(&self, name: &str) -> Option<usize> {
        self.levels.iter().position(|level| level.contains(name))
    }

    /// Number of services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Returns true if the environment declares no services.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}
