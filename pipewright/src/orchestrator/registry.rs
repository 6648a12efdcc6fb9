//! Type tag to [`ServiceDeployer`] lookup.

use super::ServiceDeployer;
use crate::errors::{codes, ContractErrorInfo, ErrorSuggestions, ValidationError};
use crate::services::{ApiAccessService, DynamoDbService, S3Service};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Maps service type tags to deployers. Built once, then shared read-only.
#[derive(Clone, Default)]
pub struct ServiceDeployerRegistry {
    deployers: BTreeMap<String, Arc<dyn ServiceDeployer>>,
}

impl fmt::Debug for ServiceDeployerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDeployerRegistry")
            .field("types", &self.types())
            .finish()
    }
}

impl ServiceDeployerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in service type.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new()
            .with("apiaccess", Arc::new(ApiAccessService))
            .with("dynamodb", Arc::new(DynamoDbService))
            .with("s3", Arc::new(S3Service))
    }

    /// Registers a deployer, replacing any previous one for the tag.
    #[must_use]
    pub fn with(mut self, service_type: impl Into<String>, deployer: Arc<dyn ServiceDeployer>) -> Self {
        self.register(service_type, deployer);
        self
    }

    /// Registers a deployer in place.
    pub fn register(&mut self, service_type: impl Into<String>, deployer: Arc<dyn ServiceDeployer>) {
        self.deployers.insert(service_type.into(), deployer);
    }

    /// Keeps only the listed tags.
    #[must_use]
    pub fn with_allowed<S: AsRef<str>>(mut self, allowed: &[S]) -> Self {
        self.deployers
            .retain(|tag, _| allowed.iter().any(|a| a.as_ref() == tag));
        self
    }

    /// Looks a deployer up.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for an unknown tag.
    pub fn get(&self, service_type: &str) -> Result<Arc<dyn ServiceDeployer>, ValidationError> {
        self.deployers.get(service_type).cloned().ok_or_else(|| {
            let mut info = ContractErrorInfo::new(
                codes::UNKNOWN_TYPE,
                format!("Unsupported service type '{service_type}'"),
            )
            .with_context_entry("supported", self.types().join(", "));
            if let Some(hint) = ErrorSuggestions::get(codes::UNKNOWN_TYPE) {
                info = info.with_fix_hint(hint);
            }
            ValidationError::new(format!("service type '{service_type}' is not supported"))
                .with_subject(service_type)
                .with_error_info(info)
        })
    }

    /// Returns true if the tag is registered.
    #[must_use]
    pub fn contains(&self, service_type: &str) -> bool {
        self.deployers.contains_key(service_type)
    }

    /// Registered tags, sorted.
    #[must_use]
    pub fn types(&self) -> Vec<String> {
        self.deployers.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_types() {
        let registry = ServiceDeployerRegistry::builtin();
        assert_eq!(registry.types(), vec!["apiaccess", "dynamodb", "s3"]);
    }

    #[test]
    fn test_with_allowed_restricts() {
        let registry = ServiceDeployerRegistry::builtin().with_allowed(&["s3"]);
        assert!(registry.contains("s3"));
        assert!(!registry.contains("dynamodb"));
    }

    #[test]
    fn test_unknown_type_message() {
        let err = ServiceDeployerRegistry::builtin().get("efs").err().unwrap();
        assert_eq!(err.message, "service type 'efs' is not supported");
        assert_eq!(err.code(), Some(codes::UNKNOWN_TYPE));
    }
}
