//! Service specifications as declared in an environment.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A named entry in an environment definition.
///
/// Every key other than `type`, `dependencies` and `tags` is type-specific
/// configuration and lands in `params`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSpec {
    /// The service name. Taken from the mapping key, not the body.
    #[serde(skip)]
    pub name: String,
    /// The service type tag (e.g. `s3`, `dynamodb`).
    #[serde(rename = "type")]
    pub service_type: String,
    /// Names of services in the same environment this one depends on.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    /// Tags applied to every resource of the service.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    /// Type-specific configuration.
    #[serde(flatten)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl ServiceSpec {
    /// Creates a service spec with no parameters.
    #[must_use]
    pub fn new(name: impl Into<String>, service_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            service_type: service_type.into(),
            dependencies: Vec::new(),
            tags: BTreeMap::new(),
            params: serde_json::Map::new(),
        }
    }

    /// Adds a dependency.
    #[must_use]
    pub fn with_dependency(mut self, dep: impl Into<String>) -> Self {
        self.dependencies.push(dep.into());
        self
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Adds a tag.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Parses a `name -> body` mapping into named specs.
    ///
    /// # Errors
    ///
    /// Returns an error if a body is not a valid service spec.
    pub fn parse_map(value: &serde_json::Value) -> Result<BTreeMap<String, Self>, serde_json::Error> {
        let mut services: BTreeMap<String, Self> = serde_json::from_value(value.clone())?;
        for (name, spec) in &mut services {
            spec.name.clone_from(name);
        }
        Ok(services)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_map_collects_params() {
        let value = serde_json::json!({
            "orders": {
                "type": "dynamodb",
                "partition_key": {"name": "id", "type": "String"},
                "dependencies": ["files"]
            },
            "files": {"type": "s3", "tags": {"team": "core"}}
        });

        let services = ServiceSpec::parse_map(&value).unwrap();
        let orders = &services["orders"];
        assert_eq!(orders.name, "orders");
        assert_eq!(orders.service_type, "dynamodb");
        assert_eq!(orders.dependencies, vec!["files".to_string()]);
        assert!(orders.params.contains_key("partition_key"));
        assert!(!orders.params.contains_key("type"));
        assert_eq!(services["files"].tags.get("team"), Some(&"core".to_string()));
    }

    #[test]
    fn test_parse_map_requires_type() {
        let value = serde_json::json!({"broken": {"bucket_name": "x"}});
        assert!(ServiceSpec::parse_map(&value).is_err());
    }
}
