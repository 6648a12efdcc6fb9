//! Declarative phase configuration.

use serde::{Deserialize, Serialize};

/// One stage of a pipeline as declared in the pipeline file.
///
/// Every key other than `name` and `type` is phase-specific and lands in
/// `params`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseSpec {
    /// Phase name, unique within its pipeline.
    pub name: String,
    /// Phase type tag (e.g. `github`, `codebuild`).
    #[serde(rename = "type")]
    pub phase_type: String,
    /// 1-based declaration position, assigned when the pipeline is loaded.
    #[serde(skip)]
    pub position: usize,
    /// Phase-specific parameters.
    #[serde(flatten)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl PhaseSpec {
    /// Creates a phase with no parameters.
    #[must_use]
    pub fn new(name: impl Into<String>, phase_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phase_type: phase_type.into(),
            position: 0,
            params: serde_json::Map::new(),
        }
    }

    /// Sets the declaration position.
    #[must_use]
    pub fn with_position(mut self, position: usize) -> Self {
        self.position = position;
        self
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Reads a parameter.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&serde_json::Value> {
        self.params.get(key)
    }

    /// Reads a string parameter.
    #[must_use]
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(serde_json::Value::as_str)
    }

    /// One message per listed key that is missing or not a non-empty string.
    #[must_use]
    pub fn require_str_params(&self, keys: &[&str]) -> Vec<String> {
        keys.iter()
            .filter(|key| self.param_str(key).map_or(true, str::is_empty))
            .map(|key| format!("the '{key}' parameter is required"))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_are_flattened() {
        let phase: PhaseSpec = serde_json::from_value(serde_json::json!({
            "name": "source",
            "type": "github",
            "owner": "acme",
            "repo": "shop"
        }))
        .unwrap();

        assert_eq!(phase.phase_type, "github");
        assert_eq!(phase.param_str("owner"), Some("acme"));
        assert!(!phase.params.contains_key("name"));
        assert_eq!(
            phase.require_str_params(&["owner", "repo", "branch"]),
            vec!["the 'branch' parameter is required".to_string()]
        );
    }
}
