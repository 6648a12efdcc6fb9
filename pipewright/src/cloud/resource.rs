//! Resource descriptors shared by every adapter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// The kinds of cloud resource pipewright manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    /// IAM role.
    Role,
    /// IAM policy.
    Policy,
    /// Build project.
    BuildProject,
    /// Infrastructure stack.
    Stack,
    /// Delivery pipeline.
    Pipeline,
    /// Object storage bucket.
    Bucket,
    /// Source webhook.
    Webhook,
}

impl ResourceKind {
    /// Every kind, in a fixed order.
    pub const ALL: [Self; 7] = [
        Self::Role,
        Self::Policy,
        Self::BuildProject,
        Self::Stack,
        Self::Pipeline,
        Self::Bucket,
        Self::Webhook,
    ];

    /// Returns the kebab-case name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Role => "role",
            Self::Policy => "policy",
            Self::BuildProject => "build-project",
            Self::Stack => "stack",
            Self::Pipeline => "pipeline",
            Self::Bucket => "bucket",
            Self::Webhook => "webhook",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The desired state of one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSpec {
    /// Resource kind.
    pub kind: ResourceKind,
    /// Stable name the resource is looked up by.
    pub name: String,
    /// Provider-specific configuration.
    pub config: serde_json::Value,
    /// Tags.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl ResourceSpec {
    /// Creates a spec with empty configuration.
    #[must_use]
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            config: serde_json::Value::Object(serde_json::Map::new()),
            tags: BTreeMap::new(),
        }
    }

    /// Sets the configuration.
    #[must_use]
    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.config = config;
        self
    }

    /// Adds a tag.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Adds several tags.
    #[must_use]
    pub fn with_tags(mut self, tags: &BTreeMap<String, String>) -> Self {
        self.tags.extend(tags.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// SHA-256 of the configuration and tags.
    ///
    /// `serde_json` maps are ordered, so equal specs hash equally.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let canonical = serde_json::json!({ "config": self.config, "tags": self.tags });
        let mut hasher = Sha256::new();
        hasher.update(canonical.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// A resource as the provider reports it.
///
/// The shape is identical whether the resource was just created or updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Resource kind.
    pub kind: ResourceKind,
    /// Resource name.
    pub name: String,
    /// Provider identity.
    pub arn: String,
    /// The spec last applied.
    pub spec: ResourceSpec,
    /// Values the provider exports (stack outputs, endpoints).
    #[serde(default)]
    pub outputs: BTreeMap<String, String>,
    /// When the resource was created.
    pub created_at: DateTime<Utc>,
    /// When the resource was last changed.
    pub updated_at: DateTime<Utc>,
}

impl Resource {
    /// Returns an output value.
    #[must_use]
    pub fn output(&self, key: &str) -> Option<&str> {
        self.outputs.get(key).map(String::as_str)
    }
}

/// Result of a delete call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    /// The resource existed and was deleted.
    Deleted,
    /// There was nothing to delete.
    Absent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_display_is_kebab_case() {
        assert_eq!(ResourceKind::BuildProject.to_string(), "build-project");
        assert_eq!(
            serde_json::to_value(ResourceKind::BuildProject).unwrap(),
            serde_json::json!("build-project")
        );
    }

    #[test]
    fn test_fingerprint_tracks_config_and_tags() {
        let base = ResourceSpec::new(ResourceKind::Bucket, "b")
            .with_config(serde_json::json!({"versioning": true}));
        let same = ResourceSpec::new(ResourceKind::Bucket, "b")
            .with_config(serde_json::json!({"versioning": true}));
        let tagged = base.clone().with_tag("app", "demo");
        let changed = ResourceSpec::new(ResourceKind::Bucket, "b")
            .with_config(serde_json::json!({"versioning": false}));

        assert_eq!(base.fingerprint(), same.fingerprint());
        assert_ne!(base.fingerprint(), tagged.fingerprint());
        assert_ne!(base.fingerprint(), changed.fingerprint());
        assert_eq!(base.fingerprint().len(), 64);
    }
}
