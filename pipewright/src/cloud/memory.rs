//! An in-process adapter for tests and dry runs.

use super::{CloudAdapter, CloudError, DeleteOutcome, Resource, ResourceKind, ResourceSpec};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};

/// An adapter operation, used for call counting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterOperation {
    /// `get`
    Get,
    /// `create`
    Create,
    /// `update`
    Update,
    /// `delete`
    Delete,
}

/// How many times each operation was called.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    /// `get` calls.
    pub get: usize,
    /// `create` calls.
    pub create: usize,
    /// `update` calls.
    pub update: usize,
    /// `delete` calls.
    pub delete: usize,
}

impl CallCounts {
    /// Calls that change provider state.
    #[must_use]
    pub fn mutations(&self) -> usize {
        self.create + self.update + self.delete
    }
}

/// Keeps resources of one kind in memory.
///
/// ARNs look like `arn:aws:{kind}:{region}:{account}:{name}` unless the spec
/// config carries an explicit `arn`. String entries of a config `outputs`
/// object become the resource outputs, standing in for stack outputs.
/// Updating with an unchanged fingerprint leaves the resource untouched.
#[derive(Debug)]
pub struct InMemoryCloudAdapter {
    kind: ResourceKind,
    account_id: String,
    region: String,
    resources: RwLock<BTreeMap<String, Resource>>,
    calls: Mutex<CallCounts>,
    failures: Mutex<HashMap<AdapterOperation, CloudError>>,
}

impl InMemoryCloudAdapter {
    /// Creates an empty adapter.
    #[must_use]
    pub fn new(kind: ResourceKind, account_id: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            kind,
            account_id: account_id.into(),
            region: region.into(),
            resources: RwLock::new(BTreeMap::new()),
            calls: Mutex::new(CallCounts::default()),
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the call counts so far.
    #[must_use]
    pub fn calls(&self) -> CallCounts {
        *self.calls.lock()
    }

    /// Resets the call counts.
    pub fn reset_calls(&self) {
        *self.calls.lock() = CallCounts::default();
    }

    /// Makes every future call of `operation` fail with `error`.
    pub fn fail_on(&self, operation: AdapterOperation, error: CloudError) {
        self.failures.lock().insert(operation, error);
    }

    /// Removes all injected failures.
    pub fn clear_failures(&self) {
        self.failures.lock().clear();
    }

    /// Returns true if a resource with this name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.resources.read().contains_key(name)
    }

    /// A copy of the stored resource, without counting a call.
    #[must_use]
    pub fn resource(&self, name: &str) -> Option<Resource> {
        self.resources.read().get(name).cloned()
    }

    /// Names of every stored resource.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.resources.read().keys().cloned().collect()
    }

    /// Number of stored resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.read().len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.read().is_empty()
    }

    fn record(&self, operation: AdapterOperation) -> Result<(), CloudError> {
        {
            let mut calls = self.calls.lock();
            match operation {
                AdapterOperation::Get => calls.get += 1,
                AdapterOperation::Create => calls.create += 1,
                AdapterOperation::Update => calls.update += 1,
                AdapterOperation::Delete => calls.delete += 1,
            }
        }
        match self.failures.lock().get(&operation) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn arn_for(&self, spec: &ResourceSpec) -> String {
        spec.config
            .get("arn")
            .and_then(serde_json::Value::as_str)
            .map_or_else(
                || format!("arn:aws:{}:{}:{}:{}", self.kind, self.region, self.account_id, spec.name),
                str::to_string,
            )
    }
}

/// Extracts declared outputs from a spec config.
pub(crate) fn declared_outputs(spec: &ResourceSpec) -> BTreeMap<String, String> {
    spec.config
        .get("outputs")
        .and_then(serde_json::Value::as_object)
        .map(|outputs| {
            outputs
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl CloudAdapter for InMemoryCloudAdapter {
    fn kind(&self) -> ResourceKind {
        self.kind
    }

    async fn get(&self, name: &str) -> Result<Option<Resource>, CloudError> {
        self.record(AdapterOperation::Get)?;
        Ok(self.resources.read().get(name).cloned())
    }

    async fn create(&self, spec: &ResourceSpec) -> Result<Resource, CloudError> {
        self.record(AdapterOperation::Create)?;
        let mut resources = self.resources.write();
        if resources.contains_key(&spec.name) {
            return Err(CloudError::rejected(self.kind, spec.name.clone(), "already exists"));
        }

        let now = Utc::now();
        let resource = Resource {
            kind: self.kind,
            name: spec.name.clone(),
            arn: self.arn_for(spec),
            spec: spec.clone(),
            outputs: declared_outputs(spec),
            created_at: now,
            updated_at: now,
        };
        resources.insert(spec.name.clone(), resource.clone());
        Ok(resource)
    }

    async fn update(&self, existing: &Resource, spec: &ResourceSpec) -> Result<Resource, CloudError> {
        self.record(AdapterOperation::Update)?;
        let mut resources = self.resources.write();
        let Some(current) = resources.get_mut(&existing.name) else {
            return Err(CloudError::NotFound {
                kind: self.kind,
                name: existing.name.clone(),
            });
        };

        if current.spec.fingerprint() != spec.fingerprint() {
            current.spec = spec.clone();
            current.arn = self.arn_for(spec);
            current.outputs = declared_outputs(spec);
            current.updated_at = Utc::now();
        }
        Ok(current.clone())
    }

    async fn delete(&self, name: &str) -> Result<DeleteOutcome, CloudError> {
        self.record(AdapterOperation::Delete)?;
        Ok(match self.resources.write().remove(name) {
            Some(_) => DeleteOutcome::Deleted,
            None => DeleteOutcome::Absent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn adapter() -> InMemoryCloudAdapter {
        InMemoryCloudAdapter::new(ResourceKind::Stack, "123", "us-west-2")
    }

    #[tokio::test]
    async fn test_create_generates_arn_and_outputs() {
        let adapter = adapter();
        let spec = ResourceSpec::new(ResourceKind::Stack, "tests")
            .with_config(serde_json::json!({"outputs": {"FunctionName": "tests-fn", "Count": 2}}));

        let created = adapter.create(&spec).await.unwrap();
        assert_eq!(created.arn, "arn:aws:stack:us-west-2:123:tests");
        assert_eq!(created.output("FunctionName"), Some("tests-fn"));
        assert_eq!(created.output("Count"), None);
        assert!(adapter.contains("tests"));
    }

    #[tokio::test]
    async fn test_explicit_arn_wins() {
        let adapter = adapter();
        let spec = ResourceSpec::new(ResourceKind::Stack, "p")
            .with_config(serde_json::json!({"arn": "arn:custom"}));
        assert_eq!(adapter.create(&spec).await.unwrap().arn, "arn:custom");
    }

    #[tokio::test]
    async fn test_update_with_changed_spec_applies_it() {
        let adapter = adapter();
        let first = adapter
            .create(&ResourceSpec::new(ResourceKind::Stack, "s").with_config(serde_json::json!({"v": 1})))
            .await
            .unwrap();
        let changed = ResourceSpec::new(ResourceKind::Stack, "s").with_config(serde_json::json!({"v": 2}));

        let updated = adapter.update(&first, &changed).await.unwrap();
        assert_eq!(updated.spec, changed);
        assert_eq!(updated.created_at, first.created_at);
    }

    #[tokio::test]
    async fn test_delete_reports_absent() {
        let adapter = adapter();
        assert_eq!(adapter.delete("nothing").await.unwrap(), DeleteOutcome::Absent);
        assert_eq!(adapter.calls().delete, 1);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let adapter = adapter();
        adapter.fail_on(
            AdapterOperation::Create,
            CloudError::Throttled { kind: ResourceKind::Stack },
        );
        let err = adapter.create(&ResourceSpec::new(ResourceKind::Stack, "s")).await.unwrap_err();
        assert_eq!(err, CloudError::Throttled { kind: ResourceKind::Stack });
        assert!(adapter.is_empty());

        adapter.clear_failures();
        adapter.create(&ResourceSpec::new(ResourceKind::Stack, "s")).await.unwrap();
        assert_eq!(adapter.calls().create, 2);
    }
}
