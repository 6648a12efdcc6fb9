//! A file-backed adapter that keeps provider state in one JSON document.
//!
//! Lets the CLI run whole deploy/delete cycles on a workstation. Every kind
//! shares one state file, guarded by one async lock.

use super::memory::declared_outputs;
use super::{CloudAdapter, CloudAdapters, CloudError, DeleteOutcome, Resource, ResourceKind, ResourceSpec};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

const STATE_VERSION: u32 = 1;

/// The persisted document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalState {
    /// State file version.
    pub version: u32,
    /// Last modified timestamp.
    pub updated_at: DateTime<Utc>,
    /// Resources keyed by `kind:name`.
    pub resources: BTreeMap<String, Resource>,
}

impl Default for LocalState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            updated_at: Utc::now(),
            resources: BTreeMap::new(),
        }
    }
}

fn state_key(kind: ResourceKind, name: &str) -> String {
    format!("{kind}:{name}")
}

/// Owns the state file and the lock around it.
#[derive(Debug)]
pub struct LocalStateStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl LocalStateStore {
    /// Creates a store for `path`. The file is created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// The state file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the current state. A missing file is an empty state.
    ///
    /// # Errors
    ///
    /// Returns [`CloudError::State`] if the file exists but cannot be read or parsed.
    pub async fn load(&self) -> Result<LocalState, CloudError> {
        if !fs::try_exists(&self.path).await? {
            return Ok(LocalState::default());
        }
        let raw = fs::read_to_string(&self.path).await?;
        let state: LocalState = serde_json::from_str(&raw)?;
        if state.version != STATE_VERSION {
            return Err(CloudError::State(format!(
                "unsupported state version {} in {}",
                state.version,
                self.path.display()
            )));
        }
        Ok(state)
    }

    async fn save(&self, state: &LocalState) -> Result<(), CloudError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        // Owner-only: webhook and runscope configs hold tokens.
        let tmp = self.path.with_extension("json.tmp");
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);
        let mut file = options.open(&tmp).await?;
        file.write_all(&serde_json::to_vec_pretty(state)?).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), resources = state.resources.len(), "state saved");
        Ok(())
    }

    /// Applies `change` to the state under the lock and persists it.
    async fn modify<T>(
        &self,
        change: impl FnOnce(&mut LocalState) -> Result<T, CloudError>,
    ) -> Result<T, CloudError> {
        let _guard = self.lock.lock().await;
        let mut state = self.load().await?;
        let out = change(&mut state)?;
        state.updated_at = Utc::now();
        self.save(&state).await?;
        Ok(out)
    }

    /// Builds one adapter per kind over this store.
    #[must_use]
    pub fn adapters(self: &Arc<Self>, account_id: &str, region: &str) -> CloudAdapters {
        CloudAdapters::from_fn(|kind| {
            Arc::new(LocalStateCloudAdapter {
                store: Arc::clone(self),
                kind,
                account_id: account_id.to_string(),
                region: region.to_string(),
            })
        })
    }
}

/// Adapter for one kind over a [`LocalStateStore`].
#[derive(Debug, Clone)]
pub struct LocalStateCloudAdapter {
    store: Arc<LocalStateStore>,
    kind: ResourceKind,
    account_id: String,
    region: String,
}

impl LocalStateCloudAdapter {
    /// Creates an adapter for `kind`.
    #[must_use]
    pub fn new(
        store: Arc<LocalStateStore>,
        kind: ResourceKind,
        account_id: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            store,
            kind,
            account_id: account_id.into(),
            region: region.into(),
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

#[async_trait]
impl CloudAdapter for LocalStateCloudAdapter {
    fn kind(&self) -> ResourceKind {
        self.kind
    }

    async fn get(&self, name: &str) -> Result<Option<Resource>, CloudError> {
        let _guard = self.store.lock.lock().await;
        let state = self.store.load().await?;
        Ok(state.resources.get(&state_key(self.kind, name)).cloned())
    }

    async fn create(&self, spec: &ResourceSpec) -> Result<Resource, CloudError> {
        let kind = self.kind;
        let arn = self.arn_for(spec);
        self.store
            .modify(|state| {
                let key = state_key(kind, &spec.name);
                if state.resources.contains_key(&key) {
                    return Err(CloudError::rejected(kind, spec.name.clone(), "already exists"));
                }
                let now = Utc::now();
                let resource = Resource {
                    kind,
                    name: spec.name.clone(),
                    arn,
                    spec: spec.clone(),
                    outputs: declared_outputs(spec),
                    created_at: now,
                    updated_at: now,
                };
                state.resources.insert(key, resource.clone());
                Ok(resource)
            })
            .await
    }

    async fn update(&self, existing: &Resource, spec: &ResourceSpec) -> Result<Resource, CloudError> {
        let kind = self.kind;
        let arn = self.arn_for(spec);
        self.store
            .modify(|state| {
                let Some(current) = state.resources.get_mut(&state_key(kind, &existing.name)) else {
                    return Err(CloudError::NotFound {
                        kind,
                        name: existing.name.clone(),
                    });
                };
                if current.spec.fingerprint() != spec.fingerprint() {
                    current.spec = spec.clone();
                    current.arn = arn;
                    current.outputs = declared_outputs(spec);
                    current.updated_at = Utc::now();
                }
                Ok(current.clone())
            })
            .await
    }

    async fn delete(&self, name: &str) -> Result<DeleteOutcome, CloudError> {
        let kind = self.kind;
        self.store
            .modify(|state| {
                Ok(match state.resources.remove(&state_key(kind, name)) {
                    Some(_) => DeleteOutcome::Deleted,
                    None => DeleteOutcome::Absent,
                })
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_state_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("cloud.json");

        let first = Arc::new(LocalStateStore::new(&path));
        let adapters = first.adapters("123", "us-west-2");
        let spec = ResourceSpec::new(ResourceKind::Bucket, "codepipeline-us-west-2-123");
        adapters.buckets().reconcile(&spec).await.unwrap();

        let second = Arc::new(LocalStateStore::new(&path));
        let reopened = second.adapters("123", "us-west-2");
        let found = reopened.buckets().get("codepipeline-us-west-2-123").await.unwrap().unwrap();
        assert_eq!(found.arn, "arn:aws:bucket:us-west-2:123:codepipeline-us-west-2-123");

        assert!(reopened.stacks().get("codepipeline-us-west-2-123").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_teardown_removes_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalStateStore::new(dir.path().join("cloud.json")));
        let adapters = store.adapters("123", "us-west-2");

        adapters
            .stacks()
            .reconcile(&ResourceSpec::new(ResourceKind::Stack, "s"))
            .await
            .unwrap();
        adapters.stacks().teardown("s").await.unwrap();
        adapters.stacks().teardown("s").await.unwrap();

        let state = store.load().await.unwrap();
        assert!(state.resources.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_state_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cloud.json");
        let store = Arc::new(LocalStateStore::new(&path));
        let spec = ResourceSpec::new(ResourceKind::Webhook, "shop-main-source")
            .with_config(serde_json::json!({"secret_token": "gh-token"}));
        store.adapters("123", "us-west-2").webhooks().reconcile(&spec).await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert!(!dir.path().join("cloud.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStateStore::new(dir.path().join("absent.json"));
        assert!(store.load().await.unwrap().resources.is_empty());
    }

    #[tokio::test]
    async fn test_rejects_unknown_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cloud.json");
        tokio::fs::write(
            &path,
            r#"{"version": 99, "updated_at": "2024-01-01T00:00:00Z", "resources": {}}"#,
        )
        .await
        .unwrap();

        let err = LocalStateStore::new(&path).load().await.unwrap_err();
        assert!(matches!(err, CloudError::State(_)));
    }
}
