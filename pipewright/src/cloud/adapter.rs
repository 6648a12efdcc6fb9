//! The per-kind cloud adapter contract.

use super::{CloudError, DeleteOutcome, Resource, ResourceKind, ResourceSpec};
use async_trait::async_trait;

/// Provider calls for one resource kind, keyed by a stable name.
///
/// Retries, if any, belong here rather than in the reconciler.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CloudAdapter: Send + Sync {
    /// The kind this adapter manages.
    fn kind(&self) -> ResourceKind;

    /// Looks a resource up by name.
    async fn get(&self, name: &str) -> Result<Option<Resource>, CloudError>;

    /// Creates a resource.
    async fn create(&self, spec: &ResourceSpec) -> Result<Resource, CloudError>;

    /// Updates an existing resource to match `spec`.
    async fn update(&self, existing: &Resource, spec: &ResourceSpec) -> Result<Resource, CloudError>;

    /// Deletes a resource.
    async fn delete(&self, name: &str) -> Result<DeleteOutcome, CloudError>;
}
