//! Convergent get-then-create-or-update and get-then-delete-or-noop.

use super::{CloudAdapter, CloudError, DeleteOutcome, Resource, ResourceKind, ResourceSpec};
use crate::config::AccountConfig;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Makes provisioning of one resource kind idempotent.
///
/// Holds no resource state of its own; every call asks the provider.
#[derive(Clone)]
pub struct ResourceReconciler {
    kind: ResourceKind,
    adapter: Arc<dyn CloudAdapter>,
}

impl fmt::Debug for ResourceReconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceReconciler").field("kind", &self.kind).finish_non_exhaustive()
    }
}

impl ResourceReconciler {
    /// Wraps an adapter.
    #[must_use]
    pub fn new(adapter: Arc<dyn CloudAdapter>) -> Self {
        Self {
            kind: adapter.kind(),
            adapter,
        }
    }

    /// The kind of the wrapped adapter.
    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Looks a resource up without changing anything.
    ///
    /// # Errors
    ///
    /// Returns the adapter's error unchanged.
    pub async fn get(&self, name: &str) -> Result<Option<Resource>, CloudError> {
        self.adapter.get(name).await
    }

    /// Creates the resource if it is absent, otherwise updates it.
    ///
    /// Never calls `create` for a resource that already exists.
    ///
    /// # Errors
    ///
    /// Returns the adapter's error unchanged. Nothing is retried.
    pub async fn reconcile(&self, spec: &ResourceSpec) -> Result<Resource, CloudError> {
        match self.adapter.get(&spec.name).await? {
            None => {
                info!(kind = %self.kind, name = %spec.name, "creating resource");
                self.adapter.create(spec).await
            }
            Some(existing) => {
                info!(kind = %self.kind, name = %spec.name, "updating resource");
                self.adapter.update(&existing, spec).await
            }
        }
    }

    /// Deletes the resource if it exists.
    ///
    /// An absent resource is success and the provider's delete is not called.
    /// A "not found" error during the delete also counts as success.
    ///
    /// # Errors
    ///
    /// Returns any other adapter error unchanged.
    pub async fn teardown(&self, name: &str) -> Result<(), CloudError> {
        if self.adapter.get(name).await?.is_none() {
            debug!(kind = %self.kind, name = %name, "resource already absent");
            return Ok(());
        }

        info!(kind = %self.kind, name = %name, "deleting resource");
        match self.adapter.delete(name).await {
            Ok(DeleteOutcome::Deleted) => Ok(()),
            Ok(DeleteOutcome::Absent) => {
                debug!(kind = %self.kind, name = %name, "resource vanished before delete");
                Ok(())
            }
            Err(err) if err.is_not_found() => {
                warn!(kind = %self.kind, name = %name, "resource vanished during delete");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}

/// One reconciler per resource kind.
#[derive(Debug, Clone)]
pub struct CloudAdapters {
    roles: ResourceReconciler,
    policies: ResourceReconciler,
    build_projects: ResourceReconciler,
    stacks: ResourceReconciler,
    pipelines: ResourceReconciler,
    buckets: ResourceReconciler,
    webhooks: ResourceReconciler,
}

impl CloudAdapters {
    /// Builds the bundle by asking `factory` for each kind's adapter.
    pub fn from_fn(mut factory: impl FnMut(ResourceKind) -> Arc<dyn CloudAdapter>) -> Self {
        let mut make = |kind| ResourceReconciler::new(factory(kind));
        Self {
            roles: make(ResourceKind::Role),
            policies: make(ResourceKind::Policy),
            build_projects: make(ResourceKind::BuildProject),
            stacks: make(ResourceKind::Stack),
            pipelines: make(ResourceKind::Pipeline),
            buckets: make(ResourceKind::Bucket),
            webhooks: make(ResourceKind::Webhook),
        }
    }

    /// The reconciler for `kind`.
    #[must_use]
    pub fn reconciler(&self, kind: ResourceKind) -> &ResourceReconciler {
        match kind {
            ResourceKind::Role => &self.roles,
            ResourceKind::Policy => &self.policies,
            ResourceKind::BuildProject => &self.build_projects,
            ResourceKind::Stack => &self.stacks,
            ResourceKind::Pipeline => &self.pipelines,
            ResourceKind::Bucket => &self.buckets,
            ResourceKind::Webhook => &self.webhooks,
        }
    }

    /// IAM roles.
    #[must_use]
    pub fn roles(&self) -> &ResourceReconciler {
        &self.roles
    }

    /// IAM policies.
    #[must_use]
    pub fn policies(&self) -> &ResourceReconciler {
        &self.policies
    }

    /// Build projects.
    #[must_use]
    pub fn build_projects(&self) -> &ResourceReconciler {
        &self.build_projects
    }

    /// Infrastructure stacks.
    #[must_use]
    pub fn stacks(&self) -> &ResourceReconciler {
        &self.stacks
    }

    /// Pipelines.
    #[must_use]
    pub fn pipelines(&self) -> &ResourceReconciler {
        &self.pipelines
    }

    /// Buckets.
    #[must_use]
    pub fn buckets(&self) -> &ResourceReconciler {
        &self.buckets
    }

    /// Webhooks.
    #[must_use]
    pub fn webhooks(&self) -> &ResourceReconciler {
        &self.webhooks
    }
}

/// ARN of the managed policy attached to a pipewright service role.
#[must_use]
pub fn service_policy_arn(account: &AccountConfig, role_name: &str) -> String {
    format!("arn:aws:iam::{}:policy/pipewright/{role_name}", account.account_id)
}

/// Converges a service role and its managed policy.
///
/// The policy is reconciled first so the role can reference its ARN.
///
/// # Errors
///
/// Returns the first cloud error from either reconcile.
pub async fn ensure_service_role(
    adapters: &CloudAdapters,
    account: &AccountConfig,
    role_name: &str,
    trusted_services: &[&str],
    policy_document: serde_json::Value,
) -> Result<Resource, CloudError> {
    let policy_spec = ResourceSpec::new(ResourceKind::Policy, role_name).with_config(serde_json::json!({
        "arn": service_policy_arn(account, role_name),
        "document": policy_document,
    }));
    let policy = adapters.policies().reconcile(&policy_spec).await?;

    let statements: Vec<serde_json::Value> = trusted_services
        .iter()
        .map(|service| {
            serde_json::json!({
                "Effect": "Allow",
                "Principal": { "Service": service },
                "Action": "sts:AssumeRole",
            })
        })
        .collect();
    let role_spec = ResourceSpec::new(ResourceKind::Role, role_name).with_config(serde_json::json!({
        "assume_role_policy": { "Version": "2012-10-17", "Statement": statements },
        "attached_policies": [policy.arn],
    }));
    adapters.roles().reconcile(&role_spec).await
}
