//! Test fixtures: an in-memory cloud and a ready orchestrator.

use crate::cloud::{CloudAdapter, CloudAdapters, InMemoryCloudAdapter, ResourceKind};
use crate::config::AccountConfig;
use crate::events::NoOpEventSink;
use crate::graph::LevelResolver;
use crate::orchestrator::{CloudContext, EnvironmentOrchestrator, ServiceDeployerRegistry};
use std::sync::Arc;

/// One in-memory adapter per resource kind, kept for inspection.
#[derive(Debug, Clone)]
pub struct InMemoryCloud {
    roles: Arc<InMemoryCloudAdapter>,
    policies: Arc<InMemoryCloudAdapter>,
    build_projects: Arc<InMemoryCloudAdapter>,
    stacks: Arc<InMemoryCloudAdapter>,
    pipelines: Arc<InMemoryCloudAdapter>,
    buckets: Arc<InMemoryCloudAdapter>,
    webhooks: Arc<InMemoryCloudAdapter>,
}

impl InMemoryCloud {
    /// Creates empty adapters for `account`.
    #[must_use]
    pub fn new(account: &AccountConfig) -> Self {
        let make = |kind| Arc::new(InMemoryCloudAdapter::new(kind, account.account_id.as_str(), account.region.as_str()));
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

    fn shared(&self, kind: ResourceKind) -> &Arc<InMemoryCloudAdapter> {
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

    /// The adapter for `kind`.
    #[must_use]
    pub fn adapter(&self, kind: ResourceKind) -> &InMemoryCloudAdapter {
        self.shared(kind)
    }

    /// Reconcilers backed by these adapters.
    #[must_use]
    pub fn adapters(&self) -> CloudAdapters {
        CloudAdapters::from_fn(|kind| {
            let adapter: Arc<dyn CloudAdapter> = self.shared(kind).clone();
            adapter
        })
    }

    /// Creates, updates and deletes across every kind.
    #[must_use]
    pub fn total_mutations(&self) -> usize {
        ResourceKind::ALL
            .iter()
            .map(|kind| self.adapter(*kind).calls().mutations())
            .sum()
    }

    /// Every stored resource as `kind:name`, sorted.
    #[must_use]
    pub fn resource_keys(&self) -> Vec<String> {
        ResourceKind::ALL
            .iter()
            .flat_map(|kind| {
                self.adapter(*kind)
                    .names()
                    .into_iter()
                    .map(move |name| format!("{kind}:{name}"))
            })
            .collect()
    }

    /// Returns true if nothing is stored in any adapter.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        ResourceKind::ALL.iter().all(|kind| self.adapter(*kind).is_empty())
    }
}

/// A cloud context over a fresh in-memory cloud and the placeholder account.
#[must_use]
pub fn in_memory_cloud() -> (CloudContext, InMemoryCloud) {
    let account = AccountConfig::placeholder();
    let cloud = InMemoryCloud::new(&account);
    (CloudContext::new(account, cloud.adapters()), cloud)
}

/// An orchestrator with the built-in services and no event output.
#[must_use]
pub fn environment_orchestrator() -> EnvironmentOrchestrator {
    EnvironmentOrchestrator::new(
        Arc::new(ServiceDeployerRegistry::builtin()),
        Arc::new(LevelResolver::new()),
        Arc::new(NoOpEventSink),
    )
}
