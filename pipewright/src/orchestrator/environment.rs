//! Leveled deploy and delete of one environment.
//!
//! Forward: pre-deploy everything, then per ascending level bind, barrier,
//! deploy, barrier. Reverse: per descending level un-deploy, barrier,
//! un-bind, barrier, then one un-pre-deploy pass.
//!
//! Every member of a level runs as its own tokio task. A level waits for all
//! of its tasks; if any failed, the level fails with every failure listed and
//! no later level starts. Nothing already applied is rolled back.

use super::{CloudContext, EnvironmentContext, ServiceDeployer, ServiceDeployerRegistry};
use crate::config::OrchestratorConfig;
use crate::core::{
    BindContext, DeployContext, EnvironmentDeleteResult, EnvironmentDeployResult, LifecycleStage,
    PreDeployContext, ServiceContext,
};
use crate::errors::{codes, ContractErrorInfo, PipewrightError, ServiceFailure, ValidationError};
use crate::events::EventSink;
use crate::graph::{DependencyGraphResolver, EnvironmentGraph};
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, info_span, Instrument};

/// A service and the deployer that handles its type.
#[derive(Clone)]
struct ServiceEntry {
    deployer: Arc<dyn ServiceDeployer>,
    ctx: Arc<ServiceContext>,
}

impl ServiceEntry {
    fn name(&self) -> &str {
        &self.ctx.service_name
    }
}

/// Drives services of one environment through their lifecycle stages.
#[derive(Clone)]
pub struct EnvironmentOrchestrator {
    registry: Arc<ServiceDeployerRegistry>,
    resolver: Arc<dyn DependencyGraphResolver>,
    event_sink: Arc<dyn EventSink>,
    config: OrchestratorConfig,
}

impl std::fmt::Debug for EnvironmentOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvironmentOrchestrator")
            .field("registry", &self.registry)
            .field("resolver", &self.resolver)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl EnvironmentOrchestrator {
    /// Creates an orchestrator.
    #[must_use]
    pub fn new(
        registry: Arc<ServiceDeployerRegistry>,
        resolver: Arc<dyn DependencyGraphResolver>,
        event_sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            registry,
            resolver,
            event_sink,
            config: OrchestratorConfig::default(),
        }
    }

    /// Sets the orchestrator configuration.
    ///
    /// Service types outside `allowed_services` are dropped from the registry
    /// and reported as unsupported from then on.
    #[must_use]
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.registry = Arc::new(self.registry.as_ref().clone().with_allowed(&config.allowed_services));
        self.config = config;
        self
    }

    /// The service registry in use.
    #[must_use]
    pub fn registry(&self) -> &ServiceDeployerRegistry {
        &self.registry
    }

    /// Validates every service and the dependency graph.
    ///
    /// Makes no cloud calls and reports every problem found.
    #[must_use]
    pub fn check(&self, env: &EnvironmentContext) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        for spec in env.services.values() {
            match self.registry.get(&spec.service_type) {
                Ok(deployer) => {
                    let ctx = env.service_context(spec);
                    for message in deployer.check(&ctx) {
                        let info = ContractErrorInfo::new(codes::BAD_PARAMS, message.as_str())
                            .with_context_entry("service", spec.name.as_str())
                            .with_context_entry("environment", env.environment_name.as_str());
                        errors.push(
                            ValidationError::new(format!("service '{}': {message}", spec.name))
                                .with_subject(spec.name.as_str())
                                .with_error_info(info),
                        );
                    }
                }
                Err(err) => {
                    let message = format!("service '{}': {}", spec.name, err.message);
                    errors.push(ValidationError {
                        message,
                        subjects: vec![spec.name.clone(), spec.service_type.clone()],
                        error_info: err.error_info,
                    });
                }
            }
        }

        errors.extend(EnvironmentGraph::validate(&env.services, self.resolver.as_ref()));
        errors
    }

    /// Deploys the environment.
    ///
    /// Never returns an error; failures end up in the result.
    pub async fn deploy(&self, env: &EnvironmentContext, cloud: &CloudContext) -> EnvironmentDeployResult {
        let span = info_span!("environment", app = %env.app_name, environment = %env.environment_name);
        async {
            let start = Instant::now();
            self.event_sink.try_emit(
                "environment.deploy.started",
                Some(serde_json::json!({
                    "environment": &env.environment_name,
                    "services": env.services.len(),
                })),
            );

            let errors = self.check(env);
            if !errors.is_empty() {
                let message = errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("\n");
                error!(errors = errors.len(), "environment failed validation");
                self.emit_failed("environment.deploy.failed", env, &message);
                return EnvironmentDeployResult::failure(
                    message,
                    Some(PipewrightError::InvalidSpec { errors }),
                );
            }

            match self.deploy_levels(env, cloud).await {
                Ok(deployed) => {
                    info!(
                        services = deployed.len(),
                        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                        "environment deployed"
                    );
                    self.event_sink.try_emit(
                        "environment.deploy.completed",
                        Some(serde_json::json!({
                            "environment": &env.environment_name,
                            "duration_ms": start.elapsed().as_secs_f64() * 1000.0,
                        })),
                    );
                    EnvironmentDeployResult::success(deployed)
                }
                Err(err) => {
                    error!(error = %err, "environment deploy failed");
                    let message = format!("failed to deploy environment '{}': {err}", env.environment_name);
                    self.emit_failed("environment.deploy.failed", env, &message);
                    EnvironmentDeployResult::failure(message, Some(err))
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Deletes the environment in exact reverse order.
    ///
    /// Never returns an error; failures end up in the result.
    pub async fn delete(&self, env: &EnvironmentContext, cloud: &CloudContext) -> EnvironmentDeleteResult {
        let span = info_span!("environment", app = %env.app_name, environment = %env.environment_name);
        async {
            self.event_sink.try_emit(
                "environment.delete.started",
                Some(serde_json::json!({ "environment": &env.environment_name })),
            );

            match self.delete_levels(env, cloud).await {
                Ok(()) => {
                    info!("environment deleted");
                    self.event_sink.try_emit(
                        "environment.delete.completed",
                        Some(serde_json::json!({ "environment": &env.environment_name })),
                    );
                    EnvironmentDeleteResult::success()
                }
                Err(err) => {
                    error!(error = %err, "environment delete failed");
                    let message = format!("failed to delete environment '{}': {err}", env.environment_name);
                    self.emit_failed("environment.delete.failed", env, &message);
                    EnvironmentDeleteResult::failure(message, Some(err))
                }
            }
        }
        .instrument(span)
        .await
    }

    fn emit_failed(&self, event_type: &str, env: &EnvironmentContext, message: &str) {
        self.event_sink.try_emit(
            event_type,
            Some(serde_json::json!({
                "environment": &env.environment_name,
                "error": message,
            })),
        );
    }

    fn prepare(
        &self,
        env: &EnvironmentContext,
    ) -> Result<(EnvironmentGraph, BTreeMap<String, ServiceEntry>), PipewrightError> {
        let graph = EnvironmentGraph::build(env.services.clone(), self.resolver.as_ref())?;
        let mut entries = BTreeMap::new();
        for (name, spec) in graph.services() {
            let deployer = self.registry.get(&spec.service_type)?;
            let ctx = Arc::new(env.service_context(spec));
            entries.insert(name.clone(), ServiceEntry { deployer, ctx });
        }
        Ok((graph, entries))
    }

    async fn deploy_levels(
        &self,
        env: &EnvironmentContext,
        cloud: &CloudContext,
    ) -> Result<BTreeMap<String, DeployContext>, PipewrightError> {
        let (graph, entries) = self.prepare(env)?;

        let pre_deploy = Arc::new(
            self.run_stage(LifecycleStage::PreDeploy, 0, entries.values().cloned().collect(), {
                let cloud = cloud.clone();
                move |entry: ServiceEntry| {
                    let cloud = cloud.clone();
                    async move { entry.deployer.pre_deploy(&entry.ctx, &cloud).await }
                }
            })
            .await?,
        );

        let mut deployed: BTreeMap<String, DeployContext> = BTreeMap::new();
        for (index, level) in graph.levels().iter().enumerate() {
            let members: Vec<ServiceEntry> = level.iter().filter_map(|name| entries.get(name).cloned()).collect();
            debug!(level = index, services = ?level, "deploying level");

            let binds = Arc::new(
                self.run_stage(LifecycleStage::Bind, index, members.clone(), {
                    let cloud = cloud.clone();
                    let pre_deploy = Arc::clone(&pre_deploy);
                    move |entry: ServiceEntry| {
                        let cloud = cloud.clone();
                        let pre_deploy = Arc::clone(&pre_deploy);
                        async move {
                            let own = own_pre_deploy(&pre_deploy, entry.name());
                            entry.deployer.bind(&entry.ctx, &own, &pre_deploy, &cloud).await
                        }
                    }
                })
                .await?,
            );

            let previous = Arc::new(deployed.clone());
            let results = self
                .run_stage(LifecycleStage::Deploy, index, members, {
                    let cloud = cloud.clone();
                    let pre_deploy = Arc::clone(&pre_deploy);
                    move |entry: ServiceEntry| {
                        let cloud = cloud.clone();
                        let pre_deploy = Arc::clone(&pre_deploy);
                        let binds = Arc::clone(&binds);
                        let previous = Arc::clone(&previous);
                        async move {
                            let own_pre = own_pre_deploy(&pre_deploy, entry.name());
                            let own_bind = binds
                                .get(entry.name())
                                .cloned()
                                .unwrap_or_else(|| BindContext::new(entry.name()));
                            entry
                                .deployer
                                .deploy(&entry.ctx, &own_pre, &own_bind, &previous, &cloud)
                                .await
                        }
                    }
                })
                .await?;

            deployed.extend(results);
        }

        Ok(deployed)
    }

    async fn delete_levels(&self, env: &EnvironmentContext, cloud: &CloudContext) -> Result<(), PipewrightError> {
        let (graph, entries) = self.prepare(env)?;

        for (index, level) in graph.levels().iter().enumerate().rev() {
            let members: Vec<ServiceEntry> = level.iter().filter_map(|name| entries.get(name).cloned()).collect();
            debug!(level = index, services = ?level, "deleting level");

            self.run_stage(LifecycleStage::UnDeploy, index, members.clone(), {
                let cloud = cloud.clone();
                move |entry: ServiceEntry| {
                    let cloud = cloud.clone();
                    async move { entry.deployer.un_deploy(&entry.ctx, &cloud).await }
                }
            })
            .await?;

            self.run_stage(LifecycleStage::UnBind, index, members, {
                let cloud = cloud.clone();
                move |entry: ServiceEntry| {
                    let cloud = cloud.clone();
                    async move { entry.deployer.un_bind(&entry.ctx, &cloud).await }
                }
            })
            .await?;
        }

        self.run_stage(LifecycleStage::UnPreDeploy, 0, entries.values().cloned().collect(), {
            let cloud = cloud.clone();
            move |entry: ServiceEntry| {
                let cloud = cloud.clone();
                async move { entry.deployer.un_pre_deploy(&entry.ctx, &cloud).await }
            }
        })
        .await?;

        Ok(())
    }

    /// Runs `task` for every member concurrently and waits for all of them.
    async fn run_stage<T, F, Fut>(
        &self,
        stage: LifecycleStage,
        level: usize,
        members: Vec<ServiceEntry>,
        task: F,
    ) -> Result<BTreeMap<String, T>, PipewrightError>
    where
        T: Send + 'static,
        F: Fn(ServiceEntry) -> Fut,
        Fut: Future<Output = Result<T, PipewrightError>> + Send + 'static,
    {
        let limit = self.config.max_concurrency_per_level;
        let semaphore = (limit > 0).then(|| Arc::new(Semaphore::new(limit)));
        let mut tasks = FuturesUnordered::new();

        for entry in members {
            let name = entry.name().to_string();
            let semaphore = semaphore.clone();
            let work = task(entry);
            let span = info_span!("service", service = %name, stage = %stage, level);
            let handle = tokio::spawn(
                async move {
                    let _permit = match semaphore {
                        Some(semaphore) => semaphore.acquire_owned().await.ok(),
                        None => None,
                    };
                    work.await
                }
                .instrument(span),
            );
            tasks.push(async move { (name, handle.await) });
        }

        let mut outputs = BTreeMap::new();
        let mut failures = Vec::new();
        while let Some((service, joined)) = tasks.next().await {
            let result = joined.unwrap_or_else(|err| Err(PipewrightError::TaskJoin(err.to_string())));
            match result {
                Ok(value) => {
                    debug!(service = %service, stage = %stage, level, "service stage completed");
                    self.event_sink.try_emit(
                        &format!("service.{stage}.completed"),
                        Some(serde_json::json!({ "service": &service, "level": level })),
                    );
                    outputs.insert(service, value);
                }
                Err(error) => {
                    error!(service = %service, stage = %stage, level, error = %error, "service stage failed");
                    self.event_sink.try_emit(
                        &format!("service.{stage}.failed"),
                        Some(serde_json::json!({
                            "service": &service,
                            "level": level,
                            "error": error.to_string(),
                        })),
                    );
                    failures.push(ServiceFailure { service, error });
                }
            }
        }

        if failures.is_empty() {
            Ok(outputs)
        } else {
            failures.sort_by(|a, b| a.service.cmp(&b.service));
            Err(PipewrightError::LevelFailed { stage, level, failures })
        }
    }
}

fn own_pre_deploy(all: &BTreeMap<String, PreDeployContext>, name: &str) -> PreDeployContext {
    all.get(name).cloned().unwrap_or_else(|| PreDeployContext::new(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::{AdapterOperation, CloudError, ResourceKind};
    use crate::events::CollectingEventSink;
    use crate::graph::{LevelResolver, ServiceSpec};
    use crate::testing::{in_memory_cloud, CallPhase, FailingServiceDeployer, RecordingServiceDeployer};
    use pretty_assertions::assert_eq;

    fn chain_env() -> EnvironmentContext {
        let services = [
            ServiceSpec::new("db", "recorded"),
            ServiceSpec::new("api", "recorded").with_dependency("db"),
            ServiceSpec::new("web", "recorded").with_dependency("api"),
        ]
        .into_iter()
        .map(|s| (s.name.clone(), s))
        .collect();
        EnvironmentContext::new("shop", "main", "dev", services)
    }

    fn orchestrator(registry: ServiceDeployerRegistry, sink: Arc<dyn EventSink>) -> EnvironmentOrchestrator {
        EnvironmentOrchestrator::new(Arc::new(registry), Arc::new(LevelResolver), sink)
    }

    #[tokio::test]
    async fn test_deploy_follows_levels() {
        let recorder = Arc::new(RecordingServiceDeployer::new());
        let registry = ServiceDeployerRegistry::new().with("recorded", recorder.clone());
        let orch = orchestrator(registry, Arc::new(CollectingEventSink::new()));
        let (cloud, _) = in_memory_cloud();

        let result = orch.deploy(&chain_env(), &cloud).await;
        assert!(result.is_success(), "{:?}", result.message);

        let log = recorder.log();
        let pos = |phase: CallPhase, stage: LifecycleStage, service: &str| {
            log.iter()
                .position(|c| c.phase == phase && c.stage == stage && c.service == service)
                .unwrap()
        };

        for service in ["db", "api", "web"] {
            assert!(
                pos(CallPhase::End, LifecycleStage::PreDeploy, service)
                    < pos(CallPhase::Begin, LifecycleStage::Bind, "db")
            );
        }
        assert!(
            pos(CallPhase::End, LifecycleStage::Deploy, "db") < pos(CallPhase::Begin, LifecycleStage::Bind, "api")
        );
        assert!(
            pos(CallPhase::End, LifecycleStage::Deploy, "api") < pos(CallPhase::Begin, LifecycleStage::Bind, "web")
        );
        assert!(
            pos(CallPhase::End, LifecycleStage::Bind, "api") < pos(CallPhase::Begin, LifecycleStage::Deploy, "api")
        );

        assert_eq!(recorder.visible_to("db"), Vec::<String>::new());
        assert_eq!(recorder.visible_to("api"), vec!["db".to_string()]);
        assert_eq!(recorder.visible_to("web"), vec!["api".to_string(), "db".to_string()]);

        assert_eq!(result.deploy_contexts.len(), 3);
        assert_eq!(result.environment_variables.get("API_RECORDED").map(String::as_str), Some("api"));
        assert_eq!(result.policies.len(), 3);
    }

    #[tokio::test]
    async fn test_delete_is_exact_reverse() {
        let recorder = Arc::new(RecordingServiceDeployer::new());
        let registry = ServiceDeployerRegistry::new().with("recorded", recorder.clone());
        let orch = orchestrator(registry, Arc::new(CollectingEventSink::new()));
        let (cloud, _) = in_memory_cloud();

        let result = orch.delete(&chain_env(), &cloud).await;
        assert!(result.is_success());

        let log = recorder.log();
        let pos = |phase: CallPhase, stage: LifecycleStage, service: &str| {
            log.iter()
                .position(|c| c.phase == phase && c.stage == stage && c.service == service)
                .unwrap()
        };

        assert!(
            pos(CallPhase::End, LifecycleStage::UnDeploy, "web") < pos(CallPhase::Begin, LifecycleStage::UnBind, "web")
        );
        assert!(
            pos(CallPhase::End, LifecycleStage::UnBind, "web") < pos(CallPhase::Begin, LifecycleStage::UnDeploy, "api")
        );
        assert!(
            pos(CallPhase::End, LifecycleStage::UnBind, "api") < pos(CallPhase::Begin, LifecycleStage::UnDeploy, "db")
        );

        let un_pre: Vec<_> = log
            .iter()
            .filter(|c| c.stage == LifecycleStage::UnPreDeploy && c.phase == CallPhase::Begin)
            .collect();
        assert_eq!(un_pre.len(), 3);
        let first_un_pre = pos(CallPhase::Begin, LifecycleStage::UnPreDeploy, "db")
            .min(pos(CallPhase::Begin, LifecycleStage::UnPreDeploy, "api"))
            .min(pos(CallPhase::Begin, LifecycleStage::UnPreDeploy, "web"));
        assert!(pos(CallPhase::End, LifecycleStage::UnBind, "db") < first_un_pre);
    }

    #[tokio::test]
    async fn test_failure_stops_later_levels() {
        let recorder = Arc::new(RecordingServiceDeployer::new());
        let registry = ServiceDeployerRegistry::new()
            .with("recorded", recorder.clone())
            .with("broken", Arc::new(FailingServiceDeployer::new(LifecycleStage::Deploy, "boom")));
        let sink = Arc::new(CollectingEventSink::new());
        let orch = orchestrator(registry, sink.clone());
        let (cloud, _) = in_memory_cloud();

        let services = [
            ServiceSpec::new("db", "broken"),
            ServiceSpec::new("cache", "recorded"),
            ServiceSpec::new("api", "recorded").with_dependency("db"),
        ]
        .into_iter()
        .map(|s| (s.name.clone(), s))
        .collect();
        let env = EnvironmentContext::new("shop", "main", "dev", services);

        let result = orch.deploy(&env, &cloud).await;
        assert!(!result.is_success());
        match result.error.as_deref() {
            Some(PipewrightError::LevelFailed { stage, level, failures }) => {
                assert_eq!(*stage, LifecycleStage::Deploy);
                assert_eq!(*level, 0);
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].service, "db");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(recorder.calls_for("cache").contains(&LifecycleStage::Deploy));
        assert!(!recorder.calls_for("api").contains(&LifecycleStage::Bind));
        assert_eq!(sink.events_of_type("environment.deploy.failed").len(), 1);
    }

    #[tokio::test]
    async fn test_level_reports_every_failure() {
        let registry = ServiceDeployerRegistry::new()
            .with("broken", Arc::new(FailingServiceDeployer::new(LifecycleStage::Bind, "nope")));
        let orch = orchestrator(registry, Arc::new(CollectingEventSink::new()));
        let (cloud, _) = in_memory_cloud();
        let services = [ServiceSpec::new("a", "broken"), ServiceSpec::new("b", "broken")]
            .into_iter()
            .map(|s| (s.name.clone(), s))
            .collect();

        let result = orch.deploy(&EnvironmentContext::new("shop", "main", "dev", services), &cloud).await;
        match result.error.as_deref() {
            Some(PipewrightError::LevelFailed { failures, .. }) => {
                let names: Vec<_> = failures.iter().map(|f| f.service.as_str()).collect();
                assert_eq!(names, vec!["a", "b"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_teardown_failure_becomes_failure_result() {
        let registry = ServiceDeployerRegistry::builtin();
        let orch = orchestrator(registry, Arc::new(CollectingEventSink::new()));
        let (cloud, adapters) = in_memory_cloud();
        let services = [ServiceSpec::new("files", "s3")]
            .into_iter()
            .map(|s| (s.name.clone(), s))
            .collect();
        let env = EnvironmentContext::new("shop", "main", "dev", services);

        assert!(orch.deploy(&env, &cloud).await.is_success());

        adapters.adapter(ResourceKind::Bucket).fail_on(
            AdapterOperation::Delete,
            CloudError::rejected(ResourceKind::Bucket, "shop-dev-files-s3", "bucket not empty"),
        );
        let result = orch.delete(&env, &cloud).await;
        assert!(!result.is_success());
        let cause = result.error.as_deref().unwrap();
        assert!(cause.to_string().contains("bucket not empty"));
        assert!(result.message.unwrap().contains("un-deploy"));
    }

    #[tokio::test]
    async fn test_invalid_environment_makes_no_calls() {
        let recorder = Arc::new(RecordingServiceDeployer::new());
        let registry = ServiceDeployerRegistry::new().with("recorded", recorder.clone());
        let orch = orchestrator(registry, Arc::new(CollectingEventSink::new()));
        let (cloud, _) = in_memory_cloud();
        let services = [
            ServiceSpec::new("a", "recorded").with_dependency("ghost"),
            ServiceSpec::new("b", "efs"),
        ]
        .into_iter()
        .map(|s| (s.name.clone(), s))
        .collect();
        let env = EnvironmentContext::new("shop", "main", "dev", services);

        let errors = orch.check(&env);
        assert_eq!(errors.len(), 2);

        let result = orch.deploy(&env, &cloud).await;
        assert!(!result.is_success());
        assert!(result.error.as_deref().unwrap().is_validation());
        assert!(recorder.log().is_empty());
    }

    #[tokio::test]
    async fn test_bounded_concurrency_still_completes() {
        let recorder = Arc::new(RecordingServiceDeployer::new());
        let registry = ServiceDeployerRegistry::new().with("recorded", recorder.clone());
        let orch = orchestrator(registry, Arc::new(CollectingEventSink::new()))
            .with_config(
                OrchestratorConfig::new()
                    .with_allowed_services(["recorded"])
                    .with_max_concurrency_per_level(1),
            );
        let (cloud, _) = in_memory_cloud();
        let services = (0..5)
            .map(|i| ServiceSpec::new(format!("svc{i}"), "recorded"))
            .map(|s| (s.name.clone(), s))
            .collect();

        let result = orch.deploy(&EnvironmentContext::new("shop", "main", "dev", services), &cloud).await;
        assert!(result.is_success());
        assert_eq!(result.deploy_contexts.len(), 5);
    }

    #[tokio::test]
    async fn test_config_restricts_service_types() {
        let orch = orchestrator(ServiceDeployerRegistry::builtin(), Arc::new(CollectingEventSink::new()))
            .with_config(OrchestratorConfig::new().with_allowed_services(["s3"]));
        let (cloud, adapters) = in_memory_cloud();
        let services = [ServiceSpec::new("files", "s3"), ServiceSpec::new("orders", "dynamodb")]
            .into_iter()
            .map(|s| (s.name.clone(), s))
            .collect();
        let env = EnvironmentContext::new("shop", "main", "dev", services);

        assert_eq!(orch.registry().types(), vec!["s3"]);
        let errors = orch.check(&env);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "service 'orders': service type 'dynamodb' is not supported");

        let result = orch.deploy(&env, &cloud).await;
        assert!(!result.is_success());
        assert_eq!(adapters.total_mutations(), 0);
    }
}
