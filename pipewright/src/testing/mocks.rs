//! Mock deployers for testing.

use crate::cloud::{CloudError, ResourceKind, ResourceSpec};
use crate::core::{BindContext, DeployContext, LifecycleStage, PreDeployContext, ServiceContext};
use crate::errors::PipewrightError;
use crate::orchestrator::{CloudContext, ServiceDeployer};
use crate::phases::{ActionCategory, PhaseActionSpec, PhaseContext, PhaseDeployer, PhaseSpec, SecretQuestion};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};

/// Whether a record marks the start or the end of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPhase {
    /// The call started.
    Begin,
    /// The call returned.
    End,
}

/// One entry of a recorded call log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRecord {
    /// Start or end.
    pub phase: CallPhase,
    /// Lifecycle stage called.
    pub stage: LifecycleStage,
    /// Service the call was for.
    pub service: String,
}

/// A service deployer that records every call and yields inside each one.
///
/// Deploy exports `{PREFIX}_RECORDED = <service name>` and one policy.
#[derive(Debug, Default)]
pub struct RecordingServiceDeployer {
    log: Mutex<Vec<CallRecord>>,
    visible: Mutex<BTreeMap<String, Vec<String>>>,
}

impl RecordingServiceDeployer {
    /// Creates a new recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The ordered call log.
    #[must_use]
    pub fn log(&self) -> Vec<CallRecord> {
        self.log.lock().clone()
    }

    /// Names of the deploy contexts `service` saw at deploy time, sorted.
    #[must_use]
    pub fn visible_to(&self, service: &str) -> Vec<String> {
        self.visible.lock().get(service).cloned().unwrap_or_default()
    }

    /// Stages that began for `service`, in order.
    #[must_use]
    pub fn calls_for(&self, service: &str) -> Vec<LifecycleStage> {
        self.log
            .lock()
            .iter()
            .filter(|c| c.phase == CallPhase::Begin && c.service == service)
            .map(|c| c.stage)
            .collect()
    }

    /// Clears the log.
    pub fn clear(&self) {
        self.log.lock().clear();
        self.visible.lock().clear();
    }

    async fn record(&self, stage: LifecycleStage, ctx: &ServiceContext) {
        self.push(CallPhase::Begin, stage, ctx);
        tokio::task::yield_now().await;
        self.push(CallPhase::End, stage, ctx);
    }

    fn push(&self, phase: CallPhase, stage: LifecycleStage, ctx: &ServiceContext) {
        self.log.lock().push(CallRecord {
            phase,
            stage,
            service: ctx.service_name.clone(),
        });
    }
}

#[async_trait]
impl ServiceDeployer for RecordingServiceDeployer {
    fn check(&self, _ctx: &ServiceContext) -> Vec<String> {
        Vec::new()
    }

    async fn pre_deploy(&self, ctx: &ServiceContext, _cloud: &CloudContext) -> Result<PreDeployContext, PipewrightError> {
        self.record(LifecycleStage::PreDeploy, ctx).await;
        Ok(PreDeployContext::new(ctx.service_name.as_str()))
    }

    async fn bind(
        &self,
        ctx: &ServiceContext,
        _own_pre_deploy: &PreDeployContext,
        _all_pre_deploy: &BTreeMap<String, PreDeployContext>,
        _cloud: &CloudContext,
    ) -> Result<BindContext, PipewrightError> {
        self.record(LifecycleStage::Bind, ctx).await;
        Ok(BindContext::new(ctx.service_name.as_str()))
    }

    async fn deploy(
        &self,
        ctx: &ServiceContext,
        _own_pre_deploy: &PreDeployContext,
        _own_bind: &BindContext,
        deployed: &BTreeMap<String, DeployContext>,
        _cloud: &CloudContext,
    ) -> Result<DeployContext, PipewrightError> {
        self.push(CallPhase::Begin, LifecycleStage::Deploy, ctx);
        self.visible
            .lock()
            .insert(ctx.service_name.clone(), deployed.keys().cloned().collect());
        tokio::task::yield_now().await;
        self.push(CallPhase::End, LifecycleStage::Deploy, ctx);

        let mut out = DeployContext::new(ctx);
        out.add_env_var("RECORDED", ctx.service_name.as_str());
        Ok(out.with_policy(serde_json::json!({
            "Effect": "Allow",
            "Action": "recorded:*",
            "Resource": ctx.service_name,
        })))
    }

    async fn un_deploy(&self, ctx: &ServiceContext, _cloud: &CloudContext) -> Result<(), PipewrightError> {
        self.record(LifecycleStage::UnDeploy, ctx).await;
        Ok(())
    }

    async fn un_bind(&self, ctx: &ServiceContext, _cloud: &CloudContext) -> Result<(), PipewrightError> {
        self.record(LifecycleStage::UnBind, ctx).await;
        Ok(())
    }

    async fn un_pre_deploy(&self, ctx: &ServiceContext, _cloud: &CloudContext) -> Result<(), PipewrightError> {
        self.record(LifecycleStage::UnPreDeploy, ctx).await;
        Ok(())
    }
}

/// A service deployer that fails at exactly one lifecycle stage.
#[derive(Debug, Clone)]
pub struct FailingServiceDeployer {
    stage: LifecycleStage,
    message: String,
}

impl FailingServiceDeployer {
    /// Creates a deployer that fails at `stage` with `message`.
    #[must_use]
    pub fn new(stage: LifecycleStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }

    fn outcome(&self, stage: LifecycleStage, ctx: &ServiceContext) -> Result<(), PipewrightError> {
        if stage == self.stage {
            Err(CloudError::rejected(ResourceKind::Stack, ctx.resource_name(), self.message.as_str()).into())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ServiceDeployer for FailingServiceDeployer {
    fn check(&self, _ctx: &ServiceContext) -> Vec<String> {
        Vec::new()
    }

    async fn pre_deploy(&self, ctx: &ServiceContext, _cloud: &CloudContext) -> Result<PreDeployContext, PipewrightError> {
        self.outcome(LifecycleStage::PreDeploy, ctx)?;
        Ok(PreDeployContext::new(ctx.service_name.as_str()))
    }

    async fn bind(
        &self,
        ctx: &ServiceContext,
        _own_pre_deploy: &PreDeployContext,
        _all_pre_deploy: &BTreeMap<String, PreDeployContext>,
        _cloud: &CloudContext,
    ) -> Result<BindContext, PipewrightError> {
        self.outcome(LifecycleStage::Bind, ctx)?;
        Ok(BindContext::new(ctx.service_name.as_str()))
    }

    async fn deploy(
        &self,
        ctx: &ServiceContext,
        _own_pre_deploy: &PreDeployContext,
        _own_bind: &BindContext,
        _deployed: &BTreeMap<String, DeployContext>,
        _cloud: &CloudContext,
    ) -> Result<DeployContext, PipewrightError> {
        self.outcome(LifecycleStage::Deploy, ctx)?;
        Ok(DeployContext::new(ctx))
    }

    async fn un_deploy(&self, ctx: &ServiceContext, _cloud: &CloudContext) -> Result<(), PipewrightError> {
        self.outcome(LifecycleStage::UnDeploy, ctx)
    }

    async fn un_bind(&self, ctx: &ServiceContext, _cloud: &CloudContext) -> Result<(), PipewrightError> {
        self.outcome(LifecycleStage::UnBind, ctx)
    }

    async fn un_pre_deploy(&self, ctx: &ServiceContext, _cloud: &CloudContext) -> Result<(), PipewrightError> {
        self.outcome(LifecycleStage::UnPreDeploy, ctx)
    }
}

/// A phase deployer that records calls and owns one build project per phase.
///
/// Log entries read `deploy:<phase>`, `delete:<phase>`,
/// `add_webhooks:<phase>` and `remove_webhooks:<phase>`.
#[derive(Debug, Default)]
pub struct RecordingPhaseDeployer {
    produces_artifact: bool,
    secrets: Vec<String>,
    check_errors: Vec<String>,
    failing_phases: BTreeSet<String>,
    log: Mutex<Vec<String>>,
    contexts: Mutex<Vec<PhaseContext>>,
}

impl RecordingPhaseDeployer {
    /// A phase that consumes artifacts but produces none.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A phase that produces an artifact.
    #[must_use]
    pub fn producing() -> Self {
        Self {
            produces_artifact: true,
            ..Self::default()
        }
    }

    /// Requires a secret.
    #[must_use]
    pub fn with_secret(mut self, name: impl Into<String>) -> Self {
        self.secrets.push(name.into());
        self
    }

    /// Reports `message` from `check` for every phase.
    #[must_use]
    pub fn with_check_error(mut self, message: impl Into<String>) -> Self {
        self.check_errors.push(message.into());
        self
    }

    /// Fails `deploy_phase` for the named phase.
    #[must_use]
    pub fn failing_on(mut self, phase_name: impl Into<String>) -> Self {
        self.failing_phases.insert(phase_name.into());
        self
    }

    /// The ordered call log.
    #[must_use]
    pub fn log(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    /// Contexts passed to `deploy_phase`, in call order.
    #[must_use]
    pub fn contexts(&self) -> Vec<PhaseContext> {
        self.contexts.lock().clone()
    }

    fn push(&self, call: &str, ctx: &PhaseContext) {
        self.log.lock().push(format!("{call}:{}", ctx.phase_name));
    }
}

#[async_trait]
impl PhaseDeployer for RecordingPhaseDeployer {
    fn check(&self, _phase: &PhaseSpec) -> Vec<String> {
        self.check_errors.clone()
    }

    fn secret_questions(&self, phase: &PhaseSpec) -> Vec<SecretQuestion> {
        self.secrets
            .iter()
            .map(|name| SecretQuestion::new(phase.name.as_str(), name.as_str(), format!("Enter {name}")))
            .collect()
    }

    fn produces_artifact(&self) -> bool {
        self.produces_artifact
    }

    async fn deploy_phase(&self, ctx: &PhaseContext, cloud: &CloudContext) -> Result<PhaseActionSpec, PipewrightError> {
        self.push("deploy", ctx);
        self.contexts.lock().push(ctx.clone());
        if self.failing_phases.contains(&ctx.phase_name) {
            return Err(CloudError::rejected(ResourceKind::BuildProject, ctx.resource_name(), "recorded failure").into());
        }

        let spec = ResourceSpec::new(ResourceKind::BuildProject, ctx.resource_name())
            .with_config(serde_json::json!({ "phase": &ctx.phase_name }));
        cloud.adapters.build_projects().reconcile(&spec).await?;

        let category = if self.produces_artifact && ctx.input_artifact.is_none() {
            ActionCategory::Source
        } else {
            ActionCategory::Build
        };
        Ok(PhaseActionSpec::for_phase(ctx, category, "Custom", "Recorded")
            .with_configuration("ProjectName", ctx.resource_name()))
    }

    async fn delete_phase(&self, ctx: &PhaseContext, cloud: &CloudContext) -> Result<(), PipewrightError> {
        self.push("delete", ctx);
        cloud.adapters.build_projects().teardown(&ctx.resource_name()).await?;
        Ok(())
    }

    async fn add_webhooks(&self, ctx: &PhaseContext, _cloud: &CloudContext) -> Result<(), PipewrightError> {
        self.push("add_webhooks", ctx);
        Ok(())
    }

    async fn remove_webhooks(&self, ctx: &PhaseContext, _cloud: &CloudContext) -> Result<(), PipewrightError> {
        self.push("remove_webhooks", ctx);
        Ok(())
    }
}
