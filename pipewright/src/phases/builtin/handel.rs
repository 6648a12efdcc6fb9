//! Deploy phase: a build project that deploys named environments.

use super::common::{
    build_project_spec, check_extra_resources, delete_extra_resources, deploy_extra_resources, CODEBUILD_PRINCIPAL,
};
use crate::cloud::ensure_service_role;
use crate::errors::PipewrightError;
use crate::orchestrator::{CloudContext, EnvironmentOrchestrator};
use crate::phases::{ActionCategory, PhaseActionSpec, PhaseContext, PhaseDeployer, PhaseSpec};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Shared role every deploy phase project runs as.
pub const DEPLOY_PHASE_ROLE: &str = "PipewrightDeployPhaseServiceRole";

const DEPLOY_IMAGE: &str = "aws/codebuild/standard:7.0";

/// Runs the deploy tool against the environments named in `environments_to_deploy`.
#[derive(Debug, Clone)]
pub struct HandelPhase {
    environments: Arc<EnvironmentOrchestrator>,
}

impl HandelPhase {
    /// Creates the phase. `environments` provisions `extra_resources`.
    #[must_use]
    pub fn new(environments: Arc<EnvironmentOrchestrator>) -> Self {
        Self { environments }
    }
}

fn environments_to_deploy(params: &serde_json::Map<String, Value>) -> Vec<String> {
    params
        .get("environments_to_deploy")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}

#[async_trait]
impl PhaseDeployer for HandelPhase {
    fn check(&self, phase: &PhaseSpec) -> Vec<String> {
        let mut errors = Vec::new();
        match phase.param("environments_to_deploy") {
            None | Some(Value::Null) => {
                errors.push("the 'environments_to_deploy' parameter is required".to_string());
            }
            Some(Value::Array(items)) if !items.is_empty() && items.iter().all(Value::is_string) => {}
            Some(_) => {
                errors.push("the 'environments_to_deploy' parameter must be a non-empty list of names".to_string());
            }
        }
        errors.extend(check_extra_resources(&self.environments, phase));
        errors
    }

    async fn deploy_phase(&self, ctx: &PhaseContext, cloud: &CloudContext) -> Result<PhaseActionSpec, PipewrightError> {
        let mut environment = BTreeMap::new();
        if let Some(extra) = deploy_extra_resources(&self.environments, ctx, cloud).await? {
            environment.extend(extra.environment_variables);
        }
        environment.insert("ENVS_TO_DEPLOY".to_string(), environments_to_deploy(&ctx.params).join(","));
        environment.insert("PIPEWRIGHT_ACCOUNT_CONFIG".to_string(), cloud.account().encoded()?);

        let role = ensure_service_role(
            &cloud.adapters,
            cloud.account(),
            DEPLOY_PHASE_ROLE,
            &[CODEBUILD_PRINCIPAL],
            json!({
                "Version": "2012-10-17",
                "Statement": [{ "Effect": "Allow", "Action": "*", "Resource": "*" }],
            }),
        )
        .await?;

        let project_name = ctx.resource_name();
        let spec = build_project_spec(&project_name, &role.arn, DEPLOY_IMAGE, &environment, &ctx.artifact_bucket);
        cloud.adapters.build_projects().reconcile(&spec).await?;

        Ok(PhaseActionSpec::for_phase(ctx, ActionCategory::Test, "AWS", "CodeBuild")
            .with_configuration("ProjectName", project_name))
    }

    async fn delete_phase(&self, ctx: &PhaseContext, cloud: &CloudContext) -> Result<(), PipewrightError> {
        cloud.adapters.build_projects().teardown(&ctx.resource_name()).await?;
        delete_extra_resources(&self.environments, ctx, cloud).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::ResourceKind;
    use crate::testing::{environment_orchestrator, in_memory_cloud};
    use pretty_assertions::assert_eq;

    fn phase(envs: Value) -> PhaseSpec {
        PhaseSpec::new("deploy", "handel")
            .with_position(4)
            .with_param("environments_to_deploy", envs)
    }

    #[test]
    fn test_check_requires_non_empty_list() {
        let deployer = HandelPhase::new(Arc::new(environment_orchestrator()));
        assert!(deployer.check(&phase(json!(["dev"]))).is_empty());
        assert_eq!(deployer.check(&phase(json!([]))).len(), 1);
        assert_eq!(deployer.check(&phase(json!("dev"))).len(), 1);
        assert_eq!(
            deployer.check(&PhaseSpec::new("deploy", "handel")),
            vec!["the 'environments_to_deploy' parameter is required".to_string()]
        );
    }

    #[tokio::test]
    async fn test_project_carries_envs_and_account() {
        let (cloud, memory) = in_memory_cloud();
        let deployer = HandelPhase::new(Arc::new(environment_orchestrator()));
        let ctx = PhaseContext::new("shop", "main", &phase(json!(["dev", "qa"])));

        let action = deployer.deploy_phase(&ctx, &cloud).await.unwrap();
        assert_eq!(action.provider, "CodeBuild");
        assert_eq!(action.run_order, 4);

        let project = memory.adapter(ResourceKind::BuildProject).resource("shop-main-deploy").unwrap();
        let env = &project.spec.config["environment_variables"];
        assert_eq!(env["ENVS_TO_DEPLOY"], "dev,qa");
        assert_eq!(env["PIPEWRIGHT_ACCOUNT_CONFIG"], cloud.account().encoded().unwrap());

        deployer.delete_phase(&ctx, &cloud).await.unwrap();
        assert!(memory.adapter(ResourceKind::BuildProject).is_empty());
        assert!(memory.adapter(ResourceKind::Role).contains(DEPLOY_PHASE_ROLE));
    }
}
