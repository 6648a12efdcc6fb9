//! CodeBuild build phase.

use super::common::{
    build_project_spec, build_role_policy, check_extra_resources, check_string_map_param, delete_extra_resources,
    deploy_extra_resources, ensure_build_role, string_map_param, teardown_role,
};
use crate::errors::PipewrightError;
use crate::orchestrator::{CloudContext, EnvironmentOrchestrator};
use crate::phases::{ActionCategory, PhaseActionSpec, PhaseContext, PhaseDeployer, PhaseSpec};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Runs a build project, optionally backed by extra environment resources.
#[derive(Debug, Clone)]
pub struct CodeBuildPhase {
    environments: Arc<EnvironmentOrchestrator>,
}

impl CodeBuildPhase {
    /// Creates the phase. `environments` provisions `extra_resources`.
    #[must_use]
    pub fn new(environments: Arc<EnvironmentOrchestrator>) -> Self {
        Self { environments }
    }
}

#[async_trait]
impl PhaseDeployer for CodeBuildPhase {
    fn check(&self, phase: &PhaseSpec) -> Vec<String> {
        let mut errors = phase.require_str_params(&["build_image"]);
        errors.extend(check_string_map_param(phase, "environment_variables"));
        errors.extend(check_extra_resources(&self.environments, phase));
        errors
    }

    fn produces_artifact(&self) -> bool {
        true
    }

    async fn deploy_phase(&self, ctx: &PhaseContext, cloud: &CloudContext) -> Result<PhaseActionSpec, PipewrightError> {
        let project_name = ctx.resource_name();
        let mut environment = string_map_param(&ctx.params, "environment_variables");
        let mut policies = Vec::new();

        if let Some(extra) = deploy_extra_resources(&self.environments, ctx, cloud).await? {
            info!(phase = %ctx.phase_name, services = extra.deploy_contexts.len(), "extra resources deployed");
            environment.extend(extra.environment_variables);
            policies = extra.policies;
        }

        let role_arn = ensure_build_role(cloud, &project_name, build_role_policy(ctx, cloud, &policies)).await?;
        let spec = build_project_spec(
            &project_name,
            &role_arn,
            ctx.param_str("build_image").unwrap_or_default(),
            &environment,
            &ctx.artifact_bucket,
        );
        cloud.adapters.build_projects().reconcile(&spec).await?;

        Ok(PhaseActionSpec::for_phase(ctx, ActionCategory::Build, "AWS", "CodeBuild")
            .with_configuration("ProjectName", project_name))
    }

    async fn delete_phase(&self, ctx: &PhaseContext, cloud: &CloudContext) -> Result<(), PipewrightError> {
        let project_name = ctx.resource_name();
        cloud.adapters.build_projects().teardown(&project_name).await?;
        delete_extra_resources(&self.environments, ctx, cloud).await?;
        teardown_role(cloud, &project_name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::ResourceKind;
    use crate::testing::{environment_orchestrator, in_memory_cloud};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn phase() -> PhaseSpec {
        PhaseSpec::new("build", "codebuild")
            .with_position(2)
            .with_param("build_image", json!("aws/codebuild/standard:7.0"))
            .with_param("environment_variables", json!({"STAGE": "ci", "RETRIES": 3}))
            .with_param(
                "extra_resources",
                json!({"cache": {"type": "s3", "bucket_name": "shop-build-cache"}}),
            )
    }

    fn context() -> PhaseContext {
        PhaseContext::new("shop", "main", &phase())
            .with_artifacts(Some("Output_source".to_string()), Some("Output_build".to_string()))
            .with_artifact_bucket("codepipeline-us-west-2-111111111111")
    }

    #[test]
    fn test_check_validates_extra_resources() {
        let deployer = CodeBuildPhase::new(Arc::new(environment_orchestrator()));
        assert!(deployer.check(&phase()).is_empty());

        let bad = PhaseSpec::new("build", "codebuild")
            .with_param("extra_resources", json!({"queue": {"type": "sqs"}}));
        let errors = deployer.check(&bad);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0], "the 'build_image' parameter is required");
        assert!(errors[1].contains("sqs"));
    }

    #[tokio::test]
    async fn test_extra_resource_env_vars_reach_the_project() {
        let (cloud, memory) = in_memory_cloud();
        let deployer = CodeBuildPhase::new(Arc::new(environment_orchestrator()));

        let action = deployer.deploy_phase(&context(), &cloud).await.unwrap();
        assert_eq!(action.configuration["ProjectName"], "shop-main-build");
        assert_eq!(action.run_order, 2);

        let project = memory.adapter(ResourceKind::BuildProject).resource("shop-main-build").unwrap();
        let env = &project.spec.config["environment_variables"];
        assert_eq!(env["STAGE"], "ci");
        assert_eq!(env["RETRIES"], "3");
        assert_eq!(env["CACHE_BUCKET_NAME"], "shop-build-cache");

        let policy = memory.adapter(ResourceKind::Policy).resource("shop-main-build").unwrap();
        let statements = policy.spec.config["document"]["Statement"].as_array().unwrap().len();
        assert_eq!(statements, 4);
    }

    #[tokio::test]
    async fn test_delete_removes_everything_it_created() {
        let (cloud, memory) = in_memory_cloud();
        let deployer = CodeBuildPhase::new(Arc::new(environment_orchestrator()));
        deployer.deploy_phase(&context(), &cloud).await.unwrap();

        deployer.delete_phase(&context(), &cloud).await.unwrap();
        assert!(memory.is_empty());

        deployer.delete_phase(&context(), &cloud).await.unwrap();
    }
}
