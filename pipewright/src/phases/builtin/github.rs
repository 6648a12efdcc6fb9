//! GitHub source phase.

use crate::cloud::{ResourceKind, ResourceSpec};
use crate::errors::PipewrightError;
use crate::orchestrator::CloudContext;
use crate::phases::{ActionCategory, PhaseActionSpec, PhaseContext, PhaseDeployer, PhaseSpec, SecretQuestion};
use async_trait::async_trait;
use serde_json::json;
use tracing::info;

/// Secret holding the GitHub access token.
pub const GITHUB_TOKEN_SECRET: &str = "githubAccessToken";

/// Pulls a branch from GitHub and triggers the pipeline through a webhook.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitHubPhase;

#[async_trait]
impl PhaseDeployer for GitHubPhase {
    fn check(&self, phase: &PhaseSpec) -> Vec<String> {
        phase.require_str_params(&["owner", "repo", "branch"])
    }

    fn secret_questions(&self, phase: &PhaseSpec) -> Vec<SecretQuestion> {
        vec![SecretQuestion::new(
            phase.name.as_str(),
            GITHUB_TOKEN_SECRET,
            format!("'{}' phase - Please enter your GitHub access token", phase.name),
        )]
    }

    fn produces_artifact(&self) -> bool {
        true
    }

    async fn deploy_phase(&self, ctx: &PhaseContext, _cloud: &CloudContext) -> Result<PhaseActionSpec, PipewrightError> {
        info!(phase = %ctx.phase_name, "creating github source action");
        let token = ctx.secrets.get(GITHUB_TOKEN_SECRET).unwrap_or_default();
        Ok(
            PhaseActionSpec::for_phase(ctx, ActionCategory::Source, "ThirdParty", "GitHub")
                .with_configuration("Owner", ctx.param_str("owner").unwrap_or_default())
                .with_configuration("Repo", ctx.param_str("repo").unwrap_or_default())
                .with_configuration("Branch", ctx.param_str("branch").unwrap_or_default())
                .with_configuration("OAuthToken", token)
                .with_configuration("PollForSourceChanges", "false"),
        )
    }

    async fn delete_phase(&self, ctx: &PhaseContext, _cloud: &CloudContext) -> Result<(), PipewrightError> {
        info!(phase = %ctx.phase_name, "nothing to delete for github phase");
        Ok(())
    }

    async fn add_webhooks(&self, ctx: &PhaseContext, cloud: &CloudContext) -> Result<(), PipewrightError> {
        let spec = ResourceSpec::new(ResourceKind::Webhook, ctx.resource_name()).with_config(json!({
            "pipeline": ctx.pipeline_resource_name(),
            "target_action": ctx.phase_name,
            "owner": ctx.param_str("owner"),
            "repo": ctx.param_str("repo"),
            "branch": ctx.param_str("branch"),
            "filters": [{ "json_path": "$.ref", "match_equals": "refs/heads/{Branch}" }],
        }));
        cloud.adapters.webhooks().reconcile(&spec).await?;
        Ok(())
    }

    async fn remove_webhooks(&self, ctx: &PhaseContext, cloud: &CloudContext) -> Result<(), PipewrightError> {
        cloud.adapters.webhooks().teardown(&ctx.resource_name()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phases::SecretBundle;
    use crate::testing::in_memory_cloud;
    use pretty_assertions::assert_eq;

    fn phase() -> PhaseSpec {
        PhaseSpec::new("source", "github")
            .with_position(1)
            .with_param("owner", json!("acme"))
            .with_param("repo", json!("shop"))
            .with_param("branch", json!("main"))
    }

    #[test]
    fn test_check_lists_every_missing_param() {
        let errors = GitHubPhase.check(&PhaseSpec::new("source", "github"));
        assert_eq!(errors.len(), 3);
        assert!(GitHubPhase.check(&phase()).is_empty());
    }

    #[tokio::test]
    async fn test_deploy_and_webhooks() {
        let (cloud, memory) = in_memory_cloud();
        let ctx = PhaseContext::new("shop", "main", &phase())
            .with_secrets(SecretBundle::new().with(GITHUB_TOKEN_SECRET, "tok"))
            .with_artifacts(None, Some("Output_source".to_string()));

        let action = GitHubPhase.deploy_phase(&ctx, &cloud).await.unwrap();
        assert_eq!(action.category, ActionCategory::Source);
        assert_eq!(action.configuration["OAuthToken"], "tok");
        assert_eq!(action.output_artifacts, vec!["Output_source".to_string()]);
        assert!(action.input_artifacts.is_empty());

        GitHubPhase.add_webhooks(&ctx, &cloud).await.unwrap();
        assert!(memory.adapter(ResourceKind::Webhook).contains("shop-main-source"));

        GitHubPhase.remove_webhooks(&ctx, &cloud).await.unwrap();
        GitHubPhase.remove_webhooks(&ctx, &cloud).await.unwrap();
        assert!(memory.adapter(ResourceKind::Webhook).is_empty());
    }
}
