//! CodeCommit source phase.

use crate::errors::PipewrightError;
use crate::orchestrator::CloudContext;
use crate::phases::{ActionCategory, PhaseActionSpec, PhaseContext, PhaseDeployer, PhaseSpec};
use async_trait::async_trait;

/// Pulls a branch from a CodeCommit repository.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodeCommitPhase;

#[async_trait]
impl PhaseDeployer for CodeCommitPhase {
    fn check(&self, phase: &PhaseSpec) -> Vec<String> {
        phase.require_str_params(&["repo", "branch"])
    }

    fn produces_artifact(&self) -> bool {
        true
    }

    async fn deploy_phase(&self, ctx: &PhaseContext, _cloud: &CloudContext) -> Result<PhaseActionSpec, PipewrightError> {
        Ok(
            PhaseActionSpec::for_phase(ctx, ActionCategory::Source, "AWS", "CodeCommit")
                .with_configuration("RepositoryName", ctx.param_str("repo").unwrap_or_default())
                .with_configuration("BranchName", ctx.param_str("branch").unwrap_or_default()),
        )
    }

    async fn delete_phase(&self, _ctx: &PhaseContext, _cloud: &CloudContext) -> Result<(), PipewrightError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::in_memory_cloud;

    #[tokio::test]
    async fn test_action_names_repository() {
        let (cloud, memory) = in_memory_cloud();
        let phase = PhaseSpec::new("source", "codecommit")
            .with_position(1)
            .with_param("repo", serde_json::json!("shop"))
            .with_param("branch", serde_json::json!("main"));
        assert!(CodeCommitPhase.check(&phase).is_empty());

        let ctx = PhaseContext::new("shop", "main", &phase);
        let action = CodeCommitPhase.deploy_phase(&ctx, &cloud).await.unwrap();
        assert_eq!(action.provider, "CodeCommit");
        assert_eq!(action.configuration["RepositoryName"], "shop");
        assert_eq!(memory.total_mutations(), 0);
    }

    #[test]
    fn test_check_requires_branch() {
        let phase = PhaseSpec::new("source", "codecommit").with_param("repo", serde_json::json!("shop"));
        assert_eq!(CodeCommitPhase.check(&phase), vec!["the 'branch' parameter is required".to_string()]);
    }
}
