//! Manual approval phase.

use crate::errors::PipewrightError;
use crate::orchestrator::CloudContext;
use crate::phases::{ActionCategory, PhaseActionSpec, PhaseContext, PhaseDeployer, PhaseSpec};
use async_trait::async_trait;

/// Pauses the pipeline until someone approves.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApprovalPhase;

#[async_trait]
impl PhaseDeployer for ApprovalPhase {
    fn check(&self, phase: &PhaseSpec) -> Vec<String> {
        match phase.param("message") {
            Some(value) if !value.is_string() => vec!["the 'message' parameter must be a string".to_string()],
            _ => Vec::new(),
        }
    }

    async fn deploy_phase(&self, ctx: &PhaseContext, _cloud: &CloudContext) -> Result<PhaseActionSpec, PipewrightError> {
        let action = PhaseActionSpec::for_phase(ctx, ActionCategory::Approval, "AWS", "Manual").without_inputs();
        Ok(match ctx.param_str("message") {
            Some(message) => action.with_configuration("CustomData", message),
            None => action,
        })
    }

    async fn delete_phase(&self, _ctx: &PhaseContext, _cloud: &CloudContext) -> Result<(), PipewrightError> {
        Ok(())
    }
}
