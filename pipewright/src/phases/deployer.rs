//! The per-phase-type capability contract.

use super::{PhaseActionSpec, PhaseContext, PhaseSpec, SecretQuestion};
use crate::errors::PipewrightError;
use crate::orchestrator::CloudContext;
use async_trait::async_trait;

/// One implementation per phase type tag.
#[async_trait]
pub trait PhaseDeployer: Send + Sync {
    /// Validates the phase parameters. Pure; never touches the cloud.
    fn check(&self, phase: &PhaseSpec) -> Vec<String>;

    /// Secrets the phase needs. All of them are required.
    fn secret_questions(&self, _phase: &PhaseSpec) -> Vec<SecretQuestion> {
        Vec::new()
    }

    /// Whether the phase produces an artifact for later phases.
    fn produces_artifact(&self) -> bool {
        false
    }

    /// Provisions what the phase needs and returns its pipeline action.
    async fn deploy_phase(&self, ctx: &PhaseContext, cloud: &CloudContext) -> Result<PhaseActionSpec, PipewrightError>;

    /// Removes what `deploy_phase` provisioned. Must succeed if already gone.
    async fn delete_phase(&self, ctx: &PhaseContext, cloud: &CloudContext) -> Result<(), PipewrightError>;

    /// Registers external triggers once the pipeline exists.
    async fn add_webhooks(&self, _ctx: &PhaseContext, _cloud: &CloudContext) -> Result<(), PipewrightError> {
        Ok(())
    }

    /// Removes the triggers added by `add_webhooks`.
    async fn remove_webhooks(&self, _ctx: &PhaseContext, _cloud: &CloudContext) -> Result<(), PipewrightError> {
        Ok(())
    }
}
