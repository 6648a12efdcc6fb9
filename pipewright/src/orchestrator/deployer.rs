//! The per-service-type capability contract.

use super::CloudContext;
use crate::core::{BindContext, DeployContext, PreDeployContext, ServiceContext};
use crate::errors::PipewrightError;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// One implementation per service type tag.
///
/// `pre_deploy`, `bind`, `un_bind` and `un_pre_deploy` default to no-ops.
/// Everything a deployer provisions goes through the reconcilers in
/// [`CloudContext::adapters`].
#[async_trait]
pub trait ServiceDeployer: Send + Sync {
    /// Validates the service parameters. Pure; returns one message per problem.
    fn check(&self, ctx: &ServiceContext) -> Vec<String>;

    /// Level-independent preparation.
    async fn pre_deploy(
        &self,
        ctx: &ServiceContext,
        _cloud: &CloudContext,
    ) -> Result<PreDeployContext, PipewrightError> {
        Ok(PreDeployContext::new(ctx.service_name.as_str()))
    }

    /// Wires the service to the services it depends on.
    ///
    /// `all_pre_deploy` holds the pre-deploy context of every service.
    async fn bind(
        &self,
        ctx: &ServiceContext,
        _own_pre_deploy: &PreDeployContext,
        _all_pre_deploy: &BTreeMap<String, PreDeployContext>,
        _cloud: &CloudContext,
    ) -> Result<BindContext, PipewrightError> {
        Ok(BindContext::new(ctx.service_name.as_str()))
    }

    /// Provisions the service.
    ///
    /// `deployed` holds the deploy contexts of every service in lower levels.
    async fn deploy(
        &self,
        ctx: &ServiceContext,
        own_pre_deploy: &PreDeployContext,
        own_bind: &BindContext,
        deployed: &BTreeMap<String, DeployContext>,
        cloud: &CloudContext,
    ) -> Result<DeployContext, PipewrightError>;

    /// Removes what `deploy` provisioned. Must succeed if it is already gone.
    async fn un_deploy(&self, ctx: &ServiceContext, cloud: &CloudContext) -> Result<(), PipewrightError>;

    /// Removes what `bind` added.
    async fn un_bind(&self, _ctx: &ServiceContext, _cloud: &CloudContext) -> Result<(), PipewrightError> {
        Ok(())
    }

    /// Removes what `pre_deploy` added.
    async fn un_pre_deploy(&self, _ctx: &ServiceContext, _cloud: &CloudContext) -> Result<(), PipewrightError> {
        Ok(())
    }
}
