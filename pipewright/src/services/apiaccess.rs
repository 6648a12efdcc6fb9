//! Access grants to provider APIs. Provisions nothing.

use crate::core::{BindContext, DeployContext, PreDeployContext, ServiceContext};
use crate::errors::PipewrightError;
use crate::orchestrator::{CloudContext, ServiceDeployer};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// The `apiaccess` service type.
///
/// Params: `aws_services` (required, non-empty list of service prefixes).
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiAccessService;

fn listed_services(ctx: &ServiceContext) -> Vec<&str> {
    ctx.spec
        .params
        .get("aws_services")
        .and_then(serde_json::Value::as_array)
        .map(|items| items.iter().filter_map(serde_json::Value::as_str).collect())
        .unwrap_or_default()
}

#[async_trait]
impl ServiceDeployer for ApiAccessService {
    fn check(&self, ctx: &ServiceContext) -> Vec<String> {
        match ctx.spec.params.get("aws_services").and_then(serde_json::Value::as_array) {
            None => vec!["'aws_services' is required".to_string()],
            Some(items) if items.is_empty() => vec!["'aws_services' must list at least one service".to_string()],
            Some(items) if items.iter().any(|i| !i.is_string()) => {
                vec!["'aws_services' must be a list of strings".to_string()]
            }
            Some(_) => Vec::new(),
        }
    }

    async fn deploy(
        &self,
        ctx: &ServiceContext,
        _own_pre_deploy: &PreDeployContext,
        _own_bind: &BindContext,
        _deployed: &BTreeMap<String, DeployContext>,
        _cloud: &CloudContext,
    ) -> Result<DeployContext, PipewrightError> {
        let deployed = listed_services(ctx)
            .into_iter()
            .fold(DeployContext::new(ctx), |deployed, service| {
                deployed.with_policy(serde_json::json!({
                    "Effect": "Allow",
                    "Action": [format!("{service}:*")],
                    "Resource": ["*"],
                }))
            });
        Ok(deployed)
    }

    async fn un_deploy(&self, _ctx: &ServiceContext, _cloud: &CloudContext) -> Result<(), PipewrightError> {
        Ok(())
    }
}
