//! DynamoDB tables, provisioned as stacks.

use crate::cloud::{ResourceKind, ResourceSpec};
use crate::core::{BindContext, DeployContext, PreDeployContext, ServiceContext};
use crate::errors::PipewrightError;
use crate::orchestrator::{CloudContext, ServiceDeployer};
use async_trait::async_trait;
use std::collections::BTreeMap;

const KEY_TYPES: [&str; 3] = ["String", "Number", "Binary"];

/// The `dynamodb` service type.
///
/// Params: `partition_key { name, type }` (required), `sort_key { name, type }`
/// (optional).
#[derive(Debug, Clone, Copy, Default)]
pub struct DynamoDbService;

fn check_key(params: &serde_json::Map<String, serde_json::Value>, field: &str, required: bool) -> Vec<String> {
    let Some(key) = params.get(field) else {
        return if required {
            vec![format!("'{field}' is required")]
        } else {
            Vec::new()
        };
    };

    let mut errors = Vec::new();
    if key.get("name").and_then(serde_json::Value::as_str).is_none() {
        errors.push(format!("'{field}.name' is required"));
    }
    match key.get("type").and_then(serde_json::Value::as_str) {
        Some(t) if KEY_TYPES.contains(&t) => {}
        _ => errors.push(format!("'{field}.type' must be one of {}", KEY_TYPES.join(", "))),
    }
    errors
}

#[async_trait]
impl ServiceDeployer for DynamoDbService {
    fn check(&self, ctx: &ServiceContext) -> Vec<String> {
        let mut errors = check_key(&ctx.spec.params, "partition_key", true);
        errors.extend(check_key(&ctx.spec.params, "sort_key", false));
        errors
    }

    async fn deploy(
        &self,
        ctx: &ServiceContext,
        _own_pre_deploy: &PreDeployContext,
        _own_bind: &BindContext,
        _deployed: &BTreeMap<String, DeployContext>,
        cloud: &CloudContext,
    ) -> Result<DeployContext, PipewrightError> {
        let table_name = ctx.resource_name();
        let account = cloud.account();
        let spec = ResourceSpec::new(ResourceKind::Stack, table_name.as_str())
            .with_config(serde_json::json!({
                "template": "dynamodb",
                "table_name": table_name,
                "partition_key": ctx.spec.params.get("partition_key"),
                "sort_key": ctx.spec.params.get("sort_key"),
            }))
            .with_tags(&ctx.spec.tags);
        cloud.adapters.stacks().reconcile(&spec).await?;

        let table_arn = format!(
            "arn:aws:dynamodb:{}:{}:table/{table_name}",
            account.region, account.account_id
        );
        let mut deployed = DeployContext::new(ctx).with_policy(serde_json::json!({
            "Effect": "Allow",
            "Action": [
                "dynamodb:GetItem",
                "dynamodb:PutItem",
                "dynamodb:UpdateItem",
                "dynamodb:DeleteItem",
                "dynamodb:Query",
                "dynamodb:Scan",
            ],
            "Resource": [table_arn.as_str(), format!("{table_arn}/index/*")],
        }));
        deployed.add_env_var("TABLE_NAME", table_name.as_str());
        deployed.outputs.insert("table_arn".to_string(), table_arn);
        Ok(deployed)
    }

    async fn un_deploy(&self, ctx: &ServiceContext, cloud: &CloudContext) -> Result<(), PipewrightError> {
        cloud.adapters.stacks().teardown(&ctx.resource_name()).await?;
        Ok(())
    }
}
