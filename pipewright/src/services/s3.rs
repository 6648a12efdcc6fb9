//! Object storage buckets.

use crate::cloud::{ResourceKind, ResourceSpec};
use crate::core::{BindContext, DeployContext, PreDeployContext, ServiceContext};
use crate::errors::PipewrightError;
use crate::orchestrator::{CloudContext, ServiceDeployer};
use async_trait::async_trait;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static BUCKET_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9.-]{1,61}[a-z0-9]$").expect("bucket name pattern is valid"));

/// The `s3` service type.
///
/// Params: `bucket_name` (optional, defaults to the lower-cased resource
/// name) and `versioning` (optional boolean).
#[derive(Debug, Clone, Copy, Default)]
pub struct S3Service;

impl S3Service {
    fn bucket_name(ctx: &ServiceContext) -> String {
        ctx.param_str("bucket_name")
            .map_or_else(|| ctx.resource_name().to_lowercase(), str::to_string)
    }
}

#[async_trait]
impl ServiceDeployer for S3Service {
    fn check(&self, ctx: &ServiceContext) -> Vec<String> {
        let mut errors = Vec::new();
        match ctx.spec.params.get("bucket_name") {
            None => {}
            Some(serde_json::Value::String(name)) if BUCKET_NAME.is_match(name) => {}
            Some(_) => errors.push(
                "'bucket_name' must be 3-63 lowercase letters, digits, dots or hyphens".to_string(),
            ),
        }
        if let Some(versioning) = ctx.spec.params.get("versioning") {
            if !versioning.is_boolean() {
                errors.push("'versioning' must be true or false".to_string());
            }
        }
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
        let name = Self::bucket_name(ctx);
        let versioning = ctx
            .spec
            .params
            .get("versioning")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);
        let spec = ResourceSpec::new(ResourceKind::Bucket, name.as_str())
            .with_config(serde_json::json!({ "versioning": versioning }))
            .with_tags(&ctx.spec.tags);
        let bucket = cloud.adapters.buckets().reconcile(&spec).await?;

        let mut deployed = DeployContext::new(ctx)
            .with_policy(serde_json::json!({
                "Effect": "Allow",
                "Action": ["s3:ListBucket"],
                "Resource": [bucket.arn.as_str()],
            }))
            .with_policy(serde_json::json!({
                "Effect": "Allow",
                "Action": ["s3:GetObject", "s3:PutObject", "s3:DeleteObject"],
                "Resource": [format!("{}/*", bucket.arn)],
            }));
        deployed.add_env_var("BUCKET_NAME", name.as_str());
        deployed.add_env_var("BUCKET_ARN", bucket.arn.as_str());
        deployed.outputs.insert("bucket_arn".to_string(), bucket.arn);
        Ok(deployed)
    }

    async fn un_deploy(&self, ctx: &ServiceContext, cloud: &CloudContext) -> Result<(), PipewrightError> {
        cloud.adapters.buckets().teardown(&Self::bucket_name(ctx)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ServiceSpec;
    use crate::testing::in_memory_cloud;

    fn ctx(spec: ServiceSpec) -> ServiceContext {
        ServiceContext::new("shop", "dev", spec)
    }

    #[test]
    fn test_check() {
        let ok = ctx(ServiceSpec::new("files", "s3")
            .with_param("bucket_name", serde_json::json!("shop-files"))
            .with_param("versioning", serde_json::json!(true)));
        assert!(S3Service.check(&ok).is_empty());

        let bad = ctx(ServiceSpec::new("files", "s3")
            .with_param("bucket_name", serde_json::json!("Not_Valid"))
            .with_param("versioning", serde_json::json!("yes")));
        assert_eq!(S3Service.check(&bad).len(), 2);
    }

    #[tokio::test]
    async fn test_deploy_exports_bucket() {
        let (cloud, adapters) = in_memory_cloud();
        let ctx = ctx(ServiceSpec::new("user-files", "s3"));

        let deployed = S3Service
            .deploy(
                &ctx,
                &PreDeployContext::default(),
                &BindContext::default(),
                &BTreeMap::new(),
                &cloud,
            )
            .await
            .unwrap();

        assert_eq!(
            deployed.environment_variables.get("USER_FILES_BUCKET_NAME").map(String::as_str),
            Some("shop-dev-user-files-s3")
        );
        assert!(deployed.environment_variables.contains_key("USER_FILES_BUCKET_ARN"));
        assert_eq!(deployed.policies.len(), 2);
        assert!(adapters.adapter(ResourceKind::Bucket).contains("shop-dev-user-files-s3"));

        S3Service.un_deploy(&ctx, &cloud).await.unwrap();
        assert!(adapters.adapter(ResourceKind::Bucket).is_empty());
    }
}
