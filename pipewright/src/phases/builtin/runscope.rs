//! Runscope test phase: a function stack that triggers a Runscope test run.

use crate::cloud::{ensure_service_role, CloudError, ResourceKind, ResourceSpec};
use crate::errors::PipewrightError;
use crate::orchestrator::CloudContext;
use crate::phases::{ActionCategory, PhaseActionSpec, PhaseContext, PhaseDeployer, PhaseSpec, SecretQuestion};
use async_trait::async_trait;
use serde_json::json;

/// Secret with the Runscope trigger URL.
pub const TRIGGER_URL_SECRET: &str = "runscopeTriggerUrl";
/// Secret with the Runscope API token.
pub const ACCESS_TOKEN_SECRET: &str = "runscopeAccessToken";
/// Shared role the Runscope functions run as.
pub const RUNSCOPE_ROLE: &str = "PipewrightLambdaCodePipelineRole";

const FUNCTION_NAME_OUTPUT: &str = "FunctionName";

/// Invokes a function that runs a Runscope bucket and reports back.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunscopePhase;

#[async_trait]
impl PhaseDeployer for RunscopePhase {
    fn check(&self, _phase: &PhaseSpec) -> Vec<String> {
        Vec::new()
    }

    fn secret_questions(&self, phase: &PhaseSpec) -> Vec<SecretQuestion> {
        vec![
            SecretQuestion::new(
                phase.name.as_str(),
                TRIGGER_URL_SECRET,
                format!("'{}' phase - Please enter your Runscope trigger URL", phase.name),
            ),
            SecretQuestion::new(
                phase.name.as_str(),
                ACCESS_TOKEN_SECRET,
                format!("'{}' phase - Please enter your Runscope access token", phase.name),
            ),
        ]
    }

    async fn deploy_phase(&self, ctx: &PhaseContext, cloud: &CloudContext) -> Result<PhaseActionSpec, PipewrightError> {
        let role = ensure_service_role(
            &cloud.adapters,
            cloud.account(),
            RUNSCOPE_ROLE,
            &["lambda.amazonaws.com"],
            json!({
                "Version": "2012-10-17",
                "Statement": [{
                    "Effect": "Allow",
                    "Action": [
                        "codepipeline:PutJobSuccessResult",
                        "codepipeline:PutJobFailureResult",
                        "logs:*",
                    ],
                    "Resource": "*",
                }],
            }),
        )
        .await?;

        let stack_name = ctx.resource_name();
        let spec = ResourceSpec::new(ResourceKind::Stack, stack_name.as_str()).with_config(json!({
            "template": "runscope-function",
            "parameters": {
                "RoleArn": role.arn,
                "RunscopeTriggerUrl": ctx.secrets.get(TRIGGER_URL_SECRET).unwrap_or_default(),
                "RunscopeAccessToken": ctx.secrets.get(ACCESS_TOKEN_SECRET).unwrap_or_default(),
            },
            "outputs": { FUNCTION_NAME_OUTPUT: stack_name },
        }));
        let stack = cloud.adapters.stacks().reconcile(&spec).await?;

        let function_name = stack.output(FUNCTION_NAME_OUTPUT).ok_or_else(|| CloudError::InvalidSpec {
            kind: ResourceKind::Stack,
            message: format!("stack '{stack_name}' has no '{FUNCTION_NAME_OUTPUT}' output"),
        })?;

        Ok(PhaseActionSpec::for_phase(ctx, ActionCategory::Invoke, "AWS", "Lambda")
            .with_configuration(FUNCTION_NAME_OUTPUT, function_name))
    }

    async fn delete_phase(&self, ctx: &PhaseContext, cloud: &CloudContext) -> Result<(), PipewrightError> {
        cloud.adapters.stacks().teardown(&ctx.resource_name()).await?;
        Ok(())
    }
}
