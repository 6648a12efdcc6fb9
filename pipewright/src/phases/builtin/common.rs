//! Pieces shared by the built-in phases.

use crate::cloud::{ensure_service_role, ResourceKind, ResourceSpec};
use crate::core::EnvironmentDeployResult;
use crate::errors::PipewrightError;
use crate::orchestrator::{CloudContext, EnvironmentContext, EnvironmentOrchestrator};
use crate::phases::{PhaseContext, PhaseSpec};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Trusted principal for build project roles.
pub(crate) const CODEBUILD_PRINCIPAL: &str = "codebuild.amazonaws.com";

/// Environment name for a phase's `extra_resources`: `{pipeline}-{phase}`.
///
/// Service resource names derive from it, so two pipelines with a phase of
/// the same name never share resources.
pub(crate) fn phase_environment_name(pipeline_name: &str, phase_name: &str) -> String {
    format!("{pipeline_name}-{phase_name}")
}

/// The `extra_resources` of a phase as an environment, if declared.
///
/// # Errors
///
/// Returns an error if the mapping is malformed.
pub(crate) fn extra_resources_environment(
    app_name: &str,
    pipeline_name: &str,
    phase_name: &str,
    params: &serde_json::Map<String, Value>,
) -> Result<Option<EnvironmentContext>, PipewrightError> {
    match params.get("extra_resources") {
        None | Some(Value::Null) => Ok(None),
        Some(resources) => {
            let environment_name = phase_environment_name(pipeline_name, phase_name);
            EnvironmentContext::from_resources(app_name, pipeline_name, environment_name, resources).map(Some)
        }
    }
}

/// Validates the `extra_resources` of a phase without a pipeline context.
pub(crate) fn check_extra_resources(orchestrator: &EnvironmentOrchestrator, phase: &PhaseSpec) -> Vec<String> {
    match extra_resources_environment("check", "check", &phase.name, &phase.params) {
        Ok(None) => Vec::new(),
        Ok(Some(env)) => orchestrator
            .check(&env)
            .into_iter()
            .map(|err| format!("extra_resources: {}", err.message))
            .collect(),
        Err(err) => vec![format!("extra_resources: {err}")],
    }
}

/// Deploys the phase's `extra_resources`, if any.
///
/// # Errors
///
/// Returns [`PipewrightError::Environment`] if the environment did not deploy.
pub(crate) async fn deploy_extra_resources(
    orchestrator: &EnvironmentOrchestrator,
    ctx: &PhaseContext,
    cloud: &CloudContext,
) -> Result<Option<EnvironmentDeployResult>, PipewrightError> {
    let Some(env) = extra_resources_environment(&ctx.app_name, &ctx.pipeline_name, &ctx.phase_name, &ctx.params)?
    else {
        return Ok(None);
    };

    let result = orchestrator.deploy(&env, cloud).await;
    if result.is_success() {
        Ok(Some(result))
    } else {
        Err(PipewrightError::Environment {
            environment: env.environment_name,
            message: result.message.unwrap_or_else(|| "deploy failed".to_string()),
        })
    }
}

/// Deletes the phase's `extra_resources`, if any.
///
/// # Errors
///
/// Returns [`PipewrightError::Environment`] if the environment did not delete.
pub(crate) async fn delete_extra_resources(
    orchestrator: &EnvironmentOrchestrator,
    ctx: &PhaseContext,
    cloud: &CloudContext,
) -> Result<(), PipewrightError> {
    let Some(env) = extra_resources_environment(&ctx.app_name, &ctx.pipeline_name, &ctx.phase_name, &ctx.params)?
    else {
        return Ok(());
    };

    let result = orchestrator.delete(&env, cloud).await;
    if result.is_success() {
        Ok(())
    } else {
        Err(PipewrightError::Environment {
            environment: env.environment_name,
            message: result.message.unwrap_or_else(|| "delete failed".to_string()),
        })
    }
}

/// Policy document for a build project role: logs and artifacts plus `extra`.
pub(crate) fn build_role_policy(ctx: &PhaseContext, cloud: &CloudContext, extra: &[Value]) -> Value {
    let account = cloud.account();
    let mut statements = vec![
        json!({
            "Effect": "Allow",
            "Action": ["logs:CreateLogGroup", "logs:CreateLogStream", "logs:PutLogEvents"],
            "Resource": [format!("arn:aws:logs:{}:{}:*", account.region, account.account_id)],
        }),
        json!({
            "Effect": "Allow",
            "Action": ["s3:GetObject", "s3:GetObjectVersion", "s3:PutObject"],
            "Resource": [format!("arn:aws:s3:::{}/*", ctx.artifact_bucket)],
        }),
    ];
    statements.extend(extra.iter().cloned());
    json!({ "Version": "2012-10-17", "Statement": statements })
}

/// Converges a build role for the phase and returns its ARN.
///
/// # Errors
///
/// Returns the first cloud error.
pub(crate) async fn ensure_build_role(
    cloud: &CloudContext,
    role_name: &str,
    policy_document: Value,
) -> Result<String, PipewrightError> {
    let role = ensure_service_role(
        &cloud.adapters,
        cloud.account(),
        role_name,
        &[CODEBUILD_PRINCIPAL],
        policy_document,
    )
    .await?;
    Ok(role.arn)
}

/// Tears down a role and its managed policy. Missing pieces are fine.
///
/// # Errors
///
/// Returns the first cloud error.
pub(crate) async fn teardown_role(cloud: &CloudContext, role_name: &str) -> Result<(), PipewrightError> {
    cloud.adapters.roles().teardown(role_name).await?;
    cloud.adapters.policies().teardown(role_name).await?;
    Ok(())
}

/// Spec for a build project.
pub(crate) fn build_project_spec(
    name: &str,
    role_arn: &str,
    image: &str,
    environment: &BTreeMap<String, String>,
    artifact_bucket: &str,
) -> ResourceSpec {
    ResourceSpec::new(ResourceKind::BuildProject, name).with_config(json!({
        "service_role": role_arn,
        "image": image,
        "environment_variables": environment,
        "artifact_bucket": artifact_bucket,
        "source": "CODEPIPELINE",
    }))
}

/// Reads a string-to-scalar mapping parameter as env vars.
pub(crate) fn string_map_param(params: &serde_json::Map<String, Value>, key: &str) -> BTreeMap<String, String> {
    params
        .get(key)
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .map(|(k, v)| {
                    let value = match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (k.clone(), value)
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Errors for a parameter that must be a mapping of scalars, if present.
pub(crate) fn check_string_map_param(phase: &PhaseSpec, key: &str) -> Vec<String> {
    match phase.param(key) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Object(map)) => map
            .iter()
            .filter(|(_, v)| v.is_object() || v.is_array())
            .map(|(k, _)| format!("the '{key}' parameter '{k}' must be a scalar"))
            .collect(),
        Some(_) => vec![format!("the '{key}' parameter must be a mapping")],
    }
}
