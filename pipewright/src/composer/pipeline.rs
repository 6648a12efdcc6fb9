//! Assembles phase actions into one pipeline and tears it down again.
//!
//! Deploy: validate, resolve secrets, artifact bucket, phases in declared
//! order, pipeline role, pipeline resource, webhooks. Delete: webhooks,
//! phases in reverse order, pipeline resource, pipeline role.
//!
//! Phases run one at a time. The first failure stops the run and nothing
//! already applied is undone; running again converges.

use super::{validate_pipeline_file, PipelineConfig, PipelineDefinition, PipelineFile, SecretSource};
use crate::cloud::{ensure_service_role, Resource, ResourceKind, ResourceSpec};
use crate::errors::{codes, ContractErrorInfo, ErrorSuggestions, PipewrightError, ValidationError};
use crate::events::EventSink;
use crate::orchestrator::CloudContext;
use crate::phases::{
    PhaseActionSpec, PhaseContext, PhaseDeployer, PhaseDeployerRegistry, SecretBundle, SecretQuestion,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Trusted principal for pipeline roles.
const CODEPIPELINE_PRINCIPAL: &str = "codepipeline.amazonaws.com";

/// Name of the pipeline resource: `{app}-{pipeline}`.
#[must_use]
pub fn pipeline_resource_name(app_name: &str, pipeline_name: &str) -> String {
    format!("{app_name}-{pipeline_name}")
}

/// Name of the role a pipeline runs as.
#[must_use]
pub fn pipeline_role_name(app_name: &str, pipeline_name: &str) -> String {
    format!("{app_name}-{pipeline_name}-PipewrightCodePipelineServiceRole")
}

/// Name of the artifact a phase produces.
#[must_use]
pub fn output_artifact_name(phase_name: &str) -> String {
    format!("Output_{phase_name}")
}

/// A phase with its deployer and fully wired context.
struct PlannedPhase {
    deployer: Arc<dyn PhaseDeployer>,
    ctx: PhaseContext,
}

/// Drives every phase of a pipeline through deploy and delete.
#[derive(Clone)]
pub struct PipelineComposer {
    registry: Arc<PhaseDeployerRegistry>,
    event_sink: Arc<dyn EventSink>,
}

impl fmt::Debug for PipelineComposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineComposer")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl PipelineComposer {
    /// Creates a composer.
    #[must_use]
    pub fn new(registry: Arc<PhaseDeployerRegistry>, event_sink: Arc<dyn EventSink>) -> Self {
        Self { registry, event_sink }
    }

    /// The phase registry in use.
    #[must_use]
    pub fn registry(&self) -> &PhaseDeployerRegistry {
        &self.registry
    }

    /// Validates the file and every phase of one pipeline.
    ///
    /// Makes no cloud calls and reports every problem found.
    #[must_use]
    pub fn check(&self, file: &PipelineFile, pipeline_name: &str) -> Vec<ValidationError> {
        let mut errors = validate_pipeline_file(file);
        let pipeline = match file.pipeline(pipeline_name) {
            Ok(pipeline) => pipeline,
            Err(err) => {
                errors.push(err);
                return errors;
            }
        };

        errors.extend(self.registry.validate_types(&pipeline.phases));
        for phase in &pipeline.phases {
            let Ok(deployer) = self.registry.get(&phase.phase_type) else {
                continue;
            };
            for message in deployer.check(phase) {
                let info = ContractErrorInfo::new(codes::BAD_PARAMS, message.as_str())
                    .with_context_entry("phase", phase.name.as_str())
                    .with_context_entry("type", phase.phase_type.as_str());
                errors.push(
                    ValidationError::new(format!("phase '{}': {message}", phase.name))
                        .with_subject(phase.name.as_str())
                        .with_error_info(info),
                );
            }
        }
        errors
    }

    /// Secrets every phase of the pipeline needs, in phase order.
    ///
    /// # Errors
    ///
    /// Returns an error if the pipeline or a phase type is unknown.
    pub fn list_secret_questions(
        &self,
        file: &PipelineFile,
        pipeline_name: &str,
    ) -> Result<Vec<SecretQuestion>, PipewrightError> {
        let pipeline = file.pipeline(pipeline_name)?;
        let mut questions = Vec::new();
        for phase in &pipeline.phases {
            questions.extend(self.registry.get(&phase.phase_type)?.secret_questions(phase));
        }
        Ok(questions)
    }

    /// Collects every required secret, keyed by phase name.
    ///
    /// # Errors
    ///
    /// Returns [`PipewrightError::InvalidSpec`] listing every missing secret,
    /// or the prompter's error.
    pub async fn resolve_secrets(
        &self,
        file: &PipelineFile,
        pipeline_name: &str,
        source: SecretSource<'_>,
    ) -> Result<BTreeMap<String, SecretBundle>, PipewrightError> {
        let questions = self.list_secret_questions(file, pipeline_name)?;

        let bundles = match source {
            SecretSource::NonInteractive(bundles) => bundles,
            SecretSource::Interactive(prompter) => {
                let mut bundles: BTreeMap<String, SecretBundle> = BTreeMap::new();
                for question in &questions {
                    let answer = prompter.ask(question).await?;
                    bundles
                        .entry(question.phase_name.clone())
                        .or_default()
                        .insert(question.name.as_str(), answer);
                }
                bundles
            }
        };

        let mut required: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for question in &questions {
            required
                .entry(question.phase_name.as_str())
                .or_default()
                .push(question.name.as_str());
        }

        let mut errors = Vec::new();
        for (phase_name, names) in required {
            let missing = bundles
                .get(phase_name)
                .map_or_else(|| names.iter().map(|n| (*n).to_string()).collect(), |b| b.require(&names));
            for name in missing {
                let mut info = ContractErrorInfo::new(codes::MISSING_SECRET, "Required secret not supplied")
                    .with_context_entry("phase", phase_name)
                    .with_context_entry("secret", name.as_str());
                if let Some(hint) = ErrorSuggestions::get(codes::MISSING_SECRET) {
                    info = info.with_fix_hint(hint);
                }
                errors.push(
                    ValidationError::new(format!("phase '{phase_name}' is missing the secret '{name}'"))
                        .with_subjects(vec![phase_name.to_string(), name])
                        .with_error_info(info),
                );
            }
        }

        if errors.is_empty() {
            Ok(bundles)
        } else {
            Err(PipewrightError::InvalidSpec { errors })
        }
    }

    /// Deploys one pipeline and returns the pipeline resource.
    ///
    /// Validation and secret problems abort before any cloud call.
    ///
    /// # Errors
    ///
    /// Returns the first validation, secret, phase or cloud error.
    pub async fn deploy(
        &self,
        file: &PipelineFile,
        pipeline_name: &str,
        cloud: &CloudContext,
        secrets: SecretSource<'_>,
    ) -> Result<Resource, PipewrightError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("pipeline", app = %file.name, pipeline = %pipeline_name, run_id = %run_id);
        async {
            let start = Instant::now();
            self.event_sink.try_emit(
                "pipeline.deploy.started",
                Some(json!({ "app": &file.name, "pipeline": pipeline_name, "run_id": run_id })),
            );

            match self.deploy_pipeline(file, pipeline_name, cloud, secrets).await {
                Ok(resource) => {
                    info!(
                        arn = %resource.arn,
                        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                        "pipeline deployed"
                    );
                    self.event_sink.try_emit(
                        "pipeline.deploy.completed",
                        Some(json!({
                            "app": &file.name,
                            "pipeline": pipeline_name,
                            "run_id": run_id,
                            "arn": &resource.arn,
                            "duration_ms": start.elapsed().as_secs_f64() * 1000.0,
                        })),
                    );
                    Ok(resource)
                }
                Err(err) => {
                    error!(error = %err, "pipeline deploy failed");
                    self.event_sink.try_emit(
                        "pipeline.deploy.failed",
                        Some(json!({
                            "app": &file.name,
                            "pipeline": pipeline_name,
                            "run_id": run_id,
                            "error": err.to_string(),
                        })),
                    );
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Deletes one pipeline and everything its phases provisioned.
    ///
    /// Shared resources (the artifact bucket and shared roles) are kept.
    ///
    /// # Errors
    ///
    /// Returns the first validation, phase or cloud error.
    pub async fn delete(
        &self,
        file: &PipelineFile,
        pipeline_name: &str,
        cloud: &CloudContext,
    ) -> Result<(), PipewrightError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("pipeline", app = %file.name, pipeline = %pipeline_name, run_id = %run_id);
        async {
            self.event_sink.try_emit(
                "pipeline.delete.started",
                Some(json!({ "app": &file.name, "pipeline": pipeline_name, "run_id": run_id })),
            );

            match self.delete_pipeline(file, pipeline_name, cloud).await {
                Ok(()) => {
                    info!("pipeline deleted");
                    self.event_sink.try_emit(
                        "pipeline.delete.completed",
                        Some(json!({ "app": &file.name, "pipeline": pipeline_name, "run_id": run_id })),
                    );
                    Ok(())
                }
                Err(err) => {
                    error!(error = %err, "pipeline delete failed");
                    self.event_sink.try_emit(
                        "pipeline.delete.failed",
                        Some(json!({
                            "app": &file.name,
                            "pipeline": pipeline_name,
                            "run_id": run_id,
                            "error": err.to_string(),
                        })),
                    );
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn deploy_pipeline(
        &self,
        file: &PipelineFile,
        pipeline_name: &str,
        cloud: &CloudContext,
        secrets: SecretSource<'_>,
    ) -> Result<Resource, PipewrightError> {
        let errors = self.check(file, pipeline_name);
        if !errors.is_empty() {
            return Err(PipewrightError::InvalidSpec { errors });
        }
        let pipeline = file.pipeline(pipeline_name)?;
        let secrets = self.resolve_secrets(file, pipeline_name, secrets).await?;

        let bucket_name = cloud.account().codepipeline_bucket_name();
        let bucket_spec = ResourceSpec::new(ResourceKind::Bucket, bucket_name.as_str())
            .with_config(json!({ "purpose": "pipeline-artifacts" }));
        cloud.adapters.buckets().reconcile(&bucket_spec).await?;

        let planned = self.plan(&file.name, pipeline_name, pipeline, &bucket_name, &secrets)?;
        let mut actions = Vec::with_capacity(planned.len());
        for phase in &planned {
            actions.push(self.deploy_phase(phase, cloud).await?);
        }

        let role = ensure_service_role(
            &cloud.adapters,
            cloud.account(),
            &pipeline_role_name(&file.name, pipeline_name),
            &[CODEPIPELINE_PRINCIPAL],
            pipeline_role_policy(&bucket_name),
        )
        .await?;

        let name = pipeline_resource_name(&file.name, pipeline_name);
        let definition = PipelineDefinition {
            name: name.clone(),
            role_arn: role.arn,
            artifact_bucket: bucket_name,
            actions,
        };
        let spec = ResourceSpec::new(ResourceKind::Pipeline, name.as_str())
            .with_config(serde_json::to_value(&definition)?)
            .with_tag("app", file.name.as_str());
        let resource = cloud.adapters.pipelines().reconcile(&spec).await?;

        for phase in &planned {
            phase
                .deployer
                .add_webhooks(&phase.ctx, cloud)
                .await
                .map_err(|err| PipewrightError::in_phase(phase.ctx.phase_name.as_str(), err))?;
        }

        Ok(resource)
    }

    async fn delete_pipeline(
        &self,
        file: &PipelineFile,
        pipeline_name: &str,
        cloud: &CloudContext,
    ) -> Result<(), PipewrightError> {
        let pipeline = file.pipeline(pipeline_name)?;
        let errors = self.registry.validate_types(&pipeline.phases);
        if !errors.is_empty() {
            return Err(PipewrightError::InvalidSpec { errors });
        }

        let bucket_name = cloud.account().codepipeline_bucket_name();
        let planned = self.plan(&file.name, pipeline_name, pipeline, &bucket_name, &BTreeMap::new())?;

        for phase in &planned {
            phase
                .deployer
                .remove_webhooks(&phase.ctx, cloud)
                .await
                .map_err(|err| PipewrightError::in_phase(phase.ctx.phase_name.as_str(), err))?;
        }

        for phase in planned.iter().rev() {
            self.delete_phase(phase, cloud).await?;
        }

        cloud
            .adapters
            .pipelines()
            .teardown(&pipeline_resource_name(&file.name, pipeline_name))
            .await?;

        let role_name = pipeline_role_name(&file.name, pipeline_name);
        cloud.adapters.roles().teardown(&role_name).await?;
        cloud.adapters.policies().teardown(&role_name).await?;
        Ok(())
    }

    /// Wires contexts: the input is the latest produced artifact.
    fn plan(
        &self,
        app_name: &str,
        pipeline_name: &str,
        pipeline: &PipelineConfig,
        bucket_name: &str,
        secrets: &BTreeMap<String, SecretBundle>,
    ) -> Result<Vec<PlannedPhase>, PipewrightError> {
        let mut latest: Option<String> = None;
        let mut planned = Vec::with_capacity(pipeline.phases.len());

        for phase in &pipeline.phases {
            let deployer = self.registry.get(&phase.phase_type)?;
            let output = deployer.produces_artifact().then(|| output_artifact_name(&phase.name));
            let ctx = PhaseContext::new(app_name, pipeline_name, phase)
                .with_secrets(secrets.get(&phase.name).cloned().unwrap_or_default())
                .with_artifacts(latest.clone(), output.clone())
                .with_artifact_bucket(bucket_name);
            if output.is_some() {
                latest = output;
            }
            planned.push(PlannedPhase { deployer, ctx });
        }

        Ok(planned)
    }

    async fn deploy_phase(&self, phase: &PlannedPhase, cloud: &CloudContext) -> Result<PhaseActionSpec, PipewrightError> {
        let ctx = &phase.ctx;
        let span = info_span!("phase", phase = %ctx.phase_name, phase_type = %ctx.phase_type, run_order = ctx.position);
        async {
            debug!("deploying phase");
            match phase.deployer.deploy_phase(ctx, cloud).await {
                Ok(returned) => {
                    let action = returned.clone().wired_to(ctx);
                    if action != returned {
                        warn!(
                            returned_run_order = returned.run_order,
                            run_order = action.run_order,
                            "phase action rewired to its declared position and artifacts"
                        );
                    }
                    info!("phase deployed");
                    self.event_sink.try_emit(
                        "phase.deploy.completed",
                        Some(json!({ "phase": &ctx.phase_name, "type": &ctx.phase_type })),
                    );
                    Ok(action)
                }
                Err(err) => {
                    error!(error = %err, "phase deploy failed");
                    self.event_sink.try_emit(
                        "phase.deploy.failed",
                        Some(json!({ "phase": &ctx.phase_name, "error": err.to_string() })),
                    );
                    Err(PipewrightError::in_phase(ctx.phase_name.as_str(), err))
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn delete_phase(&self, phase: &PlannedPhase, cloud: &CloudContext) -> Result<(), PipewrightError> {
        let ctx = &phase.ctx;
        let span = info_span!("phase", phase = %ctx.phase_name, phase_type = %ctx.phase_type);
        async {
            match phase.deployer.delete_phase(ctx, cloud).await {
                Ok(()) => {
                    info!("phase deleted");
                    self.event_sink.try_emit("phase.delete.completed", Some(json!({ "phase": &ctx.phase_name })));
                    Ok(())
                }
                Err(err) => {
                    error!(error = %err, "phase delete failed");
                    self.event_sink.try_emit(
                        "phase.delete.failed",
                        Some(json!({ "phase": &ctx.phase_name, "error": err.to_string() })),
                    );
                    Err(PipewrightError::in_phase(ctx.phase_name.as_str(), err))
                }
            }
        }
        .instrument(span)
        .await
    }
}

fn pipeline_role_policy(bucket_name: &str) -> serde_json::Value {
    json!({
        "Version": "2012-10-17",
        "Statement": [
            {
                "Effect": "Allow",
                "Action": ["s3:GetObject", "s3:GetObjectVersion", "s3:GetBucketVersioning", "s3:PutObject"],
                "Resource": [format!("arn:aws:s3:::{bucket_name}"), format!("arn:aws:s3:::{bucket_name}/*")],
            },
            {
                "Effect": "Allow",
                "Action": ["codebuild:BatchGetBuilds", "codebuild:StartBuild"],
                "Resource": "*",
            },
            {
                "Effect": "Allow",
                "Action": ["lambda:InvokeFunction", "lambda:ListFunctions"],
                "Resource": "*",
            },
            {
                "Effect": "Allow",
                "Action": ["codecommit:GetBranch", "codecommit:GetCommit", "codecommit:UploadArchive", "codecommit:GetUploadArchiveStatus"],
                "Resource": "*",
            },
        ],
    })
}
