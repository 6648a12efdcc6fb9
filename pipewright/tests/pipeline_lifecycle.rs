//! End-to-end deploy and delete of a pipeline against in-memory clouds.

use pipewright::cloud::{LocalStateStore, ResourceKind};
use pipewright::composer::{PipelineComposer, PipelineDefinition, PipelineFile, SecretSource};
use pipewright::config::AccountConfig;
use pipewright::events::CollectingEventSink;
use pipewright::orchestrator::CloudContext;
use pipewright::phases::builtin::{
    ACCESS_TOKEN_SECRET, DEPLOY_PHASE_ROLE, GITHUB_TOKEN_SECRET, RUNSCOPE_ROLE, TRIGGER_URL_SECRET,
};
use pipewright::phases::{ActionCategory, PhaseDeployerRegistry, SecretBundle};
use pipewright::testing::{environment_orchestrator, in_memory_cloud};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::sync::Arc;

const PIPELINE: &str = r#"{
    "version": 1,
    "name": "shop",
    "pipelines": {
        "main": {
            "phases": [
                {"type": "github", "name": "source", "owner": "acme", "repo": "shop", "branch": "main"},
                {
                    "type": "codebuild",
                    "name": "build",
                    "build_image": "aws/codebuild/standard:7.0",
                    "environment_variables": {"STAGE": "ci"},
                    "extra_resources": {
                        "cache": {"type": "s3", "bucket_name": "shop-build-cache"},
                        "table": {
                            "type": "dynamodb",
                            "partition_key": {"name": "id", "type": "String"},
                            "dependencies": ["cache"]
                        }
                    }
                },
                {"type": "runscope", "name": "test"},
                {"type": "handel", "name": "deploy", "environments_to_deploy": ["dev"]}
            ]
        }
    }
}"#;

const TWO_PIPELINES: &str = r#"{
    "version": 1,
    "name": "shop",
    "pipelines": {
        "dev": {
            "phases": [
                {"type": "codecommit", "name": "source", "repo": "shop", "branch": "develop"},
                {
                    "type": "codebuild",
                    "name": "build",
                    "build_image": "aws/codebuild/standard:7.0",
                    "extra_resources": {
                        "table": {"type": "dynamodb", "partition_key": {"name": "id", "type": "String"}},
                        "files": {"type": "s3"}
                    }
                }
            ]
        },
        "prod": {
            "phases": [
                {"type": "codecommit", "name": "source", "repo": "shop", "branch": "main"},
                {
                    "type": "codebuild",
                    "name": "build",
                    "build_image": "aws/codebuild/standard:7.0",
                    "extra_resources": {
                        "table": {"type": "dynamodb", "partition_key": {"name": "id", "type": "String"}},
                        "files": {"type": "s3"}
                    }
                }
            ]
        }
    }
}"#;

fn composer() -> (PipelineComposer, Arc<CollectingEventSink>) {
    let registry = PhaseDeployerRegistry::builtin(Arc::new(environment_orchestrator()));
    let sink = Arc::new(CollectingEventSink::new());
    (PipelineComposer::new(Arc::new(registry), sink.clone()), sink)
}

fn secrets() -> BTreeMap<String, SecretBundle> {
    BTreeMap::from([
        ("source".to_string(), SecretBundle::new().with(GITHUB_TOKEN_SECRET, "gh-token")),
        (
            "test".to_string(),
            SecretBundle::new()
                .with(TRIGGER_URL_SECRET, "https://api.runscope.test/trigger")
                .with(ACCESS_TOKEN_SECRET, "rs-token"),
        ),
    ])
}

#[tokio::test]
async fn deploy_assembles_actions_in_declared_order() {
    let (composer, sink) = composer();
    let (cloud, memory) = in_memory_cloud();
    let file = PipelineFile::from_json(PIPELINE).unwrap();

    let resource = composer
        .deploy(&file, "main", &cloud, SecretSource::NonInteractive(secrets()))
        .await
        .unwrap();
    assert_eq!(resource.name, "shop-main");

    let definition: PipelineDefinition = serde_json::from_value(resource.spec.config.clone()).unwrap();
    let orders: Vec<usize> = definition.actions.iter().map(|a| a.run_order).collect();
    assert_eq!(orders, vec![1, 2, 3, 4]);
    assert_eq!(definition.artifact_bucket, "codepipeline-us-west-2-111111111111");

    let source = definition.action("source").unwrap();
    assert_eq!(source.category, ActionCategory::Source);
    assert!(source.input_artifacts.is_empty());
    assert_eq!(source.output_artifacts, vec!["Output_source".to_string()]);

    let build = definition.action("build").unwrap();
    assert_eq!(build.input_artifacts, vec!["Output_source".to_string()]);
    assert_eq!(build.output_artifacts, vec!["Output_build".to_string()]);

    for later in ["test", "deploy"] {
        let action = definition.action(later).unwrap();
        assert_eq!(action.input_artifacts, vec!["Output_build".to_string()]);
        assert!(action.output_artifacts.is_empty());
    }

    let project = memory
        .adapter(ResourceKind::BuildProject)
        .resource("shop-main-build")
        .unwrap();
    let env = &project.spec.config["environment_variables"];
    assert_eq!(env["STAGE"], "ci");
    assert_eq!(env["CACHE_BUCKET_NAME"], "shop-build-cache");
    assert_eq!(env["TABLE_TABLE_NAME"], "shop-main-build-table-dynamodb");

    assert!(memory.adapter(ResourceKind::Webhook).contains("shop-main-source"));
    assert_eq!(sink.events_of_type("phase.deploy.completed").len(), 4);
    assert_eq!(sink.events_of_type("pipeline.deploy.completed").len(), 1);
}

#[tokio::test]
async fn redeploy_creates_nothing_new() {
    let (composer, _) = composer();
    let (cloud, memory) = in_memory_cloud();
    let file = PipelineFile::from_json(PIPELINE).unwrap();

    composer
        .deploy(&file, "main", &cloud, SecretSource::NonInteractive(secrets()))
        .await
        .unwrap();
    let created: Vec<usize> = ResourceKind::ALL
        .iter()
        .map(|kind| memory.adapter(*kind).calls().create)
        .collect();
    let keys = memory.resource_keys();

    composer
        .deploy(&file, "main", &cloud, SecretSource::NonInteractive(secrets()))
        .await
        .unwrap();
    let created_again: Vec<usize> = ResourceKind::ALL
        .iter()
        .map(|kind| memory.adapter(*kind).calls().create)
        .collect();

    assert_eq!(created_again, created);
    assert_eq!(memory.resource_keys(), keys);
}

#[tokio::test]
async fn delete_leaves_only_shared_resources() {
    let (composer, _) = composer();
    let (cloud, memory) = in_memory_cloud();
    let file = PipelineFile::from_json(PIPELINE).unwrap();

    composer
        .deploy(&file, "main", &cloud, SecretSource::NonInteractive(secrets()))
        .await
        .unwrap();
    composer.delete(&file, "main", &cloud).await.unwrap();

    for kind in [
        ResourceKind::Pipeline,
        ResourceKind::BuildProject,
        ResourceKind::Stack,
        ResourceKind::Webhook,
    ] {
        assert!(memory.adapter(kind).is_empty(), "{kind} left behind: {:?}", memory.adapter(kind).names());
    }

    let shared = vec![DEPLOY_PHASE_ROLE.to_string(), RUNSCOPE_ROLE.to_string()];
    assert_eq!(memory.adapter(ResourceKind::Role).names(), shared);
    assert_eq!(memory.adapter(ResourceKind::Policy).names(), shared);
    assert_eq!(
        memory.adapter(ResourceKind::Bucket).names(),
        vec!["codepipeline-us-west-2-111111111111".to_string()]
    );

    composer.delete(&file, "main", &cloud).await.unwrap();
}

#[tokio::test]
async fn missing_secret_makes_no_cloud_calls() {
    let (composer, _) = composer();
    let (cloud, memory) = in_memory_cloud();
    let file = PipelineFile::from_json(PIPELINE).unwrap();
    let mut partial = secrets();
    partial.remove("test");

    let err = composer
        .deploy(&file, "main", &cloud, SecretSource::NonInteractive(partial))
        .await
        .unwrap_err();

    assert!(err.is_validation());
    assert!(err.to_string().contains(TRIGGER_URL_SECRET));
    assert!(err.to_string().contains(ACCESS_TOKEN_SECRET));
    assert_eq!(memory.total_mutations(), 0);
}

#[tokio::test]
async fn local_state_survives_new_store_instances() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let account = AccountConfig::placeholder();
    let (composer, _) = composer();
    let file = PipelineFile::from_json(PIPELINE).unwrap();

    let store = Arc::new(LocalStateStore::new(&path));
    let cloud = CloudContext::new(
        account.clone(),
        store.adapters(&account.account_id, &account.region),
    );
    composer
        .deploy(&file, "main", &cloud, SecretSource::NonInteractive(secrets()))
        .await
        .unwrap();

    let reopened = Arc::new(LocalStateStore::new(&path));
    let state = reopened.load().await.unwrap();
    assert!(state.resources.contains_key("pipeline:shop-main"));

    let cloud = CloudContext::new(
        account.clone(),
        reopened.adapters(&account.account_id, &account.region),
    );
    composer.delete(&file, "main", &cloud).await.unwrap();
    let state = reopened.load().await.unwrap();
    assert!(!state.resources.contains_key("pipeline:shop-main"));
    assert!(state.resources.contains_key(&format!("bucket:{}", account.codepipeline_bucket_name())));
}

#[tokio::test]
async fn pipelines_sharing_phase_names_keep_separate_resources() {
    let (composer, _) = composer();
    let (cloud, memory) = in_memory_cloud();
    let file = PipelineFile::from_json(TWO_PIPELINES).unwrap();

    for pipeline in ["dev", "prod"] {
        composer
            .deploy(&file, pipeline, &cloud, SecretSource::empty())
            .await
            .unwrap();
    }
    assert_eq!(
        memory.adapter(ResourceKind::Stack).names(),
        vec![
            "shop-dev-build-table-dynamodb".to_string(),
            "shop-prod-build-table-dynamodb".to_string(),
        ]
    );
    let prod_project = memory
        .adapter(ResourceKind::BuildProject)
        .resource("shop-prod-build")
        .unwrap();
    assert_eq!(
        prod_project.spec.config["environment_variables"]["TABLE_TABLE_NAME"],
        "shop-prod-build-table-dynamodb"
    );

    composer.delete(&file, "dev", &cloud).await.unwrap();

    assert_eq!(
        memory.adapter(ResourceKind::Stack).names(),
        vec!["shop-prod-build-table-dynamodb".to_string()]
    );
    assert_eq!(
        memory.adapter(ResourceKind::BuildProject).names(),
        vec!["shop-prod-build".to_string()]
    );
    assert!(memory.adapter(ResourceKind::Pipeline).contains("shop-prod"));
    assert!(!memory.adapter(ResourceKind::Pipeline).contains("shop-dev"));
    let buckets = memory.adapter(ResourceKind::Bucket).names();
    assert!(buckets.contains(&"shop-prod-build-files-s3".to_string()), "{buckets:?}");
    assert!(!buckets.contains(&"shop-dev-build-files-s3".to_string()), "{buckets:?}");

    composer.delete(&file, "prod", &cloud).await.unwrap();
    assert!(memory.adapter(ResourceKind::Stack).is_empty());
    assert!(memory.adapter(ResourceKind::BuildProject).is_empty());
}
