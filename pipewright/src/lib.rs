//! # Pipewright
//!
//! Declarative multi-service delivery pipelines.
//!
//! Pipewright turns a pipeline file into a continuous-delivery pipeline:
//!
//! - **Leveled orchestration**: environment services deploy level by level,
//!   dependencies first, and delete in exact reverse
//! - **Convergent provisioning**: every cloud resource goes through a
//!   get-then-create-or-update reconciler, so re-running is safe
//! - **Phase composition**: each phase type provisions what it needs and
//!   contributes one action to an ordered pipeline definition
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pipewright::prelude::*;
//!
//! let environments = Arc::new(EnvironmentOrchestrator::new(
//!     Arc::new(ServiceDeployerRegistry::builtin()),
//!     Arc::new(LevelResolver::new()),
//!     Arc::new(NoOpEventSink),
//! ));
//! let composer = PipelineComposer::new(
//!     Arc::new(PhaseDeployerRegistry::builtin(environments)),
//!     Arc::new(LoggingEventSink::info()),
//! );
//!
//! let file = PipelineFile::load("pipeline.json")?;
//! let pipeline = composer.deploy(&file, "main", &cloud, SecretSource::empty()).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cloud;
pub mod composer;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod graph;
pub mod orchestrator;
pub mod phases;
pub mod services;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cloud::{
        CloudAdapter, CloudAdapters, CloudError, InMemoryCloudAdapter, LocalStateStore, Resource,
        ResourceKind, ResourceReconciler, ResourceSpec,
    };
    pub use crate::composer::{
        PipelineComposer, PipelineDefinition, PipelineFile, SecretPrompter, SecretSource,
    };
    pub use crate::config::{AccountConfig, OrchestratorConfig};
    pub use crate::core::{
        DeployContext, EnvironmentDeleteResult, EnvironmentDeployResult, LifecycleStage,
        ServiceContext,
    };
    pub use crate::errors::{
        ContractErrorInfo, CycleDetectedError, PipewrightError, ValidationError,
    };
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::graph::{DependencyGraphResolver, EnvironmentGraph, LevelResolver, ServiceSpec};
    pub use crate::orchestrator::{
        CloudContext, EnvironmentContext, EnvironmentOrchestrator, ServiceDeployer,
        ServiceDeployerRegistry,
    };
    pub use crate::phases::{
        PhaseActionSpec, PhaseContext, PhaseDeployer, PhaseDeployerRegistry, PhaseSpec,
        SecretBundle, SecretQuestion,
    };
}
