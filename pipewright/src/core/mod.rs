//! Core domain model types for pipewright.
//!
//! This module contains the types shared by the orchestrator and the phases:
//! - Deploy status and lifecycle stage enums
//! - Per-service contexts produced by each orchestration stage
//! - Environment deploy/delete results

mod contexts;
mod result;
mod status;

pub use contexts::{
    env_var_prefix, BindContext, DeployContext, PreDeployContext, ServiceContext,
};
pub use result::{EnvironmentDeleteResult, EnvironmentDeployResult};
pub use status::{DeployStatus, LifecycleStage};
