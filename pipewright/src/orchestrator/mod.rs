//! The environment orchestrator and the service deployer contract.
//!
//! - [`ServiceDeployer`]: what each service type implements
//! - [`ServiceDeployerRegistry`]: type tag lookup, built once
//! - [`EnvironmentOrchestrator`]: leveled deploy and delete

mod context;
mod deployer;
mod environment;
mod registry;

pub use context::{CloudContext, EnvironmentContext, PHASE_TAG};
pub use deployer::ServiceDeployer;
pub use environment::EnvironmentOrchestrator;
pub use registry::ServiceDeployerRegistry;
