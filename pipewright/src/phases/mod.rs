//! Pipeline phases.
//!
//! - [`PhaseSpec`]: one declared phase
//! - [`PhaseDeployer`]: what each phase type implements
//! - [`PhaseDeployerRegistry`]: type tag lookup, built once
//! - [`builtin`]: the shipped phase types

mod action;
pub mod builtin;
mod context;
mod deployer;
mod registry;
mod secrets;
mod spec;

pub use action::{ActionCategory, PhaseActionSpec};
pub use context::PhaseContext;
pub use deployer::PhaseDeployer;
pub use registry::PhaseDeployerRegistry;
pub use secrets::{SecretBundle, SecretEntry, SecretQuestion};
pub use spec::PhaseSpec;
