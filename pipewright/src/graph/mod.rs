//! Service dependency graphs.
//!
//! - [`ServiceSpec`]: one declared service
//! - [`DependencyGraphResolver`]: turns a dependency map into levels
//! - [`EnvironmentGraph`]: validated services plus their levels

mod environment;
mod resolver;
mod spec;

pub use environment::EnvironmentGraph;
pub use resolver::{DependencyGraphResolver, Level, LevelResolver};
pub use spec::ServiceSpec;
