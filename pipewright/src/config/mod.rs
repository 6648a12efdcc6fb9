//! Configuration types.
//!
//! - [`AccountConfig`]: the target account, passed explicitly everywhere
//! - [`OrchestratorConfig`]: knobs for the environment orchestrator

mod account;

pub use account::AccountConfig;

use serde::{Deserialize, Serialize};

/// Configuration for the environment orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Service types environments may declare.
    #[serde(default = "default_allowed_services")]
    pub allowed_services: Vec<String>,
    /// Maximum services running at once inside one level. `0` means unbounded.
    #[serde(default)]
    pub max_concurrency_per_level: usize,
}

fn default_allowed_services() -> Vec<String> {
    vec!["apiaccess".to_string(), "dynamodb".to_string(), "s3".to_string()]
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            allowed_services: default_allowed_services(),
            max_concurrency_per_level: 0,
        }
    }
}

impl OrchestratorConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the allowed service types.
    #[must_use]
    pub fn with_allowed_services(mut self, services: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.allowed_services = services.into_iter().map(Into::into).collect();
        self
    }

    /// Bounds how many services of one level run at once.
    #[must_use]
    pub fn with_max_concurrency_per_level(mut self, limit: usize) -> Self {
        self.max_concurrency_per_level = limit;
        self
    }
}
