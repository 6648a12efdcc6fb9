//! Deploy status and lifecycle stage enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Terminal outcome of an environment deploy or delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployStatus {
    /// Every step completed.
    Success,
    /// Some step failed; see the message and cause.
    Failure,
}

impl fmt::Display for DeployStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
        }
    }
}

impl DeployStatus {
    /// Returns true for [`DeployStatus::Success`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// The ordered stages a service passes through entering or leaving an environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleStage {
    /// Validation of service parameters.
    Check,
    /// Level-independent preparation (security groups and the like).
    PreDeploy,
    /// Wiring a service to the services it depends on.
    Bind,
    /// Provisioning the service itself.
    Deploy,
    /// Removing the provisioned service.
    UnDeploy,
    /// Removing the wiring added by bind.
    UnBind,
    /// Removing pre-deploy artifacts.
    UnPreDeploy,
}

impl LifecycleStage {
    /// Returns true for the stages of the reverse traversal.
    #[must_use]
    pub fn is_teardown(&self) -> bool {
        matches!(self, Self::UnDeploy | Self::UnBind | Self::UnPreDeploy)
    }

    /// Returns the event name prefix for the stage.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Check => "check",
            Self::PreDeploy => "pre-deploy",
            Self::Bind => "bind",
            Self::Deploy => "deploy",
            Self::UnDeploy => "un-deploy",
            Self::UnBind => "un-bind",
            Self::UnPreDeploy => "un-pre-deploy",
        }
    }
}

impl fmt::Display for LifecycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deploy_status_serialize() {
        let json = serde_json::to_string(&DeployStatus::Failure).unwrap();
        assert_eq!(json, r#""failure""#);
        assert!(DeployStatus::Success.is_success());
        assert!(!DeployStatus::Failure.is_success());
    }

    #[test]
    fn test_lifecycle_stage_display() {
        assert_eq!(LifecycleStage::PreDeploy.to_string(), "pre-deploy");
        assert_eq!(LifecycleStage::UnPreDeploy.to_string(), "un-pre-deploy");
        let json = serde_json::to_string(&LifecycleStage::UnBind).unwrap();
        assert_eq!(json, r#""un-bind""#);
    }

    #[test]
    fn test_teardown_stages() {
        assert!(LifecycleStage::UnDeploy.is_teardown());
        assert!(!LifecycleStage::Bind.is_teardown());
    }
}
