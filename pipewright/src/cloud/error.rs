//! Errors returned by cloud adapters.

use super::ResourceKind;
use thiserror::Error;

/// A cloud provider call failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CloudError {
    /// The resource does not exist. Reconciler teardown treats this as success.
    #[error("{kind} '{name}' not found")]
    NotFound {
        /// Resource kind.
        kind: ResourceKind,
        /// Resource name.
        name: String,
    },

    /// The provider rejected the request.
    #[error("{kind} '{name}' rejected: {message}")]
    Rejected {
        /// Resource kind.
        kind: ResourceKind,
        /// Resource name.
        name: String,
        /// Provider message.
        message: String,
    },

    /// The provider asked us to slow down.
    #[error("{kind} request throttled")]
    Throttled {
        /// Resource kind.
        kind: ResourceKind,
    },

    /// The desired spec cannot be applied by this adapter.
    #[error("invalid {kind} spec: {message}")]
    InvalidSpec {
        /// Resource kind.
        kind: ResourceKind,
        /// What is wrong with it.
        message: String,
    },

    /// The adapter's own state could not be read or written.
    #[error("state error: {0}")]
    State(String),
}

impl CloudError {
    /// Creates a rejection error.
    #[must_use]
    pub fn rejected(kind: ResourceKind, name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            kind,
            name: name.into(),
            message: message.into(),
        }
    }

    /// Returns true for the "resource not found" case.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<std::io::Error> for CloudError {
    fn from(err: std::io::Error) -> Self {
        Self::State(err.to_string())
    }
}

impl From<serde_json::Error> for CloudError {
    fn from(err: serde_json::Error) -> Self {
        Self::State(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_detection() {
        let err = CloudError::NotFound {
            kind: ResourceKind::Stack,
            name: "app-dev".to_string(),
        };
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "stack 'app-dev' not found");
        assert!(!CloudError::rejected(ResourceKind::Role, "r", "denied").is_not_found());
    }
}
