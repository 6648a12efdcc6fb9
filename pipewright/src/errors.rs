//! Error types for pipewright.
//!
//! Validation problems are collected as lists wherever a whole specification
//! is checked, so a user sees every problem at once. Cloud failures travel as
//! [`CloudError`] and abort the level or phase they happen in.

use crate::cloud::CloudError;
use crate::core::LifecycleStage;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// The main error type for pipewright operations.
#[derive(Debug, Error)]
pub enum PipewrightError {
    /// A single validation error.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// A specification failed validation with one or more errors.
    #[error("{}", render_errors(.errors))]
    InvalidSpec {
        /// Every problem that was found.
        errors: Vec<ValidationError>,
    },

    /// A dependency cycle was found in an environment graph.
    #[error("{0}")]
    CycleDetected(#[from] CycleDetectedError),

    /// A cloud provider call was rejected.
    #[error("{0}")]
    Cloud(#[from] CloudError),

    /// One or more services failed inside a single orchestration level.
    #[error("{stage} failed at level {level}: {}", render_failures(.failures))]
    LevelFailed {
        /// The lifecycle stage that was running.
        stage: LifecycleStage,
        /// Zero-based level index.
        level: usize,
        /// Every service in the level that failed.
        failures: Vec<ServiceFailure>,
    },

    /// A pipeline phase failed.
    #[error("phase '{phase}' failed: {source}")]
    Phase {
        /// The phase name.
        phase: String,
        /// The underlying error.
        #[source]
        source: Box<PipewrightError>,
    },

    /// An environment provisioned by a phase did not deploy.
    #[error("environment '{environment}' failed: {message}")]
    Environment {
        /// The environment name.
        environment: String,
        /// The failure message from the orchestrator.
        message: String,
    },

    /// A spawned task panicked or was aborted.
    #[error("Task join error: {0}")]
    TaskJoin(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipewrightError {
    /// Wraps an error with the name of the phase it occurred in.
    #[must_use]
    pub fn in_phase(phase: impl Into<String>, source: Self) -> Self {
        Self::Phase {
            phase: phase.into(),
            source: Box::new(source),
        }
    }

    /// Returns true if the error came from validation rather than a cloud call.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        match self {
            Self::Validation(_) | Self::InvalidSpec { .. } | Self::CycleDetected(_) => true,
            Self::Phase { source, .. } => source.is_validation(),
            _ => false,
        }
    }
}

fn render_errors(errors: &[ValidationError]) -> String {
    let lines: Vec<String> = errors.iter().map(ToString::to_string).collect();
    format!("{} validation error(s):\n{}", errors.len(), lines.join("\n"))
}

fn render_failures(failures: &[ServiceFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.service, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

/// A failure of one service inside an orchestration level.
#[derive(Debug)]
pub struct ServiceFailure {
    /// The service name.
    pub service: String,
    /// What went wrong.
    pub error: PipewrightError,
}

/// Metadata about a validation error for better diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ContractErrorInfo {
    /// Error code (e.g., "CONTRACT-004-CYCLE").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ContractErrorInfo {
    /// Creates a new contract error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// A bad or incomplete specification, detected before any cloud call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ValidationError {
    /// The error message.
    pub message: String,
    /// The phases or services the error is about.
    pub subjects: Vec<String>,
    /// Optional contract error info.
    pub error_info: Option<ContractErrorInfo>,
}

impl ValidationError {
    /// Creates a new validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            subjects: Vec::new(),
            error_info: None,
        }
    }

    /// Sets the subjects involved.
    #[must_use]
    pub fn with_subjects(mut self, subjects: Vec<String>) -> Self {
        self.subjects = subjects;
        self
    }

    /// Adds one subject.
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subjects.push(subject.into());
        self
    }

    /// Sets the contract error info.
    #[must_use]
    pub fn with_error_info(mut self, info: ContractErrorInfo) -> Self {
        self.error_info = Some(info);
        self
    }

    /// Returns the error code, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.error_info.as_ref().map(|info| info.code.as_str())
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("message".to_string(), serde_json::json!(self.message));
        map.insert("subjects".to_string(), serde_json::json!(self.subjects));
        if let Some(ref info) = self.error_info {
            map.insert("code".to_string(), serde_json::json!(info.code));
            if let Some(ref hint) = info.fix_hint {
                map.insert("fix_hint".to_string(), serde_json::json!(hint));
            }
        }
        map
    }
}

/// Error raised when a cycle is detected in a dependency graph.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Cycle detected in environment: {}", cycle_path.join(" -> "))]
pub struct CycleDetectedError {
    /// The path of services forming the cycle.
    pub cycle_path: Vec<String>,
    /// Contract error info.
    pub error_info: ContractErrorInfo,
}

impl CycleDetectedError {
    /// Creates a new cycle detected error.
    #[must_use]
    pub fn new(cycle_path: Vec<String>) -> Self {
        let info = ContractErrorInfo::new(
            codes::CYCLE,
            format!("Environment contains a dependency cycle: {}", cycle_path.join(" -> ")),
        )
        .with_fix_hint("Remove one of the dependencies in the cycle to break it.");

        Self {
            cycle_path,
            error_info: info,
        }
    }
}

impl From<CycleDetectedError> for ValidationError {
    fn from(err: CycleDetectedError) -> Self {
        Self {
            message: err.to_string(),
            subjects: err.cycle_path.clone(),
            error_info: Some(err.error_info),
        }
    }
}

/// Error codes attached to [`ContractErrorInfo`].
pub mod codes {
    /// Dependency cycle.
    pub const CYCLE: &str = "CONTRACT-004-CYCLE";
    /// Dependency on a service that does not exist.
    pub const MISSING_DEP: &str = "CONTRACT-004-MISSING_DEP";
    /// Unknown phase or service type tag.
    pub const UNKNOWN_TYPE: &str = "CONTRACT-005-UNKNOWN_TYPE";
    /// A required secret was not supplied.
    pub const MISSING_SECRET: &str = "CONTRACT-006-MISSING_SECRET";
    /// A phase or service rejected its parameters.
    pub const BAD_PARAMS: &str = "CONTRACT-007-BAD_PARAMS";
    /// The pipeline file itself is malformed.
    pub const BAD_FILE: &str = "CONTRACT-008-BAD_FILE";
}

/// Provides default suggestions for common error codes.
pub struct ErrorSuggestions;

impl ErrorSuggestions {
    /// Gets a suggestion for a given error code.
    #[must_use]
    pub fn get(code: &str) -> Option<&'static str> {
        match code {
            codes::CYCLE => Some(
                "Check your service dependencies for circular references. \
                 A service may only depend on services that do not depend on it.",
            ),
            codes::MISSING_DEP => Some(
                "Ensure all dependencies reference services declared in the same environment. \
                 Check for typos in service names.",
            ),
            codes::UNKNOWN_TYPE => Some(
                "Use one of the registered types. Run `pipewright check` to list problems.",
            ),
            codes::MISSING_SECRET => Some(
                "Pass every required secret through --secrets. \
                 Run `pipewright list-secrets` to see what each phase needs.",
            ),
            _ => None,
        }
    }
}
