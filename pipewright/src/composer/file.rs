//! The declarative pipeline file.

use crate::errors::{codes, ContractErrorInfo, PipewrightError, ValidationError};
use crate::phases::PhaseSpec;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::LazyLock;

/// The only supported file format version.
pub const SUPPORTED_VERSION: u32 = 1;

/// Phase types that can start a pipeline.
pub const SOURCE_PHASE_TYPES: &[&str] = &["github", "codecommit"];

static APP_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9-]+$").expect("app name pattern is valid"));
static ITEM_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("item name pattern is valid"));

/// A pipeline file: one application and its named pipelines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineFile {
    /// File format version.
    pub version: u32,
    /// Application name.
    pub name: String,
    /// Pipelines keyed by name.
    #[serde(default)]
    pub pipelines: BTreeMap<String, PipelineConfig>,
}

impl PipelineFile {
    /// Parses a pipeline file from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed.
    pub fn from_json(raw: &str) -> Result<Self, PipewrightError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Reads and parses a pipeline file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PipewrightError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&raw)
    }

    /// Looks a pipeline up.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the file has no such pipeline.
    pub fn pipeline(&self, name: &str) -> Result<&PipelineConfig, ValidationError> {
        self.pipelines.get(name).ok_or_else(|| {
            let known: Vec<&str> = self.pipelines.keys().map(String::as_str).collect();
            ValidationError::new(format!("pipeline '{name}' is not defined in the file"))
                .with_subject(name)
                .with_error_info(
                    ContractErrorInfo::new(codes::BAD_FILE, "Unknown pipeline")
                        .with_context_entry("pipelines", known.join(", ")),
                )
        })
    }
}

/// One pipeline: its phases in declared order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawPipelineConfig")]
pub struct PipelineConfig {
    /// Phases with 1-based positions assigned.
    pub phases: Vec<PhaseSpec>,
}

#[derive(Deserialize)]
struct RawPipelineConfig {
    #[serde(default)]
    phases: Vec<PhaseSpec>,
}

impl From<RawPipelineConfig> for PipelineConfig {
    fn from(raw: RawPipelineConfig) -> Self {
        Self::new(raw.phases)
    }
}

impl PipelineConfig {
    /// Creates a pipeline, numbering phases from 1 in the given order.
    #[must_use]
    pub fn new(phases: Vec<PhaseSpec>) -> Self {
        let phases = phases
            .into_iter()
            .enumerate()
            .map(|(index, phase)| phase.with_position(index + 1))
            .collect();
        Self { phases }
    }
}

fn file_error(message: String, subject: &str) -> ValidationError {
    ValidationError::new(message)
        .with_subject(subject)
        .with_error_info(ContractErrorInfo::new(codes::BAD_FILE, "Invalid pipeline file"))
}

/// Checks the structure of a pipeline file, returning every problem found.
#[must_use]
pub fn validate_pipeline_file(file: &PipelineFile) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if file.version != SUPPORTED_VERSION {
        errors.push(file_error(
            format!("version {} is not supported, expected {SUPPORTED_VERSION}", file.version),
            "version",
        ));
    }
    if !APP_NAME.is_match(&file.name) {
        errors.push(file_error(
            format!("app name '{}' may only contain letters, digits and dashes", file.name),
            &file.name,
        ));
    }
    if file.pipelines.is_empty() {
        errors.push(file_error("the file must declare at least one pipeline".to_string(), "pipelines"));
    }

    for (pipeline_name, pipeline) in &file.pipelines {
        if !ITEM_NAME.is_match(pipeline_name) {
            errors.push(file_error(
                format!("pipeline name '{pipeline_name}' may only contain letters, digits, dashes and underscores"),
                pipeline_name,
            ));
        }

        let Some(first) = pipeline.phases.first() else {
            errors.push(file_error(
                format!("pipeline '{pipeline_name}' must declare at least one phase"),
                pipeline_name,
            ));
            continue;
        };
        if !SOURCE_PHASE_TYPES.contains(&first.phase_type.as_str()) {
            errors.push(file_error(
                format!(
                    "pipeline '{pipeline_name}': the first phase must be a source phase ({}), found '{}'",
                    SOURCE_PHASE_TYPES.join(", "),
                    first.phase_type
                ),
                &first.name,
            ));
        }

        let mut seen = HashSet::new();
        for phase in &pipeline.phases {
            if !ITEM_NAME.is_match(&phase.name) {
                errors.push(file_error(
                    format!(
                        "pipeline '{pipeline_name}': phase name '{}' may only contain letters, digits, dashes and underscores",
                        phase.name
                    ),
                    &phase.name,
                ));
            }
            if !seen.insert(phase.name.as_str()) {
                errors.push(file_error(
                    format!("pipeline '{pipeline_name}': phase name '{}' is used more than once", phase.name),
                    &phase.name,
                ));
            }
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FILE: &str = r#"{
        "version": 1,
        "name": "shop",
        "pipelines": {
            "main": {
                "phases": [
                    {"type": "github", "name": "source", "owner": "acme", "repo": "shop", "branch": "main"},
                    {"type": "codebuild", "name": "build", "build_image": "aws/codebuild/standard:7.0"}
                ]
            }
        }
    }"#;

    #[test]
    fn test_positions_follow_declaration_order() {
        let file = PipelineFile::from_json(FILE).unwrap();
        let phases = &file.pipeline("main").unwrap().phases;
        assert_eq!(phases[0].position, 1);
        assert_eq!(phases[1].position, 2);
        assert_eq!(phases[1].param_str("build_image"), Some("aws/codebuild/standard:7.0"));
        assert!(validate_pipeline_file(&file).is_empty());
    }

    #[test]
    fn test_unknown_pipeline() {
        let file = PipelineFile::from_json(FILE).unwrap();
        let err = file.pipeline("release").unwrap_err();
        assert_eq!(err.code(), Some(codes::BAD_FILE));
    }

    #[test]
    fn test_every_problem_is_reported() {
        let file = PipelineFile {
            version: 2,
            name: "my shop".to_string(),
            pipelines: BTreeMap::from([
                ("empty".to_string(), PipelineConfig::new(Vec::new())),
                (
                    "main".to_string(),
                    PipelineConfig::new(vec![
                        PhaseSpec::new("build", "codebuild"),
                        PhaseSpec::new("build", "approval"),
                        PhaseSpec::new("bad name", "approval"),
                    ]),
                ),
            ]),
        };

        let errors = validate_pipeline_file(&file);
        let messages: Vec<&str> = errors.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(errors.len(), 6, "{messages:#?}");
        assert!(messages.iter().any(|m| m.contains("first phase must be a source phase")));
        assert!(messages.iter().any(|m| m.contains("used more than once")));
        assert!(messages.iter().any(|m| m.contains("'empty' must declare at least one phase")));
    }

    #[test]
    fn test_name_patterns() {
        for ok in ["shop", "shop-2", "A1"] {
            assert!(APP_NAME.is_match(ok), "{ok}");
        }
        for bad in ["", "shop_api", "my shop"] {
            assert!(!APP_NAME.is_match(bad), "{bad}");
        }
        assert!(ITEM_NAME.is_match("build_and-test"));
        assert!(!ITEM_NAME.is_match("build/test"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        std::fs::write(&path, FILE).unwrap();
        let file = PipelineFile::load(&path).unwrap();
        assert_eq!(file.name, "shop");
    }
}
