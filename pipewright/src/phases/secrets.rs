//! Phase secrets: what each phase asks for and what was supplied.

use crate::errors::{codes, ContractErrorInfo, PipewrightError, ValidationError};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A secret a phase needs before it can deploy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretQuestion {
    /// The phase asking.
    pub phase_name: String,
    /// Secret key, e.g. `githubAccessToken`.
    pub name: String,
    /// Prompt text.
    pub message: String,
}

impl SecretQuestion {
    /// Creates a question.
    #[must_use]
    pub fn new(phase_name: impl Into<String>, name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            phase_name: phase_name.into(),
            name: name.into(),
            message: message.into(),
        }
    }
}

/// One entry of the non-interactive secrets document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretEntry {
    /// The phase the secret belongs to.
    pub phase_name: String,
    /// Secret key.
    pub name: String,
    /// Secret value.
    pub value: String,
}

/// Secrets of one phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretBundle(BTreeMap<String, String>);

impl SecretBundle {
    /// Creates an empty bundle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a secret.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Adds a secret in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    /// Reads a secret.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Returns the keys from `required` that are absent or empty.
    #[must_use]
    pub fn require<S: AsRef<str>>(&self, required: &[S]) -> Vec<String> {
        required
            .iter()
            .map(|key| key.as_ref())
            .filter(|key| self.get(key).map_or(true, str::is_empty))
            .map(str::to_string)
            .collect()
    }

    /// Number of secrets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the bundle is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Groups secret entries by phase name.
    #[must_use]
    pub fn group(entries: impl IntoIterator<Item = SecretEntry>) -> BTreeMap<String, Self> {
        let mut grouped: BTreeMap<String, Self> = BTreeMap::new();
        for entry in entries {
            grouped.entry(entry.phase_name).or_default().insert(entry.name, entry.value);
        }
        grouped
    }

    /// Decodes the non-interactive secrets document.
    ///
    /// The input is base64 of a JSON array of `{phaseName, name, value}`.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the input is not base64 or not the
    /// expected JSON shape.
    pub fn decode_all(encoded: &str) -> Result<BTreeMap<String, Self>, PipewrightError> {
        let bad_input = |detail: String| {
            ValidationError::new(format!("secrets could not be decoded: {detail}")).with_error_info(
                ContractErrorInfo::new(codes::BAD_FILE, "Malformed secrets document")
                    .with_fix_hint("Pass base64 of a JSON array of {phaseName, name, value} objects."),
            )
        };

        let raw = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|err| bad_input(err.to_string()))?;
        let entries: Vec<SecretEntry> =
            serde_json::from_slice(&raw).map_err(|err| bad_input(err.to_string()))?;
        Ok(Self::group(entries))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SecretBundle {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn encode(value: &serde_json::Value) -> String {
        base64::engine::general_purpose::STANDARD.encode(value.to_string())
    }

    #[test]
    fn test_decode_groups_by_phase() {
        let encoded = encode(&serde_json::json!([
            {"phaseName": "source", "name": "githubAccessToken", "value": "t0k"},
            {"phaseName": "smoke", "name": "runscopeTriggerUrl", "value": "https://x"},
            {"phaseName": "smoke", "name": "runscopeAccessToken", "value": "abc"}
        ]));

        let bundles = SecretBundle::decode_all(&encoded).unwrap();
        assert_eq!(bundles.len(), 2);
        assert_eq!(bundles["source"].get("githubAccessToken"), Some("t0k"));
        assert_eq!(bundles["smoke"].len(), 2);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = SecretBundle::decode_all("not base64!").unwrap_err();
        assert!(err.is_validation());

        let err = SecretBundle::decode_all(&encode(&serde_json::json!({"a": 1}))).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_require_lists_missing_and_empty() {
        let bundle = SecretBundle::new().with("a", "1").with("b", "");
        assert_eq!(bundle.require(&["a", "b", "c"]), vec!["b".to_string(), "c".to_string()]);
    }
}
