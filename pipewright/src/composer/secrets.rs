//! Where phase secrets come from.

use crate::errors::PipewrightError;
use crate::phases::{SecretBundle, SecretQuestion};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;

/// Asks a person for secret values.
#[async_trait]
pub trait SecretPrompter: Send + Sync {
    /// Returns the answer to one question.
    async fn ask(&self, question: &SecretQuestion) -> Result<String, PipewrightError>;
}

/// The source of secrets for a deploy.
pub enum SecretSource<'a> {
    /// Pre-supplied bundles keyed by phase name.
    NonInteractive(BTreeMap<String, SecretBundle>),
    /// Ask for each secret.
    Interactive(&'a dyn SecretPrompter),
}

impl SecretSource<'_> {
    /// A non-interactive source with no secrets at all.
    #[must_use]
    pub fn empty() -> Self {
        Self::NonInteractive(BTreeMap::new())
    }
}

impl fmt::Debug for SecretSource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Values stay out of logs.
            Self::NonInteractive(bundles) => f
                .debug_tuple("NonInteractive")
                .field(&bundles.keys().collect::<Vec<_>>())
                .finish(),
            Self::Interactive(_) => f.write_str("Interactive"),
        }
    }
}
