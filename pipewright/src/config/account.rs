//! Account configuration.
//!
//! An [`AccountConfig`] is always passed by value or `Arc` into the operations
//! that need it. There is no process-wide copy.

use crate::errors::{codes, ContractErrorInfo, PipewrightError, ValidationError};
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Identity and network topology of the target cloud account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Account identifier. Numeric ids in config files are accepted.
    #[serde(deserialize_with = "string_or_number")]
    pub account_id: String,
    /// Region the pipeline lives in.
    pub region: String,
    /// VPC id.
    #[serde(default)]
    pub vpc: String,
    /// Public subnet ids.
    #[serde(default)]
    pub public_subnets: Vec<String>,
    /// Private subnet ids.
    #[serde(default)]
    pub private_subnets: Vec<String>,
    /// Data subnet ids.
    #[serde(default)]
    pub data_subnets: Vec<String>,
    /// Security group of the SSH bastion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_bastion_sg: Option<String>,
    /// On-premises CIDR allowed into the VPC.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_prem_cidr: Option<String>,
    /// AMI used for container hosts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ecs_ami: Option<String>,
    /// Anything else in the file, passed through untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "account_id must be a string or number, got {other}"
        ))),
    }
}

impl AccountConfig {
    /// Creates a minimal account config.
    #[must_use]
    pub fn new(account_id: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            region: region.into(),
            vpc: String::new(),
            public_subnets: Vec::new(),
            private_subnets: Vec::new(),
            data_subnets: Vec::new(),
            ssh_bastion_sg: None,
            on_prem_cidr: None,
            ecs_ami: None,
            extra: BTreeMap::new(),
        }
    }

    /// Config used when validating specs without a real account.
    #[must_use]
    pub fn placeholder() -> Self {
        let mut config = Self::new("111111111111", "us-west-2");
        config.vpc = "vpc-aaaaaaaa".to_string();
        config.public_subnets = vec!["subnet-ffffffff".to_string(), "subnet-44444444".to_string()];
        config.private_subnets = vec!["subnet-00000000".to_string(), "subnet-77777777".to_string()];
        config.data_subnets = vec!["subnet-eeeeeeee".to_string(), "subnet-99999999".to_string()];
        config
    }

    /// Loads an account config from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PipewrightError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the fields every operation relies on.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first missing field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let info = |field: &str| {
            ContractErrorInfo::new(codes::BAD_FILE, format!("account config is missing '{field}'"))
        };
        if self.account_id.trim().is_empty() {
            return Err(ValidationError::new("account_id is required").with_error_info(info("account_id")));
        }
        if self.region.trim().is_empty() {
            return Err(ValidationError::new("region is required").with_error_info(info("region")));
        }
        Ok(())
    }

    /// Name of the bucket pipelines in this account store artifacts in.
    #[must_use]
    pub fn codepipeline_bucket_name(&self) -> String {
        format!("codepipeline-{}-{}", self.region, self.account_id)
    }

    /// Base64 of the JSON form, for handing the config to build containers.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn encoded(&self) -> Result<String, PipewrightError> {
        let json = serde_json::to_vec(self)?;
        Ok(base64::engine::general_purpose::STANDARD.encode(json))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_numeric_account_id() {
        let config: AccountConfig =
            serde_json::from_str(r#"{"account_id": 123456789012, "region": "us-east-1", "custom": 1}"#)
                .unwrap();
        assert_eq!(config.account_id, "123456789012");
        assert_eq!(config.extra.get("custom"), Some(&serde_json::json!(1)));
    }

    #[test]
    fn test_bucket_name() {
        let config = AccountConfig::new("123", "eu-west-1");
        assert_eq!(config.codepipeline_bucket_name(), "codepipeline-eu-west-1-123");
    }

    #[test]
    fn test_validate_rejects_empty_region() {
        let config = AccountConfig::new("123", " ");
        let err = config.validate().unwrap_err();
        assert_eq!(err.code(), Some(codes::BAD_FILE));
    }

    #[test]
    fn test_encoded_round_trips_through_base64() {
        let config = AccountConfig::placeholder();
        let encoded = config.encoded().unwrap();
        let decoded = base64::engine::general_purpose::STANDARD.decode(encoded).unwrap();
        let back: AccountConfig = serde_json::from_slice(&decoded).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"account_id": "999", "region": "us-west-2"}}"#).unwrap();

        let config = AccountConfig::load(file.path()).unwrap();
        assert_eq!(config.account_id, "999");
    }
}
