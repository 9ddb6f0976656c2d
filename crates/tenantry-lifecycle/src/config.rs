//! Migration configuration

use serde::{Deserialize, Serialize};
use tenantry_core::{Error, Result};

/// What a rename does when a batch write rejects documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchFailurePolicy {
    /// Count and log rejected documents, keep copying, complete the rename
    #[default]
    Tolerate,
    /// Abort on the first batch with a rejected document; nothing is repointed
    FailFast,
}

impl BatchFailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchFailurePolicy::Tolerate => "tolerate",
            BatchFailurePolicy::FailFast => "fail_fast",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "tolerate" => Some(BatchFailurePolicy::Tolerate),
            "fail_fast" => Some(BatchFailurePolicy::FailFast),
            _ => None,
        }
    }
}

/// Rename migration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Documents per bulk insert
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default)]
    pub failure_policy: BatchFailurePolicy,
}

fn default_batch_size() -> usize {
    500
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            failure_policy: BatchFailurePolicy::default(),
        }
    }
}

impl MigrationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::Config(
                "migration.batch_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MigrationConfig::default();
        assert_eq!(config.batch_size, 500);
        assert_eq!(config.failure_policy, BatchFailurePolicy::Tolerate);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let config = MigrationConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!(
            BatchFailurePolicy::parse("fail-fast"),
            Some(BatchFailurePolicy::FailFast)
        );
        assert_eq!(
            BatchFailurePolicy::parse("TOLERATE"),
            Some(BatchFailurePolicy::Tolerate)
        );
        assert_eq!(BatchFailurePolicy::parse("retry"), None);

        let parsed: MigrationConfig =
            serde_json::from_str(r#"{"failure_policy": "fail_fast"}"#).unwrap();
        assert_eq!(parsed.failure_policy, BatchFailurePolicy::FailFast);
        assert_eq!(parsed.batch_size, 500);
    }
}
