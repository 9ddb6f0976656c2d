//! Authentication configuration.

use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};

/// Signing secret used when none is configured. Accepted, with a warning at startup.
pub const DEVELOPMENT_SECRET: &str = "tenantry-development-secret-change-me";

/// HMAC algorithms accepted for access tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JwtAlgorithm {
    #[default]
    HS256,
    HS384,
    HS512,
}

impl JwtAlgorithm {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "HS256" => Some(Self::HS256),
            "HS384" => Some(Self::HS384),
            "HS512" => Some(Self::HS512),
            _ => None,
        }
    }
}

impl From<JwtAlgorithm> for Algorithm {
    fn from(value: JwtAlgorithm) -> Self {
        match value {
            JwtAlgorithm::HS256 => Algorithm::HS256,
            JwtAlgorithm::HS384 => Algorithm::HS384,
            JwtAlgorithm::HS512 => Algorithm::HS512,
        }
    }
}

/// Configuration for token signing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Shared HMAC signing secret.
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    #[serde(default)]
    pub jwt_algorithm: JwtAlgorithm,
    /// Access token lifetime in seconds (default: 3600).
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
}

fn default_jwt_secret() -> String {
    DEVELOPMENT_SECRET.to_string()
}

fn default_token_ttl_secs() -> u64 {
    3600
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            jwt_algorithm: JwtAlgorithm::default(),
            token_ttl_secs: default_token_ttl_secs(),
        }
    }
}

impl AuthConfig {
    pub fn uses_development_secret(&self) -> bool {
        self.jwt_secret == DEVELOPMENT_SECRET
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algorithm_parse_is_case_insensitive() {
        assert_eq!(JwtAlgorithm::parse("hs512"), Some(JwtAlgorithm::HS512));
        assert_eq!(JwtAlgorithm::parse("RS256"), None);
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let config: AuthConfig = serde_json::from_str(r#"{"jwt_algorithm": "HS384"}"#).unwrap();
        assert_eq!(config.jwt_algorithm, JwtAlgorithm::HS384);
        assert_eq!(config.token_ttl_secs, 3600);
        assert!(config.uses_development_secret());
    }
}
