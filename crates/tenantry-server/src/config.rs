//! Server configuration
//!
//! Loaded from YAML (default) or TOML by file extension, then overridden by
//! `TENANTRY_*` environment variables, then by CLI flags.
//!
//! ```yaml
//! host: 0.0.0.0
//! port: 8080
//! storage:
//!   backend: sqlite
//!   url: /var/lib/tenantry/tenantry.db
//! auth:
//!   jwt_secret: change-me
//!   jwt_algorithm: HS256
//!   token_ttl_secs: 3600
//! migration:
//!   batch_size: 500
//!   failure_policy: tolerate
//! logging:
//!   level: info
//!   json: false
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use tenantry_auth::{AuthConfig, JwtAlgorithm};
use tenantry_lifecycle::{BatchFailurePolicy, MigrationConfig};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local, lost on exit
    Memory,
    #[default]
    Sqlite,
    Postgres,
}

impl StorageBackend {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "memory" => Some(Self::Memory),
            "sqlite" => Some(Self::Sqlite),
            "postgres" | "postgresql" => Some(Self::Postgres),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// SQLite file path or PostgreSQL connection URL
    #[serde(default = "default_storage_url")]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default = "default_false")]
    pub json: bool,

    #[serde(default = "default_false")]
    pub log_sql_queries: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub migration: MigrationConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            storage: StorageConfig::default(),
            auth: AuthConfig::default(),
            migration: MigrationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            url: default_storage_url(),
            max_connections: default_max_connections(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            log_sql_queries: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    FileRead(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid config: {0}")]
    ValidationError(String),
}

impl ServerConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::FileRead(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let config = if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))?
        } else {
            // Default to YAML
            serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(format!("YAML parse error: {}", e)))?
        };

        Ok(config)
    }

    /// Merge environment variables into config (env vars take precedence)
    ///
    /// Runs before logging is initialized, so unusable values are reported
    /// on stderr and ignored.
    pub fn merge_env(&mut self) {
        // Server settings
        if let Ok(val) = std::env::var("TENANTRY_HOST") {
            self.host = val;
        }

        if let Ok(val) = std::env::var("TENANTRY_PORT") {
            match val.parse::<u16>() {
                Ok(port) => self.port = port,
                Err(_) => eprintln!("Warning: Invalid TENANTRY_PORT '{}', ignoring", val),
            }
        }

        // Storage settings
        if let Ok(val) = std::env::var("TENANTRY_STORAGE_BACKEND") {
            match StorageBackend::parse(&val) {
                Some(backend) => self.storage.backend = backend,
                None => eprintln!(
                    "Warning: Invalid TENANTRY_STORAGE_BACKEND '{}', using {:?}",
                    val, self.storage.backend
                ),
            }
        }

        if let Ok(val) = std::env::var("TENANTRY_DATABASE_URL") {
            self.storage.url = val;
        }

        // Auth settings
        if let Ok(val) = std::env::var("TENANTRY_JWT_SECRET") {
            self.auth.jwt_secret = val;
        }

        if let Ok(val) = std::env::var("TENANTRY_JWT_ALGORITHM") {
            match JwtAlgorithm::parse(&val) {
                Some(algorithm) => self.auth.jwt_algorithm = algorithm,
                None => eprintln!("Warning: Invalid TENANTRY_JWT_ALGORITHM '{}', ignoring", val),
            }
        }

        if let Ok(val) = std::env::var("TENANTRY_TOKEN_TTL_SECS") {
            match val.parse::<u64>() {
                Ok(ttl) => self.auth.token_ttl_secs = ttl,
                Err(_) => eprintln!("Warning: Invalid TENANTRY_TOKEN_TTL_SECS '{}', ignoring", val),
            }
        }

        // Migration settings
        if let Ok(val) = std::env::var("TENANTRY_BATCH_SIZE") {
            match val.parse::<usize>() {
                Ok(size) => self.migration.batch_size = size,
                Err(_) => eprintln!("Warning: Invalid TENANTRY_BATCH_SIZE '{}', ignoring", val),
            }
        }

        if let Ok(val) = std::env::var("TENANTRY_MIGRATION_FAILURE_POLICY") {
            match BatchFailurePolicy::parse(&val) {
                Some(policy) => self.migration.failure_policy = policy,
                None => eprintln!(
                    "Warning: Invalid TENANTRY_MIGRATION_FAILURE_POLICY '{}', ignoring",
                    val
                ),
            }
        }

        // Logging settings
        if let Ok(val) = std::env::var("TENANTRY_LOG_LEVEL") {
            self.logging.level = val;
        }

        if let Ok(val) = std::env::var("TENANTRY_LOG_JSON")
            && let Ok(enabled) = val.parse::<bool>()
        {
            self.logging.json = enabled;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.migration
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        if self.auth.jwt_secret.is_empty() {
            return Err(ConfigError::ValidationError(
                "auth.jwt_secret must not be empty".to_string(),
            ));
        }

        if self.auth.token_ttl_secs == 0 {
            return Err(ConfigError::ValidationError(
                "auth.token_ttl_secs must be greater than 0".to_string(),
            ));
        }

        if self.storage.backend != StorageBackend::Memory && self.storage.url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "storage.url is required for the sqlite and postgres backends".to_string(),
            ));
        }

        Ok(())
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_storage_url() -> String {
    "./tenantry.db".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_false() -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    const ENV_VARS: &[&str] = &[
        "TENANTRY_HOST",
        "TENANTRY_PORT",
        "TENANTRY_STORAGE_BACKEND",
        "TENANTRY_DATABASE_URL",
        "TENANTRY_JWT_SECRET",
        "TENANTRY_JWT_ALGORITHM",
        "TENANTRY_TOKEN_TTL_SECS",
        "TENANTRY_BATCH_SIZE",
        "TENANTRY_MIGRATION_FAILURE_POLICY",
        "TENANTRY_LOG_LEVEL",
        "TENANTRY_LOG_JSON",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            // SAFETY: tests touching the environment are serialized
            unsafe { std::env::remove_var(var) };
        }
    }

    fn write_config(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.migration.batch_size, 500);
        assert_eq!(config.auth.token_ttl_secs, 3600);
        assert!(config.auth.uses_development_secret());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_file() {
        let file = write_config(
            ".yaml",
            r#"
port: 9000
storage:
  backend: memory
auth:
  jwt_secret: s3cret
  jwt_algorithm: HS512
migration:
  batch_size: 50
  failure_policy: fail_fast
logging:
  json: true
"#,
        );

        let config = ServerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.auth.jwt_algorithm, JwtAlgorithm::HS512);
        assert_eq!(config.auth.token_ttl_secs, 3600);
        assert_eq!(config.migration.batch_size, 50);
        assert_eq!(config.migration.failure_policy, BatchFailurePolicy::FailFast);
        assert!(config.logging.json);
    }

    #[test]
    fn test_toml_file() {
        let file = write_config(
            ".toml",
            r#"
host = "0.0.0.0"

[storage]
backend = "postgres"
url = "postgres://localhost/tenantry"

[migration]
batch_size = 1000
"#,
        );

        let config = ServerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.storage.backend, StorageBackend::Postgres);
        assert_eq!(config.storage.url, "postgres://localhost/tenantry");
        assert_eq!(config.migration.batch_size, 1000);
    }

    #[test]
    fn test_missing_file() {
        let result = ServerConfig::from_file("/nonexistent/tenantry.yaml");
        assert!(matches!(result, Err(ConfigError::FileRead(_))));
    }

    #[test]
    fn test_invalid_yaml() {
        let file = write_config(".yaml", "port: [not a port");
        let result = ServerConfig::from_file(file.path());
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_validation() {
        let mut config = ServerConfig::default();
        config.migration.batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.auth.jwt_secret = String::new();
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.auth.token_ttl_secs = 0;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.storage.url = " ".to_string();
        assert!(config.validate().is_err());
        config.storage.backend = StorageBackend::Memory;
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        // SAFETY: serialized with every other env-mutating test
        unsafe {
            std::env::set_var("TENANTRY_PORT", "7070");
            std::env::set_var("TENANTRY_STORAGE_BACKEND", "postgres");
            std::env::set_var("TENANTRY_DATABASE_URL", "postgres://db/tenantry");
            std::env::set_var("TENANTRY_JWT_SECRET", "from-env");
            std::env::set_var("TENANTRY_JWT_ALGORITHM", "hs384");
            std::env::set_var("TENANTRY_BATCH_SIZE", "64");
            std::env::set_var("TENANTRY_MIGRATION_FAILURE_POLICY", "fail-fast");
            std::env::set_var("TENANTRY_LOG_JSON", "true");
        }

        let mut config = ServerConfig::default();
        config.merge_env();
        clear_env();

        assert_eq!(config.port, 7070);
        assert_eq!(config.storage.backend, StorageBackend::Postgres);
        assert_eq!(config.storage.url, "postgres://db/tenantry");
        assert_eq!(config.auth.jwt_secret, "from-env");
        assert_eq!(config.auth.jwt_algorithm, JwtAlgorithm::HS384);
        assert_eq!(config.migration.batch_size, 64);
        assert_eq!(config.migration.failure_policy, BatchFailurePolicy::FailFast);
        assert!(config.logging.json);
    }

    #[test]
    #[serial]
    fn test_invalid_env_values_are_ignored() {
        clear_env();
        // SAFETY: serialized with every other env-mutating test
        unsafe {
            std::env::set_var("TENANTRY_PORT", "not-a-port");
            std::env::set_var("TENANTRY_STORAGE_BACKEND", "mongodb");
            std::env::set_var("TENANTRY_BATCH_SIZE", "-1");
        }

        let mut config = ServerConfig::default();
        config.merge_env();
        clear_env();

        assert_eq!(config.port, 8080);
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.migration.batch_size, 500);
    }
}
