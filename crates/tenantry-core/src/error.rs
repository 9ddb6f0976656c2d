//! Error types for Tenantry Core

use thiserror::Error;

use crate::region::MigrationReport;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Organization already exists: {0}")]
    OrganizationExists(String),

    /// Raised by a directory when its storage-level unique constraint rejects a write.
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Server-side integrity fault, e.g. an organization without its admin record.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid region name: {0}")]
    InvalidRegionName(String),

    #[error("Migration aborted: {0}")]
    MigrationAborted(Box<MigrationReport>),

    #[error("Credential error: {0}")]
    Credential(String),

    // Storage errors
    #[error("Database error: {0}")]
    Database(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable snake_case classification, used in API error bodies and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "not_found",
            Error::OrganizationExists(_) => "organization_exists",
            Error::UniqueViolation(_) => "unique_violation",
            Error::Unauthorized(_) => "unauthorized",
            Error::Forbidden(_) => "forbidden",
            Error::InvariantViolation(_) => "invariant_violation",
            Error::InvalidRequest(_) => "invalid_request",
            Error::InvalidRegionName(_) => "invalid_region_name",
            Error::MigrationAborted(_) => "migration_aborted",
            Error::Credential(_) => "credential_error",
            Error::Database(_) => "database_error",
            Error::Config(_) => "config_error",
            Error::Serialization(_) => "serialization_error",
            Error::Internal(_) => "internal_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
