//! Administrator credential records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::organization::OrganizationId;

/// Identifier of an admin credential record.
///
/// Derived from the admin's email and the creation second, so two admins
/// created with the same email within one second collide. The directory's
/// primary key rejects the second insert.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdminId(String);

impl AdminId {
    /// Derive the identifier for an admin created at `at`.
    pub fn derive(email: &str, at: DateTime<Utc>) -> Self {
        Self(format!("admin_{}_{}", email, at.timestamp()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for AdminId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for AdminId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for AdminId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminRole {
    #[default]
    Admin,
}

impl AdminRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminRole::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(AdminRole::Admin),
            _ => None,
        }
    }
}

/// Credential record for an organization's administrator.
///
/// One record per organization is intended but not enforced; directories
/// tolerate duplicates for the same organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminCredential {
    pub id: AdminId,
    /// Always stored normalized, see [`normalize_email`]
    pub email: String,
    pub password_hash: String,
    pub organization_id: OrganizationId,
    pub role: AdminRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AdminCredential {
    pub fn new(
        email: &str,
        password_hash: String,
        organization_id: OrganizationId,
        created_at: DateTime<Utc>,
    ) -> Self {
        let email = normalize_email(email);
        Self {
            id: AdminId::derive(&email, created_at),
            email,
            password_hash,
            organization_id,
            role: AdminRole::Admin,
            created_at,
            updated_at: created_at,
        }
    }
}

/// Partial update for a credential record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CredentialPatch {
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl CredentialPatch {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.password_hash.is_none()
    }

    pub fn apply(&self, credential: &mut AdminCredential) {
        if let Some(email) = &self.email {
            credential.email = email.clone();
        }
        if let Some(hash) = &self.password_hash {
            credential.password_hash = hash.clone();
        }
        if let Some(updated_at) = self.updated_at {
            credential.updated_at = updated_at;
        }
    }
}

/// Trim and lower-case an email address for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
