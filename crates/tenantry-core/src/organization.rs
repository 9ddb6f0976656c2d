//! Organization records kept in the organization directory

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::credential::AdminId;
use crate::{Error, Result};

/// Identifier assigned to an organization by the directory on insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrganizationId(Uuid);

impl OrganizationId {
    /// Create a new random organization ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an organization ID from a UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Parse an organization ID from a string
    pub fn from_string(s: &str) -> Result<Self> {
        let uuid = Uuid::parse_str(s).map_err(|e| {
            Error::InvalidRequest(format!("Invalid organization ID format: {}", e))
        })?;
        Ok(Self(uuid))
    }
}

impl Default for OrganizationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrganizationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OrganizationId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_string(s)
    }
}

/// Organization metadata record.
///
/// The slug is unique across all organizations and names the organization's
/// storage region (`region_name == slug`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    /// Display name as supplied by the caller (trimmed)
    pub name: String,
    pub slug: String,
    pub region_name: String,
    /// Reference to the administrator's credential record, set once the admin exists
    pub admin_id: Option<AdminId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for [`OrganizationDirectory::insert`](crate::OrganizationDirectory::insert).
#[derive(Debug, Clone)]
pub struct NewOrganization {
    pub name: String,
    pub slug: String,
    pub region_name: String,
    pub created_at: DateTime<Utc>,
}

impl NewOrganization {
    /// Record for `name` whose region is named after `slug`.
    pub fn new(
        name: impl Into<String>,
        slug: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let slug = slug.into();
        Self {
            name: name.into(),
            region_name: slug.clone(),
            slug,
            created_at,
        }
    }

    /// Materialize the stored record once the directory has assigned an ID.
    pub fn into_organization(self, id: OrganizationId) -> Organization {
        Organization {
            id,
            name: self.name,
            slug: self.slug,
            region_name: self.region_name,
            admin_id: None,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// Partial update for an organization record. Unset fields are left untouched;
/// there is no concurrency token, the last writer wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrganizationPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_id: Option<AdminId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl OrganizationPatch {
    /// Patch that repoints an organization at a new name, slug and region.
    pub fn rename(name: impl Into<String>, slug: impl Into<String>, at: DateTime<Utc>) -> Self {
        let slug = slug.into();
        Self {
            name: Some(name.into()),
            region_name: Some(slug.clone()),
            slug: Some(slug),
            admin_id: None,
            updated_at: Some(at),
        }
    }

    /// Patch that links an organization to its admin record.
    pub fn admin(admin_id: AdminId) -> Self {
        Self {
            admin_id: Some(admin_id),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Apply the set fields onto `org`.
    pub fn apply(&self, org: &mut Organization) {
        if let Some(name) = &self.name {
            org.name = name.clone();
        }
        if let Some(slug) = &self.slug {
            org.slug = slug.clone();
        }
        if let Some(region_name) = &self.region_name {
            org.region_name = region_name.clone();
        }
        if let Some(admin_id) = &self.admin_id {
            org.admin_id = Some(admin_id.clone());
        }
        if let Some(updated_at) = self.updated_at {
            org.updated_at = updated_at;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_organization_id_roundtrip() {
        let uuid_str = "550e8400-e29b-41d4-a716-446655440000";
        let id = OrganizationId::from_string(uuid_str).unwrap();
        assert_eq!(id.to_string(), uuid_str);
        assert_eq!(uuid_str.parse::<OrganizationId>().unwrap(), id);
    }

    #[test]
    fn test_organization_id_invalid_string() {
        assert!(matches!(
            OrganizationId::from_string("not-a-uuid"),
            Err(Error::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_new_organization_region_follows_slug() {
        let now = Utc::now();
        let org = NewOrganization::new("Acme Inc", "org_acme-inc", now)
            .into_organization(OrganizationId::new());
        assert_eq!(org.region_name, "org_acme-inc");
        assert_eq!(org.created_at, org.updated_at);
        assert!(org.admin_id.is_none());
    }

    #[test]
    fn test_patch_apply_only_touches_set_fields() {
        let created = Utc::now();
        let mut org = NewOrganization::new("Acme", "org_acme", created)
            .into_organization(OrganizationId::new());

        OrganizationPatch::admin(AdminId::from("admin_a@acme.com_1")).apply(&mut org);
        assert_eq!(org.name, "Acme");
        assert_eq!(org.admin_id.as_ref().map(|a| a.as_str()), Some("admin_a@acme.com_1"));

        let later = created + chrono::Duration::seconds(5);
        OrganizationPatch::rename("Globex", "org_globex", later).apply(&mut org);
        assert_eq!(org.slug, "org_globex");
        assert_eq!(org.region_name, "org_globex");
        assert_eq!(org.updated_at, later);
        assert!(org.admin_id.is_some());
    }

    #[test]
    fn test_patch_serialization_skips_unset() {
        assert!(OrganizationPatch::default().is_empty());
        let json = serde_json::to_value(OrganizationPatch::admin(AdminId::from("x"))).unwrap();
        assert_eq!(json, serde_json::json!({"admin_id": "x"}));
    }
}
