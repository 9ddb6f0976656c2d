//! Directory traits for organization and admin credential records
//!
//! Both directories share the store's connection. The organization directory
//! owns the only integrity guarantee in the system: a storage-level unique
//! constraint on the slug.

use async_trait::async_trait;

use crate::{
    Result,
    credential::{AdminCredential, AdminId, CredentialPatch},
    organization::{NewOrganization, Organization, OrganizationId, OrganizationPatch},
};

/// Organization directory trait
///
/// Implementations must enforce slug uniqueness atomically in storage, so
/// that two concurrent inserts for the same slug cannot both succeed.
#[async_trait]
pub trait OrganizationDirectory: Send + Sync {
    /// Look up an organization by slug
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Organization>>;

    /// Look up an organization by ID
    async fn find_by_id(&self, id: OrganizationId) -> Result<Option<Organization>>;

    /// Insert a new organization and return its generated ID
    ///
    /// # Errors
    /// - `Error::UniqueViolation` if another record already holds the slug
    /// - `Error::Database` for storage errors
    async fn insert(&self, organization: NewOrganization) -> Result<OrganizationId>;

    /// Apply a partial update
    ///
    /// # Errors
    /// - `Error::NotFound` if no record has this ID
    /// - `Error::UniqueViolation` if the patch moves the record onto a taken slug
    async fn update_fields(&self, id: OrganizationId, patch: OrganizationPatch) -> Result<()>;

    /// Delete a record, returning whether one was removed
    async fn delete(&self, id: OrganizationId) -> Result<bool>;

    /// List every organization
    async fn list(&self) -> Result<Vec<Organization>>;
}

/// Credential directory trait
///
/// No uniqueness is enforced on (organization, email); lookups by
/// organization or email return an arbitrary first match.
#[async_trait]
pub trait CredentialDirectory: Send + Sync {
    /// Insert a credential record
    ///
    /// # Errors
    /// - `Error::UniqueViolation` if the record's ID is already taken
    async fn insert(&self, credential: AdminCredential) -> Result<()>;

    /// Look up a credential by ID
    async fn find_by_id(&self, id: &AdminId) -> Result<Option<AdminCredential>>;

    /// First credential linked to an organization
    async fn find_by_organization(&self, org_id: OrganizationId)
    -> Result<Option<AdminCredential>>;

    /// First credential with this (normalized) email
    async fn find_by_email(&self, email: &str) -> Result<Option<AdminCredential>>;

    /// Apply a partial update
    ///
    /// # Errors
    /// - `Error::NotFound` if no record has this ID
    async fn update_fields(&self, id: &AdminId, patch: CredentialPatch) -> Result<()>;

    /// Delete every credential linked to an organization, returning how many were removed
    async fn delete_all_for_organization(&self, org_id: OrganizationId) -> Result<u64>;
}
