//! LifecycleManager - organization create / get / update / delete

use chrono::Utc;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

use tenantry_core::{
    AdminCredential, AdminId, CredentialDirectory, CredentialHasher, CredentialPatch, Document,
    DocumentInsert, Error, MigrationReport, NewOrganization, Organization, OrganizationDirectory,
    OrganizationId, OrganizationPatch, RegionCreation, RegionRemoval, RegionStore, Result,
    credential::normalize_email,
    region::validate_region_name,
    slug,
};

use crate::config::MigrationConfig;
use crate::migration::{MigrationPlan, copy_region};

/// Input for [`LifecycleManager::create`]
#[derive(Debug, Clone)]
pub struct CreateOrganization {
    pub name: String,
    pub admin_email: String,
    pub admin_password: String,
}

/// Result of a successful create
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedOrganization {
    pub org_id: OrganizationId,
    pub organization_name: String,
    pub region_name: String,
    pub admin_id: AdminId,
}

/// Input for [`LifecycleManager::update`]
///
/// Empty optional strings are treated as absent.
#[derive(Debug, Clone, Default)]
pub struct UpdateOrganization {
    pub organization_name: String,
    pub new_organization_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Result of a successful update
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateOutcome {
    /// Organization fields that changed (empty if only credentials changed)
    pub updated: OrganizationPatch,
    /// Present when the rename moved documents to a new region
    #[serde(skip_serializing_if = "Option::is_none")]
    pub migration: Option<MigrationReport>,
    pub credentials_updated: bool,
}

/// Result of a successful delete
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletedOrganization {
    pub org_id: OrganizationId,
    pub slug: String,
    pub region_name: String,
    pub credentials_removed: u64,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Tenant region lifecycle manager
///
/// Holds the storage collaborators as trait objects; every backend
/// implements all three storage traits over one shared connection.
#[derive(Clone)]
pub struct LifecycleManager {
    regions: Arc<dyn RegionStore>,
    organizations: Arc<dyn OrganizationDirectory>,
    credentials: Arc<dyn CredentialDirectory>,
    hasher: Arc<dyn CredentialHasher>,
    migration: MigrationConfig,
}

impl LifecycleManager {
    pub fn new(
        regions: Arc<dyn RegionStore>,
        organizations: Arc<dyn OrganizationDirectory>,
        credentials: Arc<dyn CredentialDirectory>,
        hasher: Arc<dyn CredentialHasher>,
        migration: MigrationConfig,
    ) -> Self {
        Self {
            regions,
            organizations,
            credentials,
            hasher,
            migration,
        }
    }

    /// Build from a single backend implementing every storage trait
    pub fn from_store<S>(
        store: Arc<S>,
        hasher: Arc<dyn CredentialHasher>,
        migration: MigrationConfig,
    ) -> Self
    where
        S: RegionStore + OrganizationDirectory + CredentialDirectory + 'static,
    {
        Self::new(store.clone(), store.clone(), store, hasher, migration)
    }

    pub fn migration_config(&self) -> &MigrationConfig {
        &self.migration
    }

    /// Create an organization, its admin credential and its region.
    ///
    /// The slug's unique constraint is the only authority on conflicts: the
    /// pre-check merely short-circuits the obvious case. Steps after the
    /// organization insert are not transactional; a failure there leaves an
    /// organization record without admin or region, which is logged.
    ///
    /// Admin identifiers derive from the email and the creation second. One
    /// email creating two organizations within the same second collides on
    /// the admin insert: the second create fails with the directory's
    /// `UniqueViolation` and its organization record keeps the slug with no
    /// admin and no region until removed by hand.
    ///
    /// # Errors
    /// - `Error::InvalidRequest` if the name is blank or derives an unusable slug
    /// - `Error::OrganizationExists` if the slug is taken
    /// - `Error::UniqueViolation` if the derived admin identifier is taken
    pub async fn create(&self, request: CreateOrganization) -> Result<CreatedOrganization> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(Error::InvalidRequest(
                "organization_name must not be empty".to_string(),
            ));
        }

        let slug = slug::derive(name);
        validate_region_name(&slug)
            .map_err(|_| Error::InvalidRequest(format!("organization name too long: {}", name)))?;

        if self.organizations.find_by_slug(&slug).await?.is_some() {
            return Err(Error::OrganizationExists(slug));
        }

        let password_hash = self.hasher.hash(&request.admin_password)?;
        let now = Utc::now();

        let org_id = match self
            .organizations
            .insert(NewOrganization::new(name, slug.clone(), now))
            .await
        {
            Ok(id) => id,
            Err(Error::UniqueViolation(_)) => {
                tracing::info!(slug = %slug, "Slug claimed by a concurrent create");
                return Err(Error::OrganizationExists(slug));
            }
            Err(e) => return Err(e),
        };

        let admin = AdminCredential::new(&request.admin_email, password_hash, org_id, now);
        let admin_id = admin.id.clone();

        if let Err(e) = self.credentials.insert(admin).await {
            tracing::error!(
                org_id = %org_id,
                slug = %slug,
                error = %e,
                "Admin creation failed; organization record left without admin"
            );
            return Err(e);
        }

        self.organizations
            .update_fields(org_id, OrganizationPatch::admin(admin_id.clone()))
            .await
            .inspect_err(|e| {
                tracing::error!(
                    org_id = %org_id,
                    error = %e,
                    "Failed to link admin to organization"
                );
            })?;

        self.provision_region(&slug, now).await;

        tracing::info!(
            org_id = %org_id,
            slug = %slug,
            admin_id = %admin_id,
            "Organization created"
        );

        Ok(CreatedOrganization {
            org_id,
            organization_name: name.to_string(),
            region_name: slug,
            admin_id,
        })
    }

    /// Best-effort region creation plus sentinel; failures are logged only.
    async fn provision_region(&self, region: &str, now: chrono::DateTime<Utc>) {
        match self.regions.create_region(region).await {
            Ok(RegionCreation::Created) => {}
            Ok(RegionCreation::AlreadyExisted) => {
                tracing::warn!(region = %region, "Region already existed, reusing it");
            }
            Err(e) => {
                tracing::warn!(region = %region, error = %e, "Region creation failed");
                return;
            }
        }

        match self.regions.insert_one(region, Document::sentinel(now)).await {
            Ok(DocumentInsert::Inserted) => {}
            Ok(DocumentInsert::Duplicate) => {
                tracing::debug!(region = %region, "Sentinel document already present");
            }
            Err(e) => {
                tracing::warn!(region = %region, error = %e, "Sentinel insert failed");
            }
        }
    }

    /// Fetch an organization by (any spelling of) its name.
    ///
    /// # Errors
    /// - `Error::NotFound` if no organization holds the derived slug
    pub async fn get(&self, name: &str) -> Result<Organization> {
        let slug = slug::derive(name);
        self.organizations
            .find_by_slug(&slug)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Organization not found: {}", name.trim())))
    }

    /// Rename an organization and/or update its admin credentials.
    ///
    /// A rename to a different slug runs the batched migration. A rename
    /// that derives the same slug only updates the display name.
    ///
    /// # Errors
    /// - `Error::NotFound` if the organization does not exist
    /// - `Error::OrganizationExists` if the new slug is taken
    /// - `Error::MigrationAborted` under the fail-fast policy
    /// - `Error::InvariantViolation` if credentials were requested but no admin record exists
    pub async fn update(&self, request: UpdateOrganization) -> Result<UpdateOutcome> {
        let mut org = self.get(&request.organization_name).await?;
        let mut outcome = UpdateOutcome::default();

        if let Some(new_name) = non_empty(&request.new_organization_name) {
            let (patch, report) = self.rename(&org, new_name).await?;
            outcome.updated = patch;
            outcome.migration = report;

            org = self
                .organizations
                .find_by_id(org.id)
                .await?
                .ok_or_else(|| Error::NotFound(format!("Organization not found: {}", org.id)))?;
        }

        let email = non_empty(&request.email);
        let password = request.password.as_deref().filter(|p| !p.is_empty());
        if email.is_some() || password.is_some() {
            self.update_credentials(&org, email, password).await?;
            outcome.credentials_updated = true;
        }

        Ok(outcome)
    }

    async fn rename(
        &self,
        org: &Organization,
        new_name: &str,
    ) -> Result<(OrganizationPatch, Option<MigrationReport>)> {
        let now = Utc::now();
        let new_slug = slug::derive(new_name);

        if new_slug == org.slug {
            if new_name == org.name {
                return Ok((OrganizationPatch::default(), None));
            }
            let patch = OrganizationPatch {
                name: Some(new_name.to_string()),
                updated_at: Some(now),
                ..Default::default()
            };
            self.organizations.update_fields(org.id, patch.clone()).await?;
            tracing::info!(org_id = %org.id, slug = %org.slug, "Display name updated");
            return Ok((patch, None));
        }

        validate_region_name(&new_slug).map_err(|_| {
            Error::InvalidRequest(format!("organization name too long: {}", new_name))
        })?;

        if self.organizations.find_by_slug(&new_slug).await?.is_some() {
            return Err(Error::OrganizationExists(new_slug));
        }

        let creation = self.regions.create_region(&new_slug).await?;
        if creation == RegionCreation::AlreadyExisted {
            tracing::warn!(region = %new_slug, "Destination region already existed");
        }

        let plan = MigrationPlan::new(
            org.region_name.clone(),
            new_slug.clone(),
            self.migration.batch_size,
            self.migration.failure_policy,
        );
        tracing::info!(
            org_id = %org.id,
            source = %plan.source,
            destination = %plan.destination,
            batch_size = plan.batch_size,
            policy = plan.policy.as_str(),
            "Starting region migration"
        );

        let report = match copy_region(&*self.regions, &plan).await {
            Ok(report) => report,
            Err(e) => {
                if creation == RegionCreation::Created {
                    self.discard_region(&new_slug).await;
                }
                return Err(e);
            }
        };

        if report.is_complete() {
            tracing::info!(org_id = %org.id, %report, "Region migration finished");
        } else {
            tracing::warn!(org_id = %org.id, %report, "Region migration lost documents");
        }

        // Repoint: from here on readers see the new region.
        let patch = OrganizationPatch::rename(new_name, new_slug.clone(), now);
        match self.organizations.update_fields(org.id, patch.clone()).await {
            Ok(()) => {}
            Err(Error::UniqueViolation(_)) => {
                // The destination may now belong to the winner; leave it.
                tracing::warn!(slug = %new_slug, "Slug claimed by a concurrent rename");
                return Err(Error::OrganizationExists(new_slug));
            }
            Err(e) => return Err(e),
        }

        match self.regions.drop_region(&org.region_name).await {
            Ok(RegionRemoval::Dropped) => {}
            Ok(RegionRemoval::AlreadyAbsent) => {
                tracing::debug!(region = %org.region_name, "Source region already absent");
            }
            Err(e) => {
                tracing::warn!(
                    region = %org.region_name,
                    error = %e,
                    "Failed to drop source region; it is now orphaned"
                );
            }
        }

        tracing::info!(
            org_id = %org.id,
            from = %org.slug,
            to = %new_slug,
            "Organization renamed"
        );
        Ok((patch, Some(report)))
    }

    async fn discard_region(&self, region: &str) {
        if let Err(e) = self.regions.drop_region(region).await {
            tracing::warn!(
                region = %region,
                error = %e,
                "Failed to drop aborted destination region"
            );
        }
    }

    async fn update_credentials(
        &self,
        org: &Organization,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<()> {
        let admin = self
            .credentials
            .find_by_organization(org.id)
            .await?
            .ok_or_else(|| {
                Error::InvariantViolation(format!(
                    "Admin record missing for organization {}",
                    org.id
                ))
            })?;

        let patch = CredentialPatch {
            email: email.map(normalize_email),
            password_hash: password.map(|p| self.hasher.hash(p)).transpose()?,
            updated_at: Some(Utc::now()),
        };
        self.credentials.update_fields(&admin.id, patch).await?;

        tracing::info!(org_id = %org.id, admin_id = %admin.id, "Admin credentials updated");
        Ok(())
    }

    /// Delete an organization on behalf of a caller verified to belong to it.
    ///
    /// Order is region, credentials, record, so a crash leaves at worst a
    /// record pointing at nothing.
    ///
    /// # Errors
    /// - `Error::NotFound` if the organization does not exist
    /// - `Error::Forbidden` if `caller_org` is not the organization's ID; nothing is mutated
    pub async fn delete(
        &self,
        name: &str,
        caller_org: OrganizationId,
    ) -> Result<DeletedOrganization> {
        let org = self.get(name).await?;

        if org.id != caller_org {
            tracing::warn!(org_id = %org.id, caller_org = %caller_org, "Delete refused");
            return Err(Error::Forbidden(
                "Not authorized to delete this organization".to_string(),
            ));
        }

        if self.regions.drop_region(&org.region_name).await? == RegionRemoval::AlreadyAbsent {
            tracing::debug!(region = %org.region_name, "Region already absent");
        }

        let credentials_removed = self.credentials.delete_all_for_organization(org.id).await?;

        if !self.organizations.delete(org.id).await? {
            tracing::debug!(org_id = %org.id, "Organization record already gone");
        }

        tracing::info!(
            org_id = %org.id,
            slug = %org.slug,
            credentials_removed,
            "Organization deleted"
        );

        Ok(DeletedOrganization {
            org_id: org.id,
            slug: org.slug,
            region_name: org.region_name,
            credentials_removed,
        })
    }

    /// Tenant regions no organization record points at.
    ///
    /// A rename in flight has a destination region not yet referenced, so
    /// results are only meaningful while no renames are running.
    pub async fn orphaned_regions(&self) -> Result<Vec<String>> {
        let referenced: HashSet<String> = self
            .organizations
            .list()
            .await?
            .into_iter()
            .map(|org| org.region_name)
            .collect();

        Ok(self
            .regions
            .list_regions()
            .await?
            .into_iter()
            .filter(|region| slug::is_tenant_slug(region) && !referenced.contains(region))
            .collect())
    }

    /// Drop every orphaned region, returning the names dropped.
    pub async fn drop_orphaned_regions(&self) -> Result<Vec<String>> {
        let mut dropped = Vec::new();
        for region in self.orphaned_regions().await? {
            if self.regions.drop_region(&region).await? == RegionRemoval::Dropped {
                tracing::info!(region = %region, "Dropped orphaned region");
                dropped.push(region);
            }
        }
        Ok(dropped)
    }

    /// Readiness probe for the backing store
    pub async fn ping(&self) -> Result<()> {
        self.regions.ping().await
    }
}
