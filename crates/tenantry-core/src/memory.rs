//! In-memory storage backend
//!
//! Implements every storage trait over process-local maps. Slug uniqueness
//! is enforced atomically through a slug index claimed with `DashMap::entry`,
//! which gives the same guarantee as a unique index in a database. Used for
//! tests and for ephemeral deployments; nothing survives a restart.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;

use crate::{
    Error, Result,
    credential::{AdminCredential, AdminId, CredentialPatch},
    directory::{CredentialDirectory, OrganizationDirectory},
    organization::{NewOrganization, Organization, OrganizationId, OrganizationPatch},
    region::{
        BulkInsertOutcome, Document, DocumentInsert, DocumentStream, RegionCreation,
        RegionRemoval, RegionStore, validate_region_name,
    },
};

#[derive(Debug, Default)]
struct MemoryRegion {
    /// Insertion order, the region's natural scan order
    order: Vec<String>,
    documents: HashMap<String, Document>,
}

impl MemoryRegion {
    fn insert(&mut self, document: Document) -> DocumentInsert {
        if self.documents.contains_key(&document.id) {
            return DocumentInsert::Duplicate;
        }
        self.order.push(document.id.clone());
        self.documents.insert(document.id.clone(), document);
        DocumentInsert::Inserted
    }

    fn snapshot(&self) -> Vec<Document> {
        self.order
            .iter()
            .filter_map(|id| self.documents.get(id).cloned())
            .collect()
    }
}

/// Process-local store implementing `RegionStore`, `OrganizationDirectory`
/// and `CredentialDirectory`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    regions: DashMap<String, MemoryRegion>,
    organizations: DashMap<OrganizationId, Organization>,
    /// Unique index: slug -> owning organization
    slugs: DashMap<String, OrganizationId>,
    credentials: DashMap<AdminId, AdminCredential>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RegionStore for MemoryStore {
    async fn create_region(&self, name: &str) -> Result<RegionCreation> {
        validate_region_name(name)?;
        match self.regions.entry(name.to_string()) {
            Entry::Occupied(_) => Ok(RegionCreation::AlreadyExisted),
            Entry::Vacant(slot) => {
                slot.insert(MemoryRegion::default());
                Ok(RegionCreation::Created)
            }
        }
    }

    async fn drop_region(&self, name: &str) -> Result<RegionRemoval> {
        validate_region_name(name)?;
        Ok(match self.regions.remove(name) {
            Some(_) => RegionRemoval::Dropped,
            None => RegionRemoval::AlreadyAbsent,
        })
    }

    async fn region_exists(&self, name: &str) -> Result<bool> {
        validate_region_name(name)?;
        Ok(self.regions.contains_key(name))
    }

    async fn list_regions(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.regions.iter().map(|r| r.key().clone()).collect();
        names.sort();
        Ok(names)
    }

    async fn insert_one(&self, name: &str, document: Document) -> Result<DocumentInsert> {
        validate_region_name(name)?;
        let mut region = self
            .regions
            .get_mut(name)
            .ok_or_else(|| Error::NotFound(format!("Region not found: {}", name)))?;
        Ok(region.insert(document))
    }

    async fn bulk_insert(&self, name: &str, documents: Vec<Document>) -> Result<BulkInsertOutcome> {
        validate_region_name(name)?;
        let mut outcome = BulkInsertOutcome::default();

        let Some(mut region) = self.regions.get_mut(name) else {
            outcome.failed = documents.len() as u64;
            return Ok(outcome);
        };

        for document in documents {
            match region.insert(document) {
                DocumentInsert::Inserted => outcome.inserted += 1,
                DocumentInsert::Duplicate => outcome.failed += 1,
            }
        }
        Ok(outcome)
    }

    fn scan_all<'a>(&'a self, name: &'a str) -> DocumentStream<'a> {
        if let Err(e) = validate_region_name(name) {
            return stream::once(async move { Err(e) }).boxed();
        }

        // Snapshot at scan start: later writes are not observed.
        let documents = self
            .regions
            .get(name)
            .map(|region| region.snapshot())
            .unwrap_or_default();

        stream::iter(documents.into_iter().map(Ok)).boxed()
    }

    async fn count(&self, name: &str) -> Result<u64> {
        validate_region_name(name)?;
        Ok(self
            .regions
            .get(name)
            .map(|region| region.documents.len() as u64)
            .unwrap_or(0))
    }
}

#[async_trait]
impl OrganizationDirectory for MemoryStore {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Organization>> {
        let id = self.slugs.get(slug).map(|entry| *entry.value());
        Ok(id.and_then(|id| self.organizations.get(&id).map(|org| org.value().clone())))
    }

    async fn find_by_id(&self, id: OrganizationId) -> Result<Option<Organization>> {
        Ok(self.organizations.get(&id).map(|org| org.value().clone()))
    }

    async fn insert(&self, organization: NewOrganization) -> Result<OrganizationId> {
        let id = OrganizationId::new();
        match self.slugs.entry(organization.slug.clone()) {
            Entry::Occupied(_) => Err(Error::UniqueViolation(format!(
                "slug already taken: {}",
                organization.slug
            ))),
            Entry::Vacant(slot) => {
                self.organizations
                    .insert(id, organization.into_organization(id));
                slot.insert(id);
                Ok(id)
            }
        }
    }

    async fn update_fields(&self, id: OrganizationId, patch: OrganizationPatch) -> Result<()> {
        let current_slug = self
            .organizations
            .get(&id)
            .map(|org| org.slug.clone())
            .ok_or_else(|| Error::NotFound(format!("Organization not found: {}", id)))?;

        let moved_slug = patch
            .slug
            .as_ref()
            .filter(|new_slug| **new_slug != current_slug);

        if let Some(new_slug) = moved_slug {
            match self.slugs.entry(new_slug.clone()) {
                Entry::Occupied(owner) if *owner.get() != id => {
                    return Err(Error::UniqueViolation(format!(
                        "slug already taken: {}",
                        new_slug
                    )));
                }
                Entry::Occupied(_) => {}
                Entry::Vacant(slot) => {
                    slot.insert(id);
                }
            }
        }

        match self.organizations.get_mut(&id) {
            Some(mut org) => patch.apply(org.value_mut()),
            None => {
                if let Some(new_slug) = moved_slug {
                    self.slugs.remove_if(new_slug, |_, owner| *owner == id);
                }
                return Err(Error::NotFound(format!("Organization not found: {}", id)));
            }
        }

        if moved_slug.is_some() {
            self.slugs.remove_if(&current_slug, |_, owner| *owner == id);
        }
        Ok(())
    }

    async fn delete(&self, id: OrganizationId) -> Result<bool> {
        match self.organizations.remove(&id) {
            Some((_, org)) => {
                self.slugs.remove_if(&org.slug, |_, owner| *owner == id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list(&self) -> Result<Vec<Organization>> {
        let mut orgs: Vec<Organization> = self
            .organizations
            .iter()
            .map(|org| org.value().clone())
            .collect();
        orgs.sort_by_key(|org| org.created_at);
        Ok(orgs)
    }
}

#[async_trait]
impl CredentialDirectory for MemoryStore {
    async fn insert(&self, credential: AdminCredential) -> Result<()> {
        match self.credentials.entry(credential.id.clone()) {
            Entry::Occupied(_) => Err(Error::UniqueViolation(format!(
                "admin id already taken: {}",
                credential.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(credential);
                Ok(())
            }
        }
    }

    async fn find_by_id(&self, id: &AdminId) -> Result<Option<AdminCredential>> {
        Ok(self.credentials.get(id).map(|c| c.value().clone()))
    }

    async fn find_by_organization(
        &self,
        org_id: OrganizationId,
    ) -> Result<Option<AdminCredential>> {
        Ok(self
            .credentials
            .iter()
            .find(|c| c.organization_id == org_id)
            .map(|c| c.value().clone()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<AdminCredential>> {
        Ok(self
            .credentials
            .iter()
            .find(|c| c.email == email)
            .map(|c| c.value().clone()))
    }

    async fn update_fields(&self, id: &AdminId, patch: CredentialPatch) -> Result<()> {
        let mut credential = self
            .credentials
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("Admin not found: {}", id)))?;
        patch.apply(credential.value_mut());
        Ok(())
    }

    async fn delete_all_for_organization(&self, org_id: OrganizationId) -> Result<u64> {
        let mut removed = 0;
        self.credentials.retain(|_, c| {
            if c.organization_id == org_id {
                removed += 1;
                false
            } else {
                true
            }
        });
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use futures::TryStreamExt;
    use std::sync::Arc;

    fn doc(id: &str) -> Document {
        Document::new(id, serde_json::json!({"id": id}))
    }

    #[tokio::test]
    async fn test_region_create_is_idempotent() {
        let store = MemoryStore::new();
        assert_eq!(
            store.create_region("org_a").await.unwrap(),
            RegionCreation::Created
        );
        assert_eq!(
            store.create_region("org_a").await.unwrap(),
            RegionCreation::AlreadyExisted
        );
    }

    #[tokio::test]
    async fn test_region_drop_is_idempotent() {
        let store = MemoryStore::new();
        store.create_region("org_a").await.unwrap();
        assert_eq!(
            store.drop_region("org_a").await.unwrap(),
            RegionRemoval::Dropped
        );
        assert_eq!(
            store.drop_region("org_a").await.unwrap(),
            RegionRemoval::AlreadyAbsent
        );
        assert!(!store.region_exists("org_a").await.unwrap());
    }

    #[tokio::test]
    async fn test_bulk_insert_tolerates_duplicates() {
        let store = MemoryStore::new();
        store.create_region("org_a").await.unwrap();
        store.bulk_insert("org_a", vec![doc("1")]).await.unwrap();

        let outcome = store
            .bulk_insert("org_a", vec![doc("1"), doc("2"), doc("3")])
            .await
            .unwrap();
        assert_eq!(outcome.inserted, 2);
        assert_eq!(outcome.failed, 1);
        assert_eq!(store.count("org_a").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_bulk_insert_into_missing_region_counts_failures() {
        let store = MemoryStore::new();
        let outcome = store
            .bulk_insert("org_missing", vec![doc("1"), doc("2")])
            .await
            .unwrap();
        assert_eq!(outcome.failed, 2);
    }

    #[tokio::test]
    async fn test_scan_preserves_insertion_order() {
        let store = MemoryStore::new();
        store.create_region("org_a").await.unwrap();
        store
            .bulk_insert("org_a", vec![doc("b"), doc("a"), doc("c")])
            .await
            .unwrap();

        let ids: Vec<String> = store
            .scan_all("org_a")
            .map_ok(|d| d.id)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[tokio::test]
    async fn test_scan_invalid_region_yields_error() {
        let store = MemoryStore::new();
        let result: Result<Vec<Document>> = store.scan_all("Bad Name").try_collect().await;
        assert!(matches!(result, Err(Error::InvalidRegionName(_))));
    }

    #[tokio::test]
    async fn test_slug_uniqueness() {
        let store = MemoryStore::new();
        let now = Utc::now();
        OrganizationDirectory::insert(&store, NewOrganization::new("Acme", "org_acme", now))
            .await
            .unwrap();
        let second =
            OrganizationDirectory::insert(&store, NewOrganization::new("ACME", "org_acme", now))
                .await;
        assert!(matches!(second, Err(Error::UniqueViolation(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_inserts_admit_one() {
        let store = Arc::new(MemoryStore::new());
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                OrganizationDirectory::insert(
                    &*store,
                    NewOrganization::new(format!("Acme {i}"), "org_acme", Utc::now()),
                )
                .await
            }));
        }

        let mut ok = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                ok += 1;
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(OrganizationDirectory::list(&*store).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_moves_slug_index() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let id = OrganizationDirectory::insert(&store, NewOrganization::new("A", "org_a", now))
            .await
            .unwrap();
        OrganizationDirectory::insert(&store, NewOrganization::new("B", "org_b", now))
            .await
            .unwrap();

        let clash = OrganizationDirectory::update_fields(
            &store,
            id,
            OrganizationPatch::rename("B", "org_b", now),
        )
        .await;
        assert!(matches!(clash, Err(Error::UniqueViolation(_))));

        OrganizationDirectory::update_fields(
            &store,
            id,
            OrganizationPatch::rename("C", "org_c", now),
        )
        .await
        .unwrap();
        assert!(store.find_by_slug("org_a").await.unwrap().is_none());
        assert_eq!(store.find_by_slug("org_c").await.unwrap().unwrap().id, id);
    }

    #[tokio::test]
    async fn test_update_missing_organization() {
        let store = MemoryStore::new();
        let result = OrganizationDirectory::update_fields(
            &store,
            OrganizationId::new(),
            OrganizationPatch::default(),
        )
        .await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_frees_slug() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let id = OrganizationDirectory::insert(&store, NewOrganization::new("A", "org_a", now))
            .await
            .unwrap();
        assert!(OrganizationDirectory::delete(&store, id).await.unwrap());
        assert!(!OrganizationDirectory::delete(&store, id).await.unwrap());
        OrganizationDirectory::insert(&store, NewOrganization::new("A", "org_a", now))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_credentials_tolerate_duplicates_per_org() {
        let store = MemoryStore::new();
        let org = OrganizationId::new();
        let now = Utc::now();
        let first = AdminCredential::new("a@acme.com", "h1".into(), org, now);
        let mut second = AdminCredential::new("a@acme.com", "h2".into(), org, now);
        second.id = AdminId::from("admin_other");

        CredentialDirectory::insert(&store, first.clone()).await.unwrap();
        CredentialDirectory::insert(&store, second).await.unwrap();
        assert!(matches!(
            CredentialDirectory::insert(&store, first).await,
            Err(Error::UniqueViolation(_))
        ));

        assert!(store.find_by_organization(org).await.unwrap().is_some());
        assert_eq!(store.delete_all_for_organization(org).await.unwrap(), 2);
        assert!(store.find_by_email("a@acme.com").await.unwrap().is_none());
    }
}
