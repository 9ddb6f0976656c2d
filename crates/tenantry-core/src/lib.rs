//! Tenantry Core Types and Traits
//!
//! This crate provides the fundamental types and traits used throughout Tenantry:
//! - Organization and admin credential records
//! - Slug derivation for organization names
//! - Storage traits (`RegionStore`, `OrganizationDirectory`, `CredentialDirectory`)
//! - Credential hashing and token collaborator traits
//! - Core error types
//! - An in-memory storage backend

pub mod credential;
pub mod directory;
pub mod error;
pub mod memory;
pub mod organization;
pub mod region;
pub mod security;
pub mod slug;

pub use credential::{AdminCredential, AdminId, AdminRole, CredentialPatch};
pub use directory::{CredentialDirectory, OrganizationDirectory};
pub use error::{Error, Result};
pub use memory::MemoryStore;
pub use organization::{NewOrganization, Organization, OrganizationId, OrganizationPatch};
pub use region::{
    BulkInsertOutcome, Document, DocumentInsert, DocumentStream, MigrationReport, RegionCreation,
    RegionRemoval, RegionStore,
};
pub use security::{CredentialHasher, TokenClaims, TokenService};
