//! Tenant Region Lifecycle Manager
//!
//! Orchestrates organization create, rename and delete across the
//! organization directory, the credential directory and the region store:
//!
//! - **Create** inserts the organization record (the slug's unique
//!   constraint decides races), creates the admin credential, links it,
//!   then provisions the region with its sentinel document.
//! - **Rename** copies the old region into a new one in bounded batches,
//!   repoints the directory, then drops the old region. A crash before the
//!   repoint leaves the old region authoritative; a crash after it leaves a
//!   stray region that [`LifecycleManager::orphaned_regions`] reports.
//! - **Delete** drops the region, then the credentials, then the record.
//!
//! No step takes an in-process lock; the storage layer's atomic operations
//! are the only coordination.

pub mod config;
pub mod manager;
pub mod migration;

pub use config::{BatchFailurePolicy, MigrationConfig};
pub use manager::{
    CreateOrganization, CreatedOrganization, DeletedOrganization, LifecycleManager,
    UpdateOrganization, UpdateOutcome,
};
pub use migration::{MigrationPlan, copy_region};
