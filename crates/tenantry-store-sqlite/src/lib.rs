//! SQLite-backed storage for single-node tenantry deployments
//!
//! One database file holds the organization directory, the admin credential
//! directory and every tenant region. Each region is its own table, so
//! creating and dropping a region is a single DDL statement.
//!
//! # Example
//! ```no_run
//! # use tenantry_store_sqlite::SqliteStore;
//! # use tenantry_core::RegionStore;
//! # async fn example() -> tenantry_core::Result<()> {
//! let store = SqliteStore::new("./data/tenantry.db").await?;
//! store.create_region("org_acme").await?;
//! # Ok(())
//! # }
//! ```

mod sqlite_store;

pub use sqlite_store::SqliteStore;
