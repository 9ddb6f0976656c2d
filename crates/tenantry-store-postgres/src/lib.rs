//! PostgreSQL-backed storage for multi-node tenantry deployments
//!
//! # Features
//! - Organization and credential directories in the `public` schema
//! - One JSONB table per tenant region, isolated in the `tenant_regions` schema
//! - Slug uniqueness enforced by a `UNIQUE` constraint
//! - Automatic schema migrations
//!
//! # Example
//! ```no_run
//! # use tenantry_store_postgres::PostgresStore;
//! # async fn example() -> tenantry_core::Result<()> {
//! let store = PostgresStore::new("postgres://localhost/tenantry").await?;
//! # Ok(())
//! # }
//! ```

mod postgres_store;

pub use postgres_store::{PostgresStore, REGION_SCHEMA};
