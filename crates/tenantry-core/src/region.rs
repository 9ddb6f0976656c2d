//! Region store trait and tenant region documents
//!
//! A region is an independently addressable storage area holding one
//! organization's documents. The `RegionStore` trait abstracts over the
//! backing document store so that the lifecycle manager can create, fill,
//! scan and drop regions without knowing how they are laid out.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

/// Identifier of the sentinel document written into every new region.
pub const SENTINEL_DOCUMENT_ID: &str = "_meta";

/// Schema version recorded in the sentinel document.
pub const REGION_SCHEMA_VERSION: u32 = 1;

/// Longest region name accepted by [`validate_region_name`].
pub const MAX_REGION_NAME_LEN: usize = 63;

/// Type alias for region scans
pub type DocumentStream<'a> = BoxStream<'a, Result<Document>>;

/// A tenant-owned document. Regions store the body verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub body: serde_json::Value,
}

impl Document {
    pub fn new(id: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            body,
        }
    }

    /// The region metadata marker written when a region is provisioned.
    pub fn sentinel(created_at: DateTime<Utc>) -> Self {
        Self::new(
            SENTINEL_DOCUMENT_ID,
            serde_json::json!({
                "_meta": true,
                "created_at": created_at.to_rfc3339(),
                "schema_version": REGION_SCHEMA_VERSION,
            }),
        )
    }

    pub fn is_sentinel(&self) -> bool {
        self.id == SENTINEL_DOCUMENT_ID
    }
}

/// Outcome of [`RegionStore::create_region`]. An existing region is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionCreation {
    Created,
    AlreadyExisted,
}

/// Outcome of [`RegionStore::drop_region`]. A missing region is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionRemoval {
    Dropped,
    AlreadyAbsent,
}

/// Outcome of [`RegionStore::insert_one`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentInsert {
    Inserted,
    /// A document with the same identifier is already present
    Duplicate,
}

/// Per-document tally of an unordered bulk insert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkInsertOutcome {
    pub inserted: u64,
    pub failed: u64,
}

impl BulkInsertOutcome {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Counts gathered while copying one region into another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationReport {
    pub source: String,
    pub destination: String,
    /// Documents read from the source region
    pub scanned: u64,
    /// Documents the destination accepted
    pub written: u64,
    /// Documents the destination rejected
    pub failed: u64,
    /// Bulk insert calls issued
    pub batches: u64,
}

impl MigrationReport {
    pub fn new(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            scanned: 0,
            written: 0,
            failed: 0,
            batches: 0,
        }
    }

    pub fn record_batch(&mut self, outcome: BulkInsertOutcome) {
        self.batches += 1;
        self.written += outcome.inserted;
        self.failed += outcome.failed;
    }

    /// Every scanned document made it into the destination.
    pub fn is_complete(&self) -> bool {
        self.written == self.scanned
    }
}

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {}: scanned={} written={} failed={} batches={}",
            self.source, self.destination, self.scanned, self.written, self.failed, self.batches
        )
    }
}

/// Check that a region name is safe to hand to a backend.
///
/// Accepts 1 to [`MAX_REGION_NAME_LEN`] characters from `[a-z0-9_-]`.
/// Backends interpolate region names into DDL, so every entry point that
/// takes a region name calls this first.
pub fn validate_region_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > MAX_REGION_NAME_LEN {
        return Err(Error::InvalidRegionName(format!(
            "Region name must be 1-{} characters: {:?}",
            MAX_REGION_NAME_LEN, name
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
    {
        return Err(Error::InvalidRegionName(format!(
            "Region name may only contain [a-z0-9_-]: {:?}",
            name
        )));
    }
    Ok(())
}

/// Region store trait
///
/// Implementations:
/// - `MemoryStore`: process-local maps (tests and ephemeral deployments)
/// - `SqliteStore`: one SQLite table per region
/// - `PostgresStore`: one JSONB table per region
///
/// # Example
/// ```no_run
/// # use tenantry_core::region::{Document, RegionStore};
/// # use futures::StreamExt;
/// # async fn example(store: &dyn RegionStore) -> tenantry_core::Result<()> {
/// store.create_region("org_acme").await?;
/// store
///     .bulk_insert("org_acme", vec![Document::new("1", serde_json::json!({"n": 1}))])
///     .await?;
///
/// let mut docs = store.scan_all("org_acme");
/// while let Some(doc) = docs.next().await {
///     println!("{}", doc?.id);
/// }
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait RegionStore: Send + Sync {
    /// Create a region
    ///
    /// Idempotent: an existing region yields `RegionCreation::AlreadyExisted`.
    ///
    /// # Errors
    /// - `Error::InvalidRegionName` if the name fails validation
    /// - `Error::Database` for storage errors
    async fn create_region(&self, name: &str) -> Result<RegionCreation>;

    /// Drop a region and everything in it
    ///
    /// Idempotent: a missing region yields `RegionRemoval::AlreadyAbsent`.
    async fn drop_region(&self, name: &str) -> Result<RegionRemoval>;

    /// Check whether a region exists
    async fn region_exists(&self, name: &str) -> Result<bool>;

    /// List all regions
    async fn list_regions(&self) -> Result<Vec<String>>;

    /// Insert a single document
    async fn insert_one(&self, name: &str, document: Document) -> Result<DocumentInsert>;

    /// Unordered bulk insert
    ///
    /// Documents that cannot be written (duplicate identifier, missing
    /// region) are counted in `BulkInsertOutcome::failed`; the remaining
    /// documents are still written and the call still succeeds.
    ///
    /// # Errors
    /// - `Error::InvalidRegionName` if the name fails validation
    async fn bulk_insert(&self, name: &str, documents: Vec<Document>) -> Result<BulkInsertOutcome>;

    /// Full scan of a region in the store's natural order
    ///
    /// The stream is lazy; documents written behind the scan position are
    /// not returned. There is no checkpointing: restarting means calling
    /// again. Scanning a missing region yields an empty stream.
    fn scan_all<'a>(&'a self, name: &'a str) -> DocumentStream<'a>;

    /// Number of documents in a region (0 if it does not exist)
    async fn count(&self, name: &str) -> Result<u64>;

    /// Check connectivity to the backing store
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
