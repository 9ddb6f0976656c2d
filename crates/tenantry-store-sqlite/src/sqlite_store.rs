//! SqliteStore - storage trait implementations over a single SQLite database

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use sqlx::{QueryBuilder, Row, Sqlite};
use std::path::Path;
use std::str::FromStr;

use tenantry_core::{
    Error, Result,
    credential::{AdminCredential, AdminId, AdminRole, CredentialPatch},
    directory::{CredentialDirectory, OrganizationDirectory},
    organization::{NewOrganization, Organization, OrganizationId, OrganizationPatch},
    region::{
        BulkInsertOutcome, Document, DocumentInsert, DocumentStream, RegionCreation,
        RegionRemoval, RegionStore, validate_region_name,
    },
};

/// Prefix separating region tables from directory tables
const REGION_TABLE_PREFIX: &str = "region__";

/// Rows fetched per round trip while scanning a region
const SCAN_PAGE_SIZE: i64 = 256;

/// Rows per multi-row INSERT; keeps bound parameters well under SQLite's limit
const INSERT_CHUNK_SIZE: usize = 500;

/// SQLite-backed store implementing `RegionStore`, `OrganizationDirectory`
/// and `CredentialDirectory`
///
/// The directories and the regions share one connection pool. Slug
/// uniqueness is a `UNIQUE` constraint on `organizations.slug`.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) a database file and run schema migrations
    ///
    /// # Errors
    /// - `Error::Database` if the file cannot be opened or migrations fail
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::Database(format!("Failed to create database directory: {}", e))
            })?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(db_path)
                    .create_if_missing(true)
                    .journal_mode(SqliteJournalMode::Wal)
                    .synchronous(SqliteSynchronous::Normal),
            )
            .await
            .map_err(|e| Error::Database(format!("Failed to open SQLite database: {}", e)))?;

        let store = Self { pool };
        store.run_migrations().await?;

        tracing::debug!(path = %db_path.display(), "Opened SQLite store");
        Ok(store)
    }

    /// Private in-memory database (useful for testing)
    ///
    /// The pool is pinned to a single connection that is never recycled,
    /// since every SQLite in-memory connection is a separate database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| Error::Database(format!("Invalid SQLite options: {}", e)))?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| Error::Database(format!("Failed to open SQLite database: {}", e)))?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Create from an existing pool. Migrations are not run.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Run directory schema migrations
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS organizations (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                slug TEXT NOT NULL UNIQUE,
                region_name TEXT NOT NULL,
                admin_id TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to create organizations table: {}", e)))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS admin_credentials (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL,
                password_hash TEXT NOT NULL,
                organization_id TEXT NOT NULL,
                role TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(format!("Failed to create admin_credentials table: {}", e))
        })?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_admin_credentials_org ON admin_credentials(organization_id)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to create index: {}", e)))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_admin_credentials_email ON admin_credentials(email)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to create index: {}", e)))?;

        Ok(())
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close every pooled connection
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Quoted table identifier for a region. The name must already be validated.
fn region_table(name: &str) -> String {
    format!("\"{}{}\"", REGION_TABLE_PREFIX, name)
}

fn is_missing_table(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.message().contains("no such table"))
}

fn is_existing_table(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.message().contains("already exists"))
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

fn organization_from_row(row: &SqliteRow) -> Result<Organization> {
    let get = |e: sqlx::Error| Error::Database(format!("Failed to decode organization: {}", e));

    let id: String = row.try_get("id").map_err(get)?;
    let admin_id: Option<String> = row.try_get("admin_id").map_err(get)?;

    Ok(Organization {
        id: OrganizationId::from_string(&id)?,
        name: row.try_get("name").map_err(get)?,
        slug: row.try_get("slug").map_err(get)?,
        region_name: row.try_get("region_name").map_err(get)?,
        admin_id: admin_id.map(AdminId::from),
        created_at: row.try_get("created_at").map_err(get)?,
        updated_at: row.try_get("updated_at").map_err(get)?,
    })
}

fn credential_from_row(row: &SqliteRow) -> Result<AdminCredential> {
    let get = |e: sqlx::Error| Error::Database(format!("Failed to decode credential: {}", e));

    let id: String = row.try_get("id").map_err(get)?;
    let organization_id: String = row.try_get("organization_id").map_err(get)?;
    let role: String = row.try_get("role").map_err(get)?;

    Ok(AdminCredential {
        id: AdminId::from(id),
        email: row.try_get("email").map_err(get)?,
        password_hash: row.try_get("password_hash").map_err(get)?,
        organization_id: OrganizationId::from_string(&organization_id)?,
        role: AdminRole::parse(&role)
            .ok_or_else(|| Error::Database(format!("Unknown admin role: {}", role)))?,
        created_at: row.try_get("created_at").map_err(get)?,
        updated_at: row.try_get("updated_at").map_err(get)?,
    })
}

fn document_from_row(row: &SqliteRow) -> Result<Document> {
    let id: String = row
        .try_get("id")
        .map_err(|e| Error::Database(format!("Failed to decode document: {}", e)))?;
    let body: String = row
        .try_get("body")
        .map_err(|e| Error::Database(format!("Failed to decode document: {}", e)))?;
    Ok(Document::new(id, serde_json::from_str(&body)?))
}

const ORGANIZATION_COLUMNS: &str = "id, name, slug, region_name, admin_id, created_at, updated_at";
const CREDENTIAL_COLUMNS: &str =
    "id, email, password_hash, organization_id, role, created_at, updated_at";

#[async_trait]
impl RegionStore for SqliteStore {
    async fn create_region(&self, name: &str) -> Result<RegionCreation> {
        validate_region_name(name)?;

        let sql = format!(
            "CREATE TABLE {} (id TEXT PRIMARY KEY, body TEXT NOT NULL)",
            region_table(name)
        );
        match sqlx::query(&sql).execute(&self.pool).await {
            Ok(_) => Ok(RegionCreation::Created),
            Err(e) if is_existing_table(&e) => Ok(RegionCreation::AlreadyExisted),
            Err(e) => Err(Error::Database(format!(
                "Failed to create region {}: {}",
                name, e
            ))),
        }
    }

    async fn drop_region(&self, name: &str) -> Result<RegionRemoval> {
        validate_region_name(name)?;

        let sql = format!("DROP TABLE {}", region_table(name));
        match sqlx::query(&sql).execute(&self.pool).await {
            Ok(_) => Ok(RegionRemoval::Dropped),
            Err(e) if is_missing_table(&e) => Ok(RegionRemoval::AlreadyAbsent),
            Err(e) => Err(Error::Database(format!(
                "Failed to drop region {}: {}",
                name, e
            ))),
        }
    }

    async fn region_exists(&self, name: &str) -> Result<bool> {
        validate_region_name(name)?;

        let found: Option<String> =
            sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?")
                .bind(format!("{}{}", REGION_TABLE_PREFIX, name))
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| Error::Database(format!("Failed to query regions: {}", e)))?;
        Ok(found.is_some())
    }

    async fn list_regions(&self) -> Result<Vec<String>> {
        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND substr(name, 1, ?) = ? ORDER BY name",
        )
        .bind(REGION_TABLE_PREFIX.len() as i64)
        .bind(REGION_TABLE_PREFIX)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to list regions: {}", e)))?;

        Ok(tables
            .into_iter()
            .filter_map(|t| t.strip_prefix(REGION_TABLE_PREFIX).map(str::to_string))
            .collect())
    }

    async fn insert_one(&self, name: &str, document: Document) -> Result<DocumentInsert> {
        validate_region_name(name)?;

        let sql = format!(
            "INSERT OR IGNORE INTO {} (id, body) VALUES (?, ?)",
            region_table(name)
        );
        let result = sqlx::query(&sql)
            .bind(&document.id)
            .bind(document.body.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_missing_table(&e) {
                    Error::NotFound(format!("Region not found: {}", name))
                } else {
                    Error::Database(format!("Failed to insert document: {}", e))
                }
            })?;

        Ok(if result.rows_affected() == 0 {
            DocumentInsert::Duplicate
        } else {
            DocumentInsert::Inserted
        })
    }

    async fn bulk_insert(&self, name: &str, documents: Vec<Document>) -> Result<BulkInsertOutcome> {
        validate_region_name(name)?;
        let table = region_table(name);
        let mut outcome = BulkInsertOutcome::default();

        for chunk in documents.chunks(INSERT_CHUNK_SIZE) {
            let mut qb = QueryBuilder::<Sqlite>::new(format!(
                "INSERT OR IGNORE INTO {} (id, body) ",
                table
            ));
            qb.push_values(chunk, |mut row, doc| {
                row.push_bind(doc.id.clone()).push_bind(doc.body.to_string());
            });

            match qb.build().execute(&self.pool).await {
                Ok(result) => {
                    let inserted = result.rows_affected();
                    outcome.inserted += inserted;
                    outcome.failed += chunk.len() as u64 - inserted;
                }
                Err(e) => {
                    tracing::warn!(region = %name, error = %e, "Bulk insert chunk rejected");
                    outcome.failed += chunk.len() as u64;
                }
            }
        }

        Ok(outcome)
    }

    fn scan_all<'a>(&'a self, name: &'a str) -> DocumentStream<'a> {
        if let Err(e) = validate_region_name(name) {
            return stream::once(async move { Err(e) }).boxed();
        }

        // Keyset paging on rowid: no connection is held between pages.
        let sql = format!(
            "SELECT rowid AS seq, id, body FROM {} WHERE rowid > ? ORDER BY rowid LIMIT ?",
            region_table(name)
        );
        let pool = &self.pool;

        stream::try_unfold(Some(0_i64), move |cursor| {
            let sql = sql.clone();
            async move {
                let Some(cursor) = cursor else {
                    return Ok(None);
                };

                let rows = match sqlx::query(&sql)
                    .bind(cursor)
                    .bind(SCAN_PAGE_SIZE)
                    .fetch_all(pool)
                    .await
                {
                    Ok(rows) => rows,
                    Err(e) if cursor == 0 && is_missing_table(&e) => return Ok(None),
                    Err(e) => {
                        return Err(Error::Database(format!(
                            "Failed to scan region {}: {}",
                            name, e
                        )));
                    }
                };
                if rows.is_empty() {
                    return Ok(None);
                }

                let mut last = cursor;
                let mut page = Vec::with_capacity(rows.len());
                for row in &rows {
                    last = row
                        .try_get("seq")
                        .map_err(|e| Error::Database(format!("Failed to decode row: {}", e)))?;
                    page.push(document_from_row(row)?);
                }

                let next = if (rows.len() as i64) < SCAN_PAGE_SIZE {
                    None
                } else {
                    Some(last)
                };
                Ok(Some((page, next)))
            }
        })
        .map_ok(|page| stream::iter(page.into_iter().map(Ok::<Document, Error>)))
        .try_flatten()
        .boxed()
    }

    async fn count(&self, name: &str) -> Result<u64> {
        validate_region_name(name)?;

        let sql = format!("SELECT COUNT(*) FROM {}", region_table(name));
        match sqlx::query_scalar::<_, i64>(&sql).fetch_one(&self.pool).await {
            Ok(n) => Ok(n as u64),
            Err(e) if is_missing_table(&e) => Ok(0),
            Err(e) => Err(Error::Database(format!("Failed to count region: {}", e))),
        }
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Database(format!("Ping failed: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl OrganizationDirectory for SqliteStore {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Organization>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM organizations WHERE slug = ?",
            ORGANIZATION_COLUMNS
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to query organization: {}", e)))?;

        row.as_ref().map(organization_from_row).transpose()
    }

    async fn find_by_id(&self, id: OrganizationId) -> Result<Option<Organization>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM organizations WHERE id = ?",
            ORGANIZATION_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to query organization: {}", e)))?;

        row.as_ref().map(organization_from_row).transpose()
    }

    async fn insert(&self, organization: NewOrganization) -> Result<OrganizationId> {
        let id = OrganizationId::new();

        sqlx::query(
            r#"
            INSERT INTO organizations
                (id, name, slug, region_name, admin_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, NULL, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(&organization.name)
        .bind(&organization.slug)
        .bind(&organization.region_name)
        .bind(organization.created_at)
        .bind(organization.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::UniqueViolation(format!("slug already taken: {}", organization.slug))
            } else {
                Error::Database(format!("Failed to insert organization: {}", e))
            }
        })?;

        Ok(id)
    }

    async fn update_fields(&self, id: OrganizationId, patch: OrganizationPatch) -> Result<()> {
        if patch.is_empty() {
            return match OrganizationDirectory::find_by_id(self, id).await? {
                Some(_) => Ok(()),
                None => Err(Error::NotFound(format!("Organization not found: {}", id))),
            };
        }

        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE organizations SET ");
        let mut set = qb.separated(", ");
        if let Some(name) = &patch.name {
            set.push("name = ").push_bind_unseparated(name.clone());
        }
        if let Some(slug) = &patch.slug {
            set.push("slug = ").push_bind_unseparated(slug.clone());
        }
        if let Some(region_name) = &patch.region_name {
            set.push("region_name = ")
                .push_bind_unseparated(region_name.clone());
        }
        if let Some(admin_id) = &patch.admin_id {
            set.push("admin_id = ")
                .push_bind_unseparated(admin_id.as_str().to_string());
        }
        if let Some(updated_at) = patch.updated_at {
            set.push("updated_at = ").push_bind_unseparated(updated_at);
        }
        qb.push(" WHERE id = ").push_bind(id.to_string());

        let result = qb.build().execute(&self.pool).await.map_err(|e| {
            if is_unique_violation(&e) {
                Error::UniqueViolation(format!(
                    "slug already taken: {}",
                    patch.slug.as_deref().unwrap_or_default()
                ))
            } else {
                Error::Database(format!("Failed to update organization: {}", e))
            }
        })?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Organization not found: {}", id)));
        }
        Ok(())
    }

    async fn delete(&self, id: OrganizationId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM organizations WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to delete organization: {}", e)))?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> Result<Vec<Organization>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM organizations ORDER BY created_at ASC",
            ORGANIZATION_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to list organizations: {}", e)))?;

        rows.iter().map(organization_from_row).collect()
    }
}

#[async_trait]
impl CredentialDirectory for SqliteStore {
    async fn insert(&self, credential: AdminCredential) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO admin_credentials
                (id, email, password_hash, organization_id, role, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(credential.id.as_str())
        .bind(&credential.email)
        .bind(&credential.password_hash)
        .bind(credential.organization_id.to_string())
        .bind(credential.role.as_str())
        .bind(credential.created_at)
        .bind(credential.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::UniqueViolation(format!("admin id already taken: {}", credential.id))
            } else {
                Error::Database(format!("Failed to insert credential: {}", e))
            }
        })?;
        Ok(())
    }

    async fn find_by_id(&self, id: &AdminId) -> Result<Option<AdminCredential>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM admin_credentials WHERE id = ?",
            CREDENTIAL_COLUMNS
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to query credential: {}", e)))?;

        row.as_ref().map(credential_from_row).transpose()
    }

    async fn find_by_organization(
        &self,
        org_id: OrganizationId,
    ) -> Result<Option<AdminCredential>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM admin_credentials WHERE organization_id = ? ORDER BY created_at ASC LIMIT 1",
            CREDENTIAL_COLUMNS
        ))
        .bind(org_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to query credential: {}", e)))?;

        row.as_ref().map(credential_from_row).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<AdminCredential>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM admin_credentials WHERE email = ? ORDER BY created_at ASC LIMIT 1",
            CREDENTIAL_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to query credential: {}", e)))?;

        row.as_ref().map(credential_from_row).transpose()
    }

    async fn update_fields(&self, id: &AdminId, patch: CredentialPatch) -> Result<()> {
        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE admin_credentials SET id = id");
        if let Some(email) = &patch.email {
            qb.push(", email = ").push_bind(email.clone());
        }
        if let Some(hash) = &patch.password_hash {
            qb.push(", password_hash = ").push_bind(hash.clone());
        }
        if let Some(updated_at) = patch.updated_at {
            qb.push(", updated_at = ").push_bind(updated_at);
        }
        qb.push(" WHERE id = ").push_bind(id.as_str().to_string());

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to update credential: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Admin not found: {}", id)));
        }
        Ok(())
    }

    async fn delete_all_for_organization(&self, org_id: OrganizationId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM admin_credentials WHERE organization_id = ?")
            .bind(org_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to delete credentials: {}", e)))?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    fn doc(id: &str, n: i64) -> Document {
        Document::new(id, serde_json::json!({"n": n, "tags": ["a", "b"]}))
    }

    #[tokio::test]
    async fn test_region_lifecycle() {
        let store = SqliteStore::in_memory().await.unwrap();

        assert_eq!(
            store.create_region("org_acme").await.unwrap(),
            RegionCreation::Created
        );
        assert_eq!(
            store.create_region("org_acme").await.unwrap(),
            RegionCreation::AlreadyExisted
        );
        assert!(store.region_exists("org_acme").await.unwrap());
        assert_eq!(store.list_regions().await.unwrap(), vec!["org_acme"]);

        assert_eq!(
            store.drop_region("org_acme").await.unwrap(),
            RegionRemoval::Dropped
        );
        assert_eq!(
            store.drop_region("org_acme").await.unwrap(),
            RegionRemoval::AlreadyAbsent
        );
        assert!(store.list_regions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_directory_tables_are_not_regions() {
        let store = SqliteStore::in_memory().await.unwrap();
        assert!(!store.region_exists("organizations").await.unwrap());
        assert!(store.list_regions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_unsafe_region_names() {
        let store = SqliteStore::in_memory().await.unwrap();
        let result = store.create_region("x\"; DROP TABLE organizations; --").await;
        assert!(matches!(result, Err(Error::InvalidRegionName(_))));
    }

    #[tokio::test]
    async fn test_insert_one_and_duplicates() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.create_region("org_a").await.unwrap();

        assert_eq!(
            store.insert_one("org_a", doc("1", 1)).await.unwrap(),
            DocumentInsert::Inserted
        );
        assert_eq!(
            store.insert_one("org_a", doc("1", 2)).await.unwrap(),
            DocumentInsert::Duplicate
        );
        assert!(matches!(
            store.insert_one("org_missing", doc("1", 1)).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_bulk_insert_counts_failures() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.create_region("org_a").await.unwrap();
        store.insert_one("org_a", doc("2", 0)).await.unwrap();

        let outcome = store
            .bulk_insert("org_a", vec![doc("1", 1), doc("2", 2), doc("3", 3)])
            .await
            .unwrap();
        assert_eq!(outcome.inserted, 2);
        assert_eq!(outcome.failed, 1);

        let missing = store
            .bulk_insert("org_missing", vec![doc("1", 1)])
            .await
            .unwrap();
        assert_eq!(missing.failed, 1);
    }

    #[tokio::test]
    async fn test_scan_pages_through_region() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.create_region("org_a").await.unwrap();

        let total = SCAN_PAGE_SIZE as usize * 2 + 7;
        let docs: Vec<Document> = (0..total).map(|i| doc(&format!("d{i}"), i as i64)).collect();
        store.bulk_insert("org_a", docs.clone()).await.unwrap();

        let scanned: Vec<Document> = store.scan_all("org_a").try_collect().await.unwrap();
        assert_eq!(scanned, docs);
        assert_eq!(store.count("org_a").await.unwrap(), total as u64);
    }

    #[tokio::test]
    async fn test_scan_missing_region_is_empty() {
        let store = SqliteStore::in_memory().await.unwrap();
        let scanned: Vec<Document> = store.scan_all("org_nope").try_collect().await.unwrap();
        assert!(scanned.is_empty());
        assert_eq!(store.count("org_nope").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_organization_slug_is_unique() {
        let store = SqliteStore::in_memory().await.unwrap();
        let now = Utc::now();

        let id =
            OrganizationDirectory::insert(&store, NewOrganization::new("Acme", "org_acme", now))
                .await
                .unwrap();
        let dup =
            OrganizationDirectory::insert(&store, NewOrganization::new("ACME", "org_acme", now))
                .await;
        assert!(matches!(dup, Err(Error::UniqueViolation(_))));

        let found = store.find_by_slug("org_acme").await.unwrap().unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.name, "Acme");
        assert_eq!(found.region_name, "org_acme");
        assert!(found.admin_id.is_none());
    }

    #[tokio::test]
    async fn test_organization_update_fields() {
        let store = SqliteStore::in_memory().await.unwrap();
        let now = Utc::now();
        let a = OrganizationDirectory::insert(&store, NewOrganization::new("A", "org_a", now))
            .await
            .unwrap();
        OrganizationDirectory::insert(&store, NewOrganization::new("B", "org_b", now))
            .await
            .unwrap();

        OrganizationDirectory::update_fields(
            &store,
            a,
            OrganizationPatch::admin(AdminId::from("admin_x")),
        )
        .await
        .unwrap();
        let clash = OrganizationDirectory::update_fields(
            &store,
            a,
            OrganizationPatch::rename("B", "org_b", now),
        )
        .await;
        assert!(matches!(clash, Err(Error::UniqueViolation(_))));

        OrganizationDirectory::update_fields(
            &store,
            a,
            OrganizationPatch::rename("C", "org_c", now),
        )
        .await
        .unwrap();
        let org = OrganizationDirectory::find_by_id(&store, a)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(org.slug, "org_c");
        assert_eq!(org.region_name, "org_c");
        assert_eq!(org.admin_id, Some(AdminId::from("admin_x")));

        let missing = OrganizationDirectory::update_fields(
            &store,
            OrganizationId::new(),
            OrganizationPatch::admin(AdminId::from("y")),
        )
        .await;
        assert!(matches!(missing, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_credentials_roundtrip() {
        let store = SqliteStore::in_memory().await.unwrap();
        let org = OrganizationId::new();
        let cred = AdminCredential::new("Admin@Acme.com", "hash".into(), org, Utc::now());

        CredentialDirectory::insert(&store, cred.clone()).await.unwrap();
        assert!(matches!(
            CredentialDirectory::insert(&store, cred.clone()).await,
            Err(Error::UniqueViolation(_))
        ));

        let by_email = store.find_by_email("admin@acme.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, cred.id);
        assert_eq!(by_email.organization_id, org);

        CredentialDirectory::update_fields(
                &store,
                &cred.id,
                CredentialPatch {
                    password_hash: Some("rotated".into()),
                    updated_at: Some(Utc::now()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let by_org = store.find_by_organization(org).await.unwrap().unwrap();
        assert_eq!(by_org.password_hash, "rotated");

        assert_eq!(store.delete_all_for_organization(org).await.unwrap(), 1);
        assert!(CredentialDirectory::find_by_id(&store, &cred.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_file_store_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("tenantry.db");

        {
            let store = SqliteStore::new(&path).await.unwrap();
            store.create_region("org_a").await.unwrap();
            store.insert_one("org_a", doc("1", 1)).await.unwrap();
            store.ping().await.unwrap();
            store.close().await;
        }

        let store = SqliteStore::new(&path).await.unwrap();
        assert_eq!(store.count("org_a").await.unwrap(), 1);
    }
}
