//! Storage handle owned by the process
//!
//! One backend is opened at startup and shared by every component through
//! the storage traits. The handle is closed after the HTTP server drains.

use std::sync::Arc;

use tenantry_core::{CredentialDirectory, CredentialHasher, MemoryStore, Result};
use tenantry_lifecycle::{LifecycleManager, MigrationConfig};
use tenantry_store_sqlite::SqliteStore;

#[cfg(not(feature = "postgres"))]
use tenantry_core::Error;
#[cfg(feature = "postgres")]
use tenantry_store_postgres::PostgresStore;

use crate::config::{StorageBackend, StorageConfig};

#[derive(Clone)]
pub enum Storage {
    Memory(Arc<MemoryStore>),
    Sqlite(Arc<SqliteStore>),
    #[cfg(feature = "postgres")]
    Postgres(Arc<PostgresStore>),
}

impl Storage {
    /// Open the configured backend and run its schema migrations
    pub async fn open(config: &StorageConfig) -> Result<Self> {
        match config.backend {
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; all data is lost on exit");
                Ok(Self::Memory(Arc::new(MemoryStore::new())))
            }
            StorageBackend::Sqlite => {
                let store = SqliteStore::new(&config.url).await?;
                tracing::info!(path = %config.url, "SQLite storage ready");
                Ok(Self::Sqlite(Arc::new(store)))
            }
            #[cfg(feature = "postgres")]
            StorageBackend::Postgres => {
                let store =
                    PostgresStore::with_max_connections(&config.url, config.max_connections)
                        .await?;
                tracing::info!(
                    max_connections = config.max_connections,
                    "PostgreSQL storage ready"
                );
                Ok(Self::Postgres(Arc::new(store)))
            }
            #[cfg(not(feature = "postgres"))]
            StorageBackend::Postgres => Err(Error::Config(
                "PostgreSQL storage requires building with --features postgres".to_string(),
            )),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Sqlite(_) => "sqlite",
            #[cfg(feature = "postgres")]
            Self::Postgres(_) => "postgres",
        }
    }

    pub fn lifecycle(
        &self,
        hasher: Arc<dyn CredentialHasher>,
        migration: MigrationConfig,
    ) -> LifecycleManager {
        match self {
            Self::Memory(store) => LifecycleManager::from_store(store.clone(), hasher, migration),
            Self::Sqlite(store) => LifecycleManager::from_store(store.clone(), hasher, migration),
            #[cfg(feature = "postgres")]
            Self::Postgres(store) => LifecycleManager::from_store(store.clone(), hasher, migration),
        }
    }

    pub fn credentials(&self) -> Arc<dyn CredentialDirectory> {
        match self {
            Self::Memory(store) => store.clone(),
            Self::Sqlite(store) => store.clone(),
            #[cfg(feature = "postgres")]
            Self::Postgres(store) => store.clone(),
        }
    }

    /// Close the underlying pool, if any
    pub async fn close(&self) {
        match self {
            Self::Memory(_) => {}
            Self::Sqlite(store) => store.close().await,
            #[cfg(feature = "postgres")]
            Self::Postgres(store) => store.close().await,
        }
        tracing::info!(backend = self.backend_name(), "Storage closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenantry_core::RegionStore;

    #[tokio::test]
    async fn test_open_memory() {
        let config = StorageConfig {
            backend: StorageBackend::Memory,
            ..Default::default()
        };
        let storage = Storage::open(&config).await.unwrap();
        assert_eq!(storage.backend_name(), "memory");
    }

    #[tokio::test]
    async fn test_open_sqlite_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = StorageConfig {
            backend: StorageBackend::Sqlite,
            url: dir.path().join("data/tenantry.db").display().to_string(),
            ..Default::default()
        };

        let storage = Storage::open(&config).await.unwrap();
        let Storage::Sqlite(store) = &storage else {
            panic!("expected sqlite storage");
        };
        store.ping().await.unwrap();
        storage.close().await;
    }

    #[cfg(not(feature = "postgres"))]
    #[tokio::test]
    async fn test_postgres_requires_feature() {
        let config = StorageConfig {
            backend: StorageBackend::Postgres,
            url: "postgres://localhost/tenantry".to_string(),
            ..Default::default()
        };
        assert!(matches!(Storage::open(&config).await, Err(Error::Config(_))));
    }
}
