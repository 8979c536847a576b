//! Article, category and region persistence
//!
//! This module wires the store traits to a backing store:
//! - SQLite through the shared [`SqlitePool`] for the application
//! - In-memory mocks for tests and dry runs

pub mod repository;
pub mod seed;
pub mod sqlite;

pub use repository::{
    ArticleStore, CategoryStore, MockArticleStore, MockCategoryStore, MockRegionStore,
    RegionStore, SharedArticleStore, SharedCategoryStore, SharedRegionStore, StoreResult,
};
pub use sqlite::{SqliteArticleStore, SqliteCategoryStore, SqliteRegionStore};

use std::sync::Arc;

use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::pool::{PoolSettings, PoolStatus, SqliteManager, SqlitePool};

/// The three stores, sharing one backing store
#[derive(Clone)]
pub struct Storage {
    pub articles: SharedArticleStore,
    pub categories: SharedCategoryStore,
    pub regions: SharedRegionStore,
    pool: Option<Arc<SqlitePool>>,
}

impl Storage {
    /// Open the SQLite database, pre-populate the pool and create the schema.
    ///
    /// The database's parent directory is created if needed.
    pub async fn open_sqlite(config: &DatabaseConfig) -> Result<Self> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let pool = SqlitePool::open(
            SqliteManager::new(&config.path),
            PoolSettings::from(config),
        )?;

        {
            let conn = pool.acquire().await?;
            sqlite::create_schema(&conn)?;
        }

        tracing::info!(path = %config.path.display(), "SQLite storage initialized");
        Ok(Self::from_pool(Arc::new(pool)))
    }

    /// Stores sharing an existing pool
    pub fn from_pool(pool: Arc<SqlitePool>) -> Self {
        Self {
            articles: Arc::new(SqliteArticleStore::new(Arc::clone(&pool))),
            categories: Arc::new(SqliteCategoryStore::new(Arc::clone(&pool))),
            regions: Arc::new(SqliteRegionStore::new(Arc::clone(&pool))),
            pool: Some(pool),
        }
    }

    /// In-memory stores (for testing)
    pub fn in_memory() -> Self {
        Self {
            articles: Arc::new(MockArticleStore::new()),
            categories: Arc::new(MockCategoryStore::new()),
            regions: Arc::new(MockRegionStore::new()),
            pool: None,
        }
    }

    /// Occupancy of the backing pool, if any
    pub fn pool_status(&self) -> Option<PoolStatus> {
        self.pool.as_ref().map(|p| p.status())
    }

    /// Close every idle pooled handle
    pub fn shutdown(&self) {
        if let Some(pool) = &self.pool {
            pool.shutdown();
        }
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("pool", &self.pool_status())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_sqlite_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let config = DatabaseConfig {
            path: dir.path().join("nested").join("news.db"),
            ..DatabaseConfig::default()
        };

        let storage = Storage::open_sqlite(&config).await.unwrap();
        assert_eq!(storage.articles.count_total().await.unwrap(), 0);

        let status = storage.pool_status().unwrap();
        assert!(status.initialized);
        assert_eq!(status.idle, config.initial_pool_size);

        storage.shutdown();
        assert_eq!(storage.pool_status().unwrap().idle, 0);
    }

    #[test]
    fn test_in_memory_has_no_pool() {
        assert!(Storage::in_memory().pool_status().is_none());
    }
}
