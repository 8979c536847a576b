//! SQLite handles for the resource pool

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::Connection;

use super::{HandleManager, ResourcePool};
use crate::utils::error::PoolError;

/// Pool of SQLite connections to one database file
pub type SqlitePool = ResourcePool<SqliteManager>;

/// Opens connections to one SQLite database file
#[derive(Debug, Clone)]
pub struct SqliteManager {
    path: PathBuf,
    busy_timeout: Duration,
}

impl SqliteManager {
    /// Manager for the database at `path`. The parent directory must exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout: Duration::from_secs(5),
        }
    }

    /// Override how long a connection waits on a locked database
    #[must_use]
    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }

    /// Database file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> rusqlite::Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(self.busy_timeout)?;
        // WAL lets pooled readers run alongside a writer
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        Ok(conn)
    }
}

impl HandleManager for SqliteManager {
    type Handle = Connection;

    fn connect(&self) -> Result<Connection, PoolError> {
        self.open().map_err(|e| {
            PoolError::Connect(format!("{}: {e}", self.path.display()))
        })
    }

    fn is_alive(&self, conn: &Connection) -> bool {
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .is_ok()
    }

    fn close(&self, conn: Connection) {
        if let Err((_, e)) = conn.close() {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to close SQLite connection");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::PoolSettings;
    use tempfile::TempDir;

    #[test]
    fn test_connect_enables_wal() {
        let dir = TempDir::new().unwrap();
        let manager = SqliteManager::new(dir.path().join("news.db"));

        let conn = manager.connect().unwrap();
        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();

        assert_eq!(mode.to_lowercase(), "wal");
        assert!(manager.is_alive(&conn));
        manager.close(conn);
    }

    #[test]
    fn test_missing_parent_directory_is_connect_error() {
        let dir = TempDir::new().unwrap();
        let manager = SqliteManager::new(dir.path().join("missing").join("news.db"));

        assert!(matches!(manager.connect(), Err(PoolError::Connect(_))));
    }

    #[tokio::test]
    async fn test_pooled_connections_share_one_file() {
        let dir = TempDir::new().unwrap();
        let settings = PoolSettings {
            initial_size: 2,
            max_size: 4,
            acquire_timeout: Duration::from_millis(50),
        };
        let pool = SqlitePool::open(SqliteManager::new(dir.path().join("news.db")), settings).unwrap();

        {
            let conn = pool.acquire().await.unwrap();
            conn.execute_batch("CREATE TABLE t (v INTEGER); INSERT INTO t VALUES (7);")
                .unwrap();
        }

        let first = pool.acquire().await.unwrap();
        let second = pool.acquire().await.unwrap();
        for conn in [&first, &second] {
            let v: i64 = conn.query_row("SELECT v FROM t", [], |row| row.get(0)).unwrap();
            assert_eq!(v, 7);
        }
    }
}
