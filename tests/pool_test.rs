//! Connection pool against a real SQLite file

use std::sync::Arc;
use std::time::Duration;

use flashnews::config::DatabaseConfig;
use flashnews::pool::{PoolSettings, SqliteManager, SqlitePool};
use flashnews::storage::Storage;
use tempfile::TempDir;

fn sqlite_pool(dir: &TempDir, initial: usize, max: usize, timeout: Duration) -> SqlitePool {
    let settings = PoolSettings {
        initial_size: initial,
        max_size: max,
        acquire_timeout: timeout,
    };
    SqlitePool::open(SqliteManager::new(dir.path().join("pool.db")), settings).unwrap()
}

#[test]
fn test_acquire_outside_async_context() {
    let dir = TempDir::new().unwrap();
    let pool = sqlite_pool(&dir, 2, 4, Duration::from_secs(1));

    let value: i64 = tokio_test::block_on(async {
        let conn = pool.acquire().await.unwrap();
        let value = conn.query_row("SELECT 40 + 2", [], |row| row.get(0)).unwrap();
        value
    });

    assert_eq!(value, 42);
    assert_eq!(pool.status().idle, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_share_pool() {
    let dir = TempDir::new().unwrap();
    let pool = Arc::new(sqlite_pool(&dir, 3, 5, Duration::from_millis(200)));
    {
        let conn = pool.acquire().await.unwrap();
        conn.execute("CREATE TABLE hits (worker INTEGER NOT NULL)", [])
            .unwrap();
    }

    let mut tasks = Vec::new();
    for worker in 0..24 {
        let pool = Arc::clone(&pool);
        tasks.push(tokio::spawn(async move {
            let conn = pool.acquire().await.unwrap();
            conn.execute("INSERT INTO hits (worker) VALUES (?1)", [worker])
                .unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let conn = pool.acquire().await.unwrap();
    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM hits", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 24);
    drop(conn);

    let status = pool.status();
    assert!(status.idle <= 5);
    assert!(status.created >= 3);
}

#[tokio::test]
async fn test_exhausted_pool_opens_extra_connection() {
    let dir = TempDir::new().unwrap();
    let pool = sqlite_pool(&dir, 1, 1, Duration::from_millis(50));

    let first = pool.acquire().await.unwrap();
    let second = pool.acquire().await.unwrap();
    assert_eq!(pool.status().timeouts, 1);
    assert_eq!(pool.status().created, 2);

    drop(first);
    drop(second);

    // Only one fits back under max_size
    let status = pool.status();
    assert_eq!(status.idle, 1);
    assert_eq!(status.closed, 1);
}

#[tokio::test]
async fn test_shutdown_then_reuse() {
    let dir = TempDir::new().unwrap();
    let pool = sqlite_pool(&dir, 2, 4, Duration::from_secs(1));

    pool.shutdown();
    let status = pool.status();
    assert!(!status.initialized);
    assert_eq!(status.idle, 0);
    assert_eq!(status.closed, 2);

    let conn = pool.acquire().await.unwrap();
    let one: i64 = conn.query_row("SELECT 1", [], |row| row.get(0)).unwrap();
    assert_eq!(one, 1);
    drop(conn);

    let status = pool.status();
    assert!(status.initialized);
    assert_eq!(status.idle, 2);
    assert_eq!(status.created, 4);
}

#[tokio::test]
async fn test_storage_creates_database_directory() {
    let dir = TempDir::new().unwrap();
    let config = DatabaseConfig {
        path: dir.path().join("nested").join("news.db"),
        initial_pool_size: 2,
        max_pool_size: 3,
        acquire_timeout_secs: 1,
    };

    let storage = Storage::open_sqlite(&config).await.unwrap();
    assert!(config.path.exists());

    let status = storage.pool_status().unwrap();
    assert!(status.initialized);
    assert_eq!(status.max_size, 3);

    storage.shutdown();
    assert_eq!(storage.pool_status().unwrap().idle, 0);
}
