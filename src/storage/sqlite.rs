//! SQLite-backed stores
//!
//! Every operation borrows one connection from the shared [`SqlitePool`] for
//! a single statement and returns it when the statement completes.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{ffi, params, Connection, OptionalExtension, Row};

use super::repository::{ArticleStore, CategoryStore, RegionStore, StoreResult};
use crate::models::{Article, ArticleId, Category, NewsFilter, Region};
use crate::pool::SqlitePool;
use crate::utils::error::StoreError;
use crate::utils::escape_like;

// ============================================================================
// Schema
// ============================================================================

/// Create tables and indexes if they do not exist
pub fn create_schema(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        r#"
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                display_name TEXT NOT NULL,
                description TEXT,
                active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS regions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                country_code TEXT NOT NULL UNIQUE,
                timezone TEXT,
                active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS articles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT,
                content TEXT,
                url TEXT NOT NULL UNIQUE,
                image_url TEXT,
                source_name TEXT,
                source_url TEXT,
                category_id INTEGER REFERENCES categories(id),
                region_id INTEGER REFERENCES regions(id),
                published_at TEXT NOT NULL,
                cached_at TEXT NOT NULL,
                trending INTEGER NOT NULL DEFAULT 0,
                view_count INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_articles_published
                ON articles(published_at DESC);

            CREATE INDEX IF NOT EXISTS idx_articles_trending
                ON articles(trending, published_at DESC);

            CREATE INDEX IF NOT EXISTS idx_articles_category
                ON articles(category_id);

            CREATE INDEX IF NOT EXISTS idx_articles_region
                ON articles(region_id);
            "#,
    )?;
    Ok(())
}

// ============================================================================
// Row Mapping
// ============================================================================

const ARTICLE_COLUMNS: &str = "id, title, description, content, url, image_url, source_name, \
     source_url, category_id, region_id, published_at, cached_at, trending, view_count";

/// Fixed-width UTC text, so lexical order is chronological
fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn article_from_row(row: &Row<'_>) -> rusqlite::Result<Article> {
    Ok(Article {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        content: row.get(3)?,
        url: row.get(4)?,
        image_url: row.get(5)?,
        source_name: row.get(6)?,
        source_url: row.get(7)?,
        category_id: row.get(8)?,
        region_id: row.get(9)?,
        published_at: parse_ts(row, 10)?,
        cached_at: parse_ts(row, 11)?,
        trending: row.get(12)?,
        view_count: row.get::<_, i64>(13)?.max(0) as u64,
    })
}

fn category_from_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        display_name: row.get(2)?,
        description: row.get(3)?,
        active: row.get(4)?,
        created_at: parse_ts(row, 5)?,
    })
}

fn region_from_row(row: &Row<'_>) -> rusqlite::Result<Region> {
    Ok(Region {
        id: row.get(0)?,
        name: row.get(1)?,
        country_code: row.get(2)?,
        timezone: row.get(3)?,
        active: row.get(4)?,
        created_at: parse_ts(row, 5)?,
    })
}

/// A UNIQUE violation on a natural key becomes `Duplicate`
fn map_write_error(err: rusqlite::Error, key: &str) -> StoreError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            StoreError::Duplicate(key.to_string())
        }
        _ => StoreError::Query(err),
    }
}

fn count(conn: &Connection, sql: &str, params: impl rusqlite::Params) -> StoreResult<u64> {
    let n: i64 = conn.query_row(sql, params, |row| row.get(0))?;
    Ok(n.max(0) as u64)
}

// ============================================================================
// Article Store
// ============================================================================

/// Article store over the pooled SQLite database
pub struct SqliteArticleStore {
    pool: Arc<SqlitePool>,
}

impl SqliteArticleStore {
    /// Create a store sharing `pool`
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    fn list(
        conn: &Connection,
        extra_where: &str,
        filter: NewsFilter,
        limit: usize,
        pattern: Option<&str>,
    ) -> StoreResult<Vec<Article>> {
        let sql = format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles \
             WHERE (?1 IS NULL OR category_id = ?1) \
               AND (?2 IS NULL OR region_id = ?2) {extra_where} \
             ORDER BY published_at DESC, id ASC LIMIT ?3"
        );
        let mut stmt = conn.prepare(&sql)?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let rows = match pattern {
            Some(p) => stmt
                .query_map(
                    params![filter.category_id, filter.region_id, limit, p],
                    article_from_row,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?,
            None => stmt
                .query_map(
                    params![filter.category_id, filter.region_id, limit],
                    article_from_row,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?,
        };
        Ok(rows)
    }
}

#[async_trait]
impl ArticleStore for SqliteArticleStore {
    async fn find_latest(&self, filter: NewsFilter, limit: usize) -> StoreResult<Vec<Article>> {
        let conn = self.pool.acquire().await?;
        Self::list(&conn, "", filter, limit, None)
    }

    async fn find_trending(
        &self,
        filter: NewsFilter,
        limit: usize,
    ) -> StoreResult<Vec<Article>> {
        let conn = self.pool.acquire().await?;
        Self::list(&conn, "AND trending = 1", filter, limit, None)
    }

    async fn search(
        &self,
        keyword: &str,
        filter: NewsFilter,
        limit: usize,
    ) -> StoreResult<Vec<Article>> {
        let pattern = format!("%{}%", escape_like(keyword));
        let conn = self.pool.acquire().await?;
        Self::list(
            &conn,
            r"AND (title LIKE ?4 ESCAPE '\' OR description LIKE ?4 ESCAPE '\')",
            filter,
            limit,
            Some(&pattern),
        )
    }

    async fn find_by_url(&self, url: &str) -> StoreResult<Option<Article>> {
        let conn = self.pool.acquire().await?;
        let article = conn
            .query_row(
                &format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE url = ?1"),
                params![url],
                article_from_row,
            )
            .optional()?;
        Ok(article)
    }

    async fn find_by_id(&self, id: ArticleId) -> StoreResult<Option<Article>> {
        let conn = self.pool.acquire().await?;
        let article = conn
            .query_row(
                &format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = ?1"),
                params![id],
                article_from_row,
            )
            .optional()?;
        Ok(article)
    }

    async fn insert(&self, article: &Article) -> StoreResult<ArticleId> {
        let conn = self.pool.acquire().await?;
        conn.execute(
            "INSERT INTO articles (title, description, content, url, image_url, source_name, \
             source_url, category_id, region_id, published_at, cached_at, trending, view_count) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                article.title,
                article.description,
                article.content,
                article.url,
                article.image_url,
                article.source_name,
                article.source_url,
                article.category_id,
                article.region_id,
                format_ts(&article.published_at),
                format_ts(&article.cached_at),
                article.trending,
                i64::try_from(article.view_count).unwrap_or(i64::MAX),
            ],
        )
        .map_err(|e| map_write_error(e, &article.url))?;

        Ok(conn.last_insert_rowid())
    }

    async fn update(&self, article: &Article) -> StoreResult<bool> {
        let conn = self.pool.acquire().await?;
        let changed = conn
            .execute(
                "UPDATE articles SET title = ?2, description = ?3, content = ?4, url = ?5, \
                 image_url = ?6, source_name = ?7, source_url = ?8, category_id = ?9, \
                 region_id = ?10, published_at = ?11, cached_at = ?12, trending = ?13, \
                 view_count = ?14 WHERE id = ?1",
                params![
                    article.id,
                    article.title,
                    article.description,
                    article.content,
                    article.url,
                    article.image_url,
                    article.source_name,
                    article.source_url,
                    article.category_id,
                    article.region_id,
                    format_ts(&article.published_at),
                    format_ts(&article.cached_at),
                    article.trending,
                    i64::try_from(article.view_count).unwrap_or(i64::MAX),
                ],
            )
            .map_err(|e| map_write_error(e, &article.url))?;
        Ok(changed > 0)
    }

    async fn increment_view_count(&self, id: ArticleId) -> StoreResult<bool> {
        let conn = self.pool.acquire().await?;
        let changed = conn.execute(
            "UPDATE articles SET view_count = view_count + 1 WHERE id = ?1",
            params![id],
        )?;
        Ok(changed > 0)
    }

    async fn set_trending(&self, id: ArticleId, trending: bool) -> StoreResult<bool> {
        let conn = self.pool.acquire().await?;
        let changed = conn.execute(
            "UPDATE articles SET trending = ?2 WHERE id = ?1",
            params![id, trending],
        )?;
        Ok(changed > 0)
    }

    async fn count_total(&self) -> StoreResult<u64> {
        let conn = self.pool.acquire().await?;
        count(&conn, "SELECT COUNT(*) FROM articles", [])
    }

    async fn count_trending(&self) -> StoreResult<u64> {
        let conn = self.pool.acquire().await?;
        count(&conn, "SELECT COUNT(*) FROM articles WHERE trending = 1", [])
    }

    async fn count_recent(&self, since: DateTime<Utc>) -> StoreResult<u64> {
        let conn = self.pool.acquire().await?;
        count(
            &conn,
            "SELECT COUNT(*) FROM articles WHERE published_at >= ?1",
            params![format_ts(&since)],
        )
    }

    async fn total_views(&self) -> StoreResult<u64> {
        let conn = self.pool.acquire().await?;
        count(&conn, "SELECT COALESCE(SUM(view_count), 0) FROM articles", [])
    }
}

// ============================================================================
// Category / Region Stores
// ============================================================================

const CATEGORY_COLUMNS: &str = "id, name, display_name, description, active, created_at";
const REGION_COLUMNS: &str = "id, name, country_code, timezone, active, created_at";

/// Category store over the pooled SQLite database
pub struct SqliteCategoryStore {
    pool: Arc<SqlitePool>,
}

impl SqliteCategoryStore {
    /// Create a store sharing `pool`
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CategoryStore for SqliteCategoryStore {
    async fn find_all(&self) -> StoreResult<Vec<Category>> {
        let conn = self.pool.acquire().await?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE active = 1 ORDER BY display_name"
        ))?;
        let rows = stmt
            .query_map([], category_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Category>> {
        let conn = self.pool.acquire().await?;
        let category = conn
            .query_row(
                &format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ?1"),
                params![id],
                category_from_row,
            )
            .optional()?;
        Ok(category)
    }

    async fn find_by_name(&self, name: &str) -> StoreResult<Option<Category>> {
        let name = Category::normalize_name(name);
        let conn = self.pool.acquire().await?;
        let category = conn
            .query_row(
                &format!(
                    "SELECT {CATEGORY_COLUMNS} FROM categories WHERE name = ?1 AND active = 1"
                ),
                params![name],
                category_from_row,
            )
            .optional()?;
        Ok(category)
    }

    async fn insert(&self, category: &Category) -> StoreResult<i64> {
        let name = Category::normalize_name(&category.name);
        let conn = self.pool.acquire().await?;
        conn.execute(
            "INSERT INTO categories (name, display_name, description, active, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                name,
                category.display_name,
                category.description,
                category.active,
                format_ts(&category.created_at),
            ],
        )
        .map_err(|e| map_write_error(e, &name))?;
        Ok(conn.last_insert_rowid())
    }

    async fn deactivate(&self, id: i64) -> StoreResult<bool> {
        let conn = self.pool.acquire().await?;
        let changed = conn.execute(
            "UPDATE categories SET active = 0 WHERE id = ?1",
            params![id],
        )?;
        Ok(changed > 0)
    }

    async fn count_active(&self) -> StoreResult<u64> {
        let conn = self.pool.acquire().await?;
        count(&conn, "SELECT COUNT(*) FROM categories WHERE active = 1", [])
    }
}

/// Region store over the pooled SQLite database
pub struct SqliteRegionStore {
    pool: Arc<SqlitePool>,
}

impl SqliteRegionStore {
    /// Create a store sharing `pool`
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RegionStore for SqliteRegionStore {
    async fn find_all(&self) -> StoreResult<Vec<Region>> {
        let conn = self.pool.acquire().await?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {REGION_COLUMNS} FROM regions WHERE active = 1 ORDER BY name"
        ))?;
        let rows = stmt
            .query_map([], region_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Region>> {
        let conn = self.pool.acquire().await?;
        let region = conn
            .query_row(
                &format!("SELECT {REGION_COLUMNS} FROM regions WHERE id = ?1"),
                params![id],
                region_from_row,
            )
            .optional()?;
        Ok(region)
    }

    async fn find_by_code(&self, code: &str) -> StoreResult<Option<Region>> {
        let code = Region::normalize_code(code);
        let conn = self.pool.acquire().await?;
        let region = conn
            .query_row(
                &format!(
                    "SELECT {REGION_COLUMNS} FROM regions WHERE country_code = ?1 AND active = 1"
                ),
                params![code],
                region_from_row,
            )
            .optional()?;
        Ok(region)
    }

    async fn insert(&self, region: &Region) -> StoreResult<i64> {
        let code = Region::normalize_code(&region.country_code);
        let conn = self.pool.acquire().await?;
        conn.execute(
            "INSERT INTO regions (name, country_code, timezone, active, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                region.name,
                code,
                region.timezone,
                region.active,
                format_ts(&region.created_at),
            ],
        )
        .map_err(|e| map_write_error(e, &code))?;
        Ok(conn.last_insert_rowid())
    }

    async fn deactivate(&self, id: i64) -> StoreResult<bool> {
        let conn = self.pool.acquire().await?;
        let changed = conn.execute(
            "UPDATE regions SET active = 0 WHERE id = ?1",
            params![id],
        )?;
        Ok(changed > 0)
    }

    async fn count_active(&self) -> StoreResult<u64> {
        let conn = self.pool.acquire().await?;
        count(&conn, "SELECT COUNT(*) FROM regions WHERE active = 1", [])
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{PoolSettings, SqliteManager};
    use chrono::Duration;
    use tempfile::TempDir;

    async fn open_pool(dir: &TempDir) -> Arc<SqlitePool> {
        let pool = SqlitePool::open(
            SqliteManager::new(dir.path().join("news.db")),
            PoolSettings::default(),
        )
        .unwrap();
        {
            let conn = pool.acquire().await.unwrap();
            create_schema(&conn).unwrap();
        }
        Arc::new(pool)
    }

    #[test]
    fn test_timestamp_text_sorts_chronologically() {
        let early = Utc::now();
        let late = early + Duration::milliseconds(1500);
        assert!(format_ts(&early) < format_ts(&late));
        assert_eq!(format_ts(&early).len(), format_ts(&late).len());
    }

    #[tokio::test]
    async fn test_article_round_trip_and_duplicate() {
        let dir = TempDir::new().unwrap();
        let store = SqliteArticleStore::new(open_pool(&dir).await);

        let mut article = Article::new("Rust 2.0 announced at conference", "https://e.com/rust");
        article.description = Some("Big news".to_string());
        article.trending = true;
        let id = store.insert(&article).await.unwrap();

        let stored = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.url, article.url);
        assert!(stored.trending);
        assert_eq!(
            stored.published_at.timestamp_micros(),
            article.published_at.timestamp_micros()
        );

        let err = store.insert(&article).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(url) if url == "https://e.com/rust"));
    }

    #[tokio::test]
    async fn test_search_escapes_like_wildcards() {
        let dir = TempDir::new().unwrap();
        let store = SqliteArticleStore::new(open_pool(&dir).await);

        store
            .insert(&Article::new("Markets rally 100% overnight", "https://e.com/a"))
            .await
            .unwrap();
        store
            .insert(&Article::new("Markets rally 1000 points", "https://e.com/b"))
            .await
            .unwrap();

        let hits = store.search("100%", NewsFilter::all(), 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].url, "https://e.com/a");

        let hits = store.search("MARKETS", NewsFilter::all(), 10).await.unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn test_category_name_is_unique_and_normalized() {
        let dir = TempDir::new().unwrap();
        let store = SqliteCategoryStore::new(open_pool(&dir).await);

        let id = store.insert(&Category::new("Science", "Science")).await.unwrap();
        assert!(matches!(
            store.insert(&Category::new("SCIENCE", "Dup")).await,
            Err(StoreError::Duplicate(_))
        ));
        assert_eq!(
            store.find_by_name("science").await.unwrap().map(|c| c.id),
            Some(id)
        );
    }
}
