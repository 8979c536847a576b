//! Common test utilities

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use flashnews::config::{DatabaseConfig, ServiceConfig};
use flashnews::error::{PoolError, StoreError};
use flashnews::fetcher::MockFetcher;
use flashnews::models::{Article, ArticleId, NewsFilter, RawArticle};
use flashnews::orchestrator::CacheOrchestrator;
use flashnews::storage::{
    ArticleStore, MockArticleStore, SharedArticleStore, Storage, StoreResult,
};
use tempfile::TempDir;

/// Validated candidate with a distinct URL, published `n` minutes ago
pub fn raw_article(n: usize) -> RawArticle {
    let published = (Utc::now() - Duration::minutes(n as i64)).to_rfc3339();
    RawArticle::validated(
        Some(format!("Fetched headline number {n}").as_str()),
        Some(format!("https://feed.example/articles/{n}").as_str()),
    )
    .unwrap()
    .with_details(Some(format!("Description of story {n}").as_str()), None, None)
    .with_source(Some("Example Wire"), Some("https://feed.example"))
    .with_published_at(Some(published.as_str()))
}

/// Candidates for every n in `range`, in order
pub fn raw_articles(range: std::ops::Range<usize>) -> Vec<RawArticle> {
    range.map(raw_article).collect()
}

/// Unsaved article already in the cache, published `hours_ago` hours ago
pub fn cached_article(n: usize, hours_ago: i64) -> Article {
    let mut article = Article::new(
        format!("Cached headline number {n}"),
        format!("https://cache.example/articles/{n}"),
    );
    article.published_at = Utc::now() - Duration::hours(hours_ago);
    article
}

/// In-memory storage with a [`FlakyArticleStore`] in front of the articles
pub fn flaky_storage() -> (Storage, Arc<FlakyArticleStore>) {
    let flaky = Arc::new(FlakyArticleStore::new());
    let articles: SharedArticleStore = flaky.clone();
    let mut storage = Storage::in_memory();
    storage.articles = articles;
    (storage, flaky)
}

/// Orchestrator over `storage` with a mock feed and default settings
pub fn orchestrator(storage: &Storage, feed: Vec<RawArticle>) -> (CacheOrchestrator, Arc<MockFetcher>) {
    let fetcher = Arc::new(MockFetcher::with_articles(feed));
    let orch = CacheOrchestrator::new(storage, fetcher.clone(), ServiceConfig::default());
    (orch, fetcher)
}

/// SQLite-backed storage in a temporary directory
pub async fn sqlite_storage(dir: &TempDir) -> Storage {
    let config = DatabaseConfig {
        path: dir.path().join("news.db"),
        initial_pool_size: 2,
        max_pool_size: 4,
        acquire_timeout_secs: 1,
    };
    Storage::open_sqlite(&config).await.unwrap()
}

/// Article store wrapper that counts calls and injects failures
#[derive(Default)]
pub struct FlakyArticleStore {
    inner: MockArticleStore,
    calls: AtomicUsize,
    increments: AtomicUsize,
    unavailable: AtomicBool,
    failing_reads: AtomicBool,
    failing_inserts: Mutex<HashSet<String>>,
}

impl FlakyArticleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails as if the pool could not produce a handle
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// List reads and lookups fail with an ordinary store error
    pub fn set_failing_reads(&self, failing: bool) {
        self.failing_reads.store(failing, Ordering::SeqCst);
    }

    /// Inserting this URL fails with an ordinary store error
    pub fn fail_insert_of(&self, url: &str) {
        self.failing_inserts.lock().unwrap().insert(url.to_string());
    }

    /// Store calls seen so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// View-count increments seen so far
    pub fn increments(&self) -> usize {
        self.increments.load(Ordering::SeqCst)
    }

    fn enter(&self) -> StoreResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(PoolError::Connect(
                "database file is gone".to_string(),
            )));
        }
        Ok(())
    }

    fn read_check(&self) -> StoreResult<()> {
        self.enter()?;
        if self.failing_reads.load(Ordering::SeqCst) {
            return Err(StoreError::InvalidRecord("corrupt row".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ArticleStore for FlakyArticleStore {
    async fn find_latest(&self, filter: NewsFilter, limit: usize) -> StoreResult<Vec<Article>> {
        self.read_check()?;
        self.inner.find_latest(filter, limit).await
    }

    async fn find_trending(&self, filter: NewsFilter, limit: usize) -> StoreResult<Vec<Article>> {
        self.read_check()?;
        self.inner.find_trending(filter, limit).await
    }

    async fn search(&self, keyword: &str, filter: NewsFilter, limit: usize) -> StoreResult<Vec<Article>> {
        self.read_check()?;
        self.inner.search(keyword, filter, limit).await
    }

    async fn find_by_url(&self, url: &str) -> StoreResult<Option<Article>> {
        self.read_check()?;
        self.inner.find_by_url(url).await
    }

    async fn find_by_id(&self, id: ArticleId) -> StoreResult<Option<Article>> {
        self.read_check()?;
        self.inner.find_by_id(id).await
    }

    async fn insert(&self, article: &Article) -> StoreResult<ArticleId> {
        self.enter()?;
        if self.failing_inserts.lock().unwrap().contains(&article.url) {
            return Err(StoreError::InvalidRecord(article.url.clone()));
        }
        self.inner.insert(article).await
    }

    async fn update(&self, article: &Article) -> StoreResult<bool> {
        self.enter()?;
        self.inner.update(article).await
    }

    async fn increment_view_count(&self, id: ArticleId) -> StoreResult<bool> {
        self.enter()?;
        self.increments.fetch_add(1, Ordering::SeqCst);
        self.inner.increment_view_count(id).await
    }

    async fn set_trending(&self, id: ArticleId, trending: bool) -> StoreResult<bool> {
        self.enter()?;
        self.inner.set_trending(id, trending).await
    }

    async fn count_total(&self) -> StoreResult<u64> {
        self.enter()?;
        self.inner.count_total().await
    }

    async fn count_trending(&self) -> StoreResult<u64> {
        self.enter()?;
        self.inner.count_trending().await
    }

    async fn count_recent(&self, since: DateTime<Utc>) -> StoreResult<u64> {
        self.enter()?;
        self.inner.count_recent(since).await
    }

    async fn total_views(&self) -> StoreResult<u64> {
        self.enter()?;
        self.inner.total_views().await
    }
}
