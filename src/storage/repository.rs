//! Store traits for articles, categories and regions
//!
//! The orchestrator only sees these traits, so the backing store can be
//! swapped without touching the refresh logic:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CacheOrchestrator                       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Store Traits                          │
//! │        ArticleStore, CategoryStore, RegionStore             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                ┌─────────────┴─────────────┐
//!                ▼                           ▼
//!       ┌─────────────────┐         ┌─────────────────┐
//!       │  SQLite (pool)  │         │      Mock       │
//!       └─────────────────┘         └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use flashnews::storage::{ArticleStore, MockArticleStore};
//!
//! let store = MockArticleStore::new();
//! let id = store.insert(&article).await?;
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{Article, ArticleId, Category, NewsFilter, Region};
use crate::utils::error::StoreError;

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

// ============================================================================
// Store Traits
// ============================================================================

/// Article persistence
///
/// List reads order by `published_at` descending, ties by ascending id.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Most recent articles matching the filter
    async fn find_latest(&self, filter: NewsFilter, limit: usize) -> StoreResult<Vec<Article>>;

    /// Most recent trending articles matching the filter
    async fn find_trending(&self, filter: NewsFilter, limit: usize)
        -> StoreResult<Vec<Article>>;

    /// Articles whose title or description contains `keyword`
    async fn search(
        &self,
        keyword: &str,
        filter: NewsFilter,
        limit: usize,
    ) -> StoreResult<Vec<Article>>;

    /// Look up an article by its canonical URL
    async fn find_by_url(&self, url: &str) -> StoreResult<Option<Article>>;

    /// Look up an article by id
    async fn find_by_id(&self, id: ArticleId) -> StoreResult<Option<Article>>;

    /// Store a new article and return its id.
    ///
    /// Fails with [`StoreError::Duplicate`] when the URL is already stored.
    async fn insert(&self, article: &Article) -> StoreResult<ArticleId>;

    /// Overwrite the stored fields of an existing article; false if absent
    async fn update(&self, article: &Article) -> StoreResult<bool>;

    /// Add one view; false if the article does not exist
    async fn increment_view_count(&self, id: ArticleId) -> StoreResult<bool>;

    /// Set the trending flag; false if the article does not exist
    async fn set_trending(&self, id: ArticleId, trending: bool) -> StoreResult<bool>;

    /// Number of stored articles
    async fn count_total(&self) -> StoreResult<u64>;

    /// Number of trending articles
    async fn count_trending(&self) -> StoreResult<u64>;

    /// Number of articles published at or after `since`
    async fn count_recent(&self, since: DateTime<Utc>) -> StoreResult<u64>;

    /// Sum of all view counters
    async fn total_views(&self) -> StoreResult<u64>;
}

/// Category reference data
#[async_trait]
pub trait CategoryStore: Send + Sync {
    /// Active categories ordered by display name
    async fn find_all(&self) -> StoreResult<Vec<Category>>;

    /// Category by id, active or not
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Category>>;

    /// Active category by name, compared lowercase
    async fn find_by_name(&self, name: &str) -> StoreResult<Option<Category>>;

    /// Store a new category and return its id
    async fn insert(&self, category: &Category) -> StoreResult<i64>;

    /// Soft-delete a category; false if absent
    async fn deactivate(&self, id: i64) -> StoreResult<bool>;

    /// Number of active categories
    async fn count_active(&self) -> StoreResult<u64>;
}

/// Region reference data
#[async_trait]
pub trait RegionStore: Send + Sync {
    /// Active regions ordered by name
    async fn find_all(&self) -> StoreResult<Vec<Region>>;

    /// Region by id, active or not
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Region>>;

    /// Active region by country code, compared uppercase
    async fn find_by_code(&self, code: &str) -> StoreResult<Option<Region>>;

    /// Store a new region and return its id
    async fn insert(&self, region: &Region) -> StoreResult<i64>;

    /// Soft-delete a region; false if absent
    async fn deactivate(&self, id: i64) -> StoreResult<bool>;

    /// Number of active regions
    async fn count_active(&self) -> StoreResult<u64>;
}

/// Shared article store handle
pub type SharedArticleStore = Arc<dyn ArticleStore>;

/// Shared category store handle
pub type SharedCategoryStore = Arc<dyn CategoryStore>;

/// Shared region store handle
pub type SharedRegionStore = Arc<dyn RegionStore>;

// ============================================================================
// Mock Implementation (for testing)
// ============================================================================

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Newest first, ties by ascending id
fn sort_recent(articles: &mut [Article]) {
    articles.sort_by(|a, b| {
        b.published_at
            .cmp(&a.published_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

fn contains_ignore_ascii_case(haystack: &str, needle: &str) -> bool {
    haystack
        .to_ascii_lowercase()
        .contains(&needle.to_ascii_lowercase())
}

/// In-memory article store
///
/// Useful for testing without database dependencies.
pub struct MockArticleStore {
    articles: RwLock<HashMap<ArticleId, Article>>,
    next_id: AtomicI64,
}

impl MockArticleStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            articles: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Number of stored articles
    pub fn len(&self) -> usize {
        read(&self.articles).len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        read(&self.articles).is_empty()
    }

    fn select<F>(&self, filter: NewsFilter, limit: usize, pred: F) -> Vec<Article>
    where
        F: Fn(&Article) -> bool,
    {
        let mut hits: Vec<Article> = read(&self.articles)
            .values()
            .filter(|a| filter.matches(a) && pred(a))
            .cloned()
            .collect();
        sort_recent(&mut hits);
        hits.truncate(limit);
        hits
    }
}

impl Default for MockArticleStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArticleStore for MockArticleStore {
    async fn find_latest(&self, filter: NewsFilter, limit: usize) -> StoreResult<Vec<Article>> {
        Ok(self.select(filter, limit, |_| true))
    }

    async fn find_trending(
        &self,
        filter: NewsFilter,
        limit: usize,
    ) -> StoreResult<Vec<Article>> {
        Ok(self.select(filter, limit, |a| a.trending))
    }

    async fn search(
        &self,
        keyword: &str,
        filter: NewsFilter,
        limit: usize,
    ) -> StoreResult<Vec<Article>> {
        Ok(self.select(filter, limit, |a| {
            contains_ignore_ascii_case(&a.title, keyword)
                || a.description
                    .as_deref()
                    .is_some_and(|d| contains_ignore_ascii_case(d, keyword))
        }))
    }

    async fn find_by_url(&self, url: &str) -> StoreResult<Option<Article>> {
        Ok(read(&self.articles).values().find(|a| a.url == url).cloned())
    }

    async fn find_by_id(&self, id: ArticleId) -> StoreResult<Option<Article>> {
        Ok(read(&self.articles).get(&id).cloned())
    }

    async fn insert(&self, article: &Article) -> StoreResult<ArticleId> {
        let mut articles = write(&self.articles);
        if articles.values().any(|a| a.url == article.url) {
            return Err(StoreError::Duplicate(article.url.clone()));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut stored = article.clone();
        stored.id = id;
        articles.insert(id, stored);
        Ok(id)
    }

    async fn update(&self, article: &Article) -> StoreResult<bool> {
        let mut articles = write(&self.articles);
        if articles
            .values()
            .any(|a| a.url == article.url && a.id != article.id)
        {
            return Err(StoreError::Duplicate(article.url.clone()));
        }

        match articles.get_mut(&article.id) {
            Some(stored) => {
                *stored = article.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn increment_view_count(&self, id: ArticleId) -> StoreResult<bool> {
        Ok(write(&self.articles)
            .get_mut(&id)
            .map(|a| a.view_count += 1)
            .is_some())
    }

    async fn set_trending(&self, id: ArticleId, trending: bool) -> StoreResult<bool> {
        Ok(write(&self.articles)
            .get_mut(&id)
            .map(|a| a.trending = trending)
            .is_some())
    }

    async fn count_total(&self) -> StoreResult<u64> {
        Ok(read(&self.articles).len() as u64)
    }

    async fn count_trending(&self) -> StoreResult<u64> {
        Ok(read(&self.articles).values().filter(|a| a.trending).count() as u64)
    }

    async fn count_recent(&self, since: DateTime<Utc>) -> StoreResult<u64> {
        Ok(read(&self.articles)
            .values()
            .filter(|a| a.published_at >= since)
            .count() as u64)
    }

    async fn total_views(&self) -> StoreResult<u64> {
        Ok(read(&self.articles).values().map(|a| a.view_count).sum())
    }
}

/// In-memory category store
#[derive(Default)]
pub struct MockCategoryStore {
    categories: RwLock<Vec<Category>>,
    next_id: AtomicI64,
}

impl MockCategoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CategoryStore for MockCategoryStore {
    async fn find_all(&self) -> StoreResult<Vec<Category>> {
        let mut active: Vec<Category> = read(&self.categories)
            .iter()
            .filter(|c| c.active)
            .cloned()
            .collect();
        active.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        Ok(active)
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Category>> {
        Ok(read(&self.categories).iter().find(|c| c.id == id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> StoreResult<Option<Category>> {
        let name = Category::normalize_name(name);
        Ok(read(&self.categories)
            .iter()
            .find(|c| c.active && c.name == name)
            .cloned())
    }

    async fn insert(&self, category: &Category) -> StoreResult<i64> {
        let name = Category::normalize_name(&category.name);
        let mut categories = write(&self.categories);
        if categories.iter().any(|c| c.name == name) {
            return Err(StoreError::Duplicate(name));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        categories.push(Category {
            id,
            name,
            ..category.clone()
        });
        Ok(id)
    }

    async fn deactivate(&self, id: i64) -> StoreResult<bool> {
        Ok(write(&self.categories)
            .iter_mut()
            .find(|c| c.id == id)
            .map(|c| c.active = false)
            .is_some())
    }

    async fn count_active(&self) -> StoreResult<u64> {
        Ok(read(&self.categories).iter().filter(|c| c.active).count() as u64)
    }
}

/// In-memory region store
#[derive(Default)]
pub struct MockRegionStore {
    regions: RwLock<Vec<Region>>,
    next_id: AtomicI64,
}

impl MockRegionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RegionStore for MockRegionStore {
    async fn find_all(&self) -> StoreResult<Vec<Region>> {
        let mut active: Vec<Region> = read(&self.regions)
            .iter()
            .filter(|r| r.active)
            .cloned()
            .collect();
        active.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(active)
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Region>> {
        Ok(read(&self.regions).iter().find(|r| r.id == id).cloned())
    }

    async fn find_by_code(&self, code: &str) -> StoreResult<Option<Region>> {
        let code = Region::normalize_code(code);
        Ok(read(&self.regions)
            .iter()
            .find(|r| r.active && r.country_code == code)
            .cloned())
    }

    async fn insert(&self, region: &Region) -> StoreResult<i64> {
        let code = Region::normalize_code(&region.country_code);
        let mut regions = write(&self.regions);
        if regions.iter().any(|r| r.country_code == code) {
            return Err(StoreError::Duplicate(code));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        regions.push(Region {
            id,
            country_code: code,
            ..region.clone()
        });
        Ok(id)
    }

    async fn deactivate(&self, id: i64) -> StoreResult<bool> {
        Ok(write(&self.regions)
            .iter_mut()
            .find(|r| r.id == id)
            .map(|r| r.active = false)
            .is_some())
    }

    async fn count_active(&self) -> StoreResult<u64> {
        Ok(read(&self.regions).iter().filter(|r| r.active).count() as u64)
    }
}

// ============================================================================
// Tests
// ============================================================================
