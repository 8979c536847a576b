//! Read-through cache over the article store
//!
//! Reads go to the store first. When a latest/trending read comes back
//! short of the requested limit, a refresh cycle pulls candidates from the
//! external provider, skips URLs already stored, classifies the first share
//! of the batch as trending, and writes the rest through before re-reading.
//!
//! ```text
//!  read ──► store ──► enough? ──yes──────────────────────────► result
//!                        └─no──► fetch ──► dedup by URL ──► insert ──► re-read
//! ```
//!
//! Store failures degrade to empty results and provider failures to zero new
//! articles. Only pool exhaustion ([`Error::Pool`]) reaches the caller.

pub mod mapping;
pub mod views;

pub use mapping::{provider_category, provider_region};
pub use views::ViewCounter;

use chrono::{Duration, Utc};

use crate::config::ServiceConfig;
use crate::error::{Error, Result};
use crate::fetcher::SharedFetcher;
use crate::metrics;
use crate::models::{Article, ArticleId, Category, FeedKind, NewsFilter, NewsStats, Region};
use crate::storage::{
    SharedArticleStore, SharedCategoryStore, SharedRegionStore, Storage, StoreResult,
};
use crate::utils::error::StoreError;

/// Clamp a requested result count into `1..=max`
pub fn clamp_limit(limit: i64, max: usize) -> usize {
    let max = max.max(1);
    usize::try_from(limit).unwrap_or(0).clamp(1, max)
}

/// Number of leading inserts marked trending for a refresh ceiling
pub fn trending_quota(ceiling: usize, ratio: f64) -> usize {
    (ceiling as f64 * ratio).floor() as usize
}

/// Keep pool failures, degrade every other store failure to `T::default()`
fn recover<T: Default>(result: StoreResult<T>, operation: &'static str) -> Result<T> {
    match result {
        Ok(value) => Ok(value),
        Err(StoreError::Unavailable(e)) => {
            tracing::error!(operation, error = %e, "Backing store unavailable");
            Err(Error::Pool(e))
        }
        Err(e) => {
            tracing::warn!(operation, error = %e, "Store access failed, returning empty result");
            Ok(T::default())
        }
    }
}

/// Outcome of one refresh cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct RefreshOutcome {
    inserted: usize,
    duplicates: usize,
    failed: usize,
}

/// Read-through cache engine
pub struct CacheOrchestrator {
    articles: SharedArticleStore,
    categories: SharedCategoryStore,
    regions: SharedRegionStore,
    fetcher: SharedFetcher,
    config: ServiceConfig,
    views: ViewCounter,
}

impl CacheOrchestrator {
    /// Create an orchestrator and start its view-count workers.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(storage: &Storage, fetcher: SharedFetcher, config: ServiceConfig) -> Self {
        let views = ViewCounter::spawn(
            storage.articles.clone(),
            config.view_workers,
            config.view_queue_capacity,
        );

        Self {
            articles: storage.articles.clone(),
            categories: storage.categories.clone(),
            regions: storage.regions.clone(),
            fetcher,
            config,
            views,
        }
    }

    /// Service configuration in use
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn clamp(&self, limit: i64) -> usize {
        clamp_limit(limit, self.config.max_limit)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Most recent articles, refreshing from the provider on a short read
    pub async fn latest(&self, filter: NewsFilter, limit: i64) -> Result<Vec<Article>> {
        let limit = self.clamp(limit);
        tracing::info!(?filter, limit, "Fetching latest news");

        let articles = recover(self.articles.find_latest(filter, limit).await, "find_latest")?;
        if articles.len() >= limit {
            return Ok(articles);
        }

        tracing::info!(
            cached = articles.len(),
            limit,
            "Insufficient cached articles, refreshing"
        );
        self.refresh_cycle(filter, limit, "read-through").await?;
        recover(self.articles.find_latest(filter, limit).await, "find_latest")
    }

    /// Most recent trending articles, refreshing from the provider on a short read
    pub async fn trending(&self, filter: NewsFilter, limit: i64) -> Result<Vec<Article>> {
        let limit = self.clamp(limit);
        tracing::info!(?filter, limit, "Fetching trending news");

        let articles = recover(
            self.articles.find_trending(filter, limit).await,
            "find_trending",
        )?;
        if articles.len() >= limit {
            return Ok(articles);
        }

        tracing::info!(
            cached = articles.len(),
            limit,
            "Insufficient trending articles, refreshing"
        );
        self.refresh_cycle(filter, limit, "read-through").await?;
        recover(
            self.articles.find_trending(filter, limit).await,
            "find_trending",
        )
    }

    /// Articles whose title or description contains `keyword`.
    ///
    /// Only cached articles are searched. A blank keyword returns nothing
    /// without touching the store.
    pub async fn search(
        &self,
        keyword: &str,
        filter: NewsFilter,
        limit: i64,
    ) -> Result<Vec<Article>> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Ok(Vec::new());
        }

        let limit = self.clamp(limit);
        tracing::info!(keyword, ?filter, limit, "Searching news");
        recover(
            self.articles.search(keyword, filter, limit).await,
            "search",
        )
    }

    /// Feed by kind; `Local` reads like `Latest`
    pub async fn by_feed(
        &self,
        kind: FeedKind,
        filter: NewsFilter,
        limit: i64,
    ) -> Result<Vec<Article>> {
        match kind {
            FeedKind::Trending => self.trending(filter, limit).await,
            FeedKind::Latest | FeedKind::Local => self.latest(filter, limit).await,
        }
    }

    /// Article by id. A hit queues a view-count increment without waiting on it.
    pub async fn article_by_id(&self, id: ArticleId) -> Result<Option<Article>> {
        tracing::info!(id, "Fetching article by id");
        let article = recover(self.articles.find_by_id(id).await, "find_by_id")?;
        if article.is_some() {
            self.views.dispatch(id);
        }
        Ok(article)
    }

    /// Article by canonical URL; does not count a view
    pub async fn article_by_url(&self, url: &str) -> Result<Option<Article>> {
        tracing::info!(url, "Fetching article by url");
        recover(self.articles.find_by_url(url).await, "find_by_url")
    }

    /// Active categories
    pub async fn categories(&self) -> Result<Vec<Category>> {
        recover(self.categories.find_all().await, "categories")
    }

    /// Active regions
    pub async fn regions(&self) -> Result<Vec<Region>> {
        recover(self.regions.find_all().await, "regions")
    }

    /// Aggregate counts; a count that cannot be read is reported as zero
    pub async fn statistics(&self) -> Result<NewsStats> {
        let since = Utc::now() - Duration::hours(24);

        Ok(NewsStats {
            total_articles: recover(self.articles.count_total().await, "count_total")?,
            trending_articles: recover(self.articles.count_trending().await, "count_trending")?,
            recent_articles: recover(self.articles.count_recent(since).await, "count_recent")?,
            total_views: recover(self.articles.total_views().await, "total_views")?,
            categories_count: recover(self.categories.count_active().await, "count_categories")?,
            locations_count: recover(self.regions.count_active().await, "count_regions")?,
        })
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Insert a new article or overwrite a stored one.
    ///
    /// Returns the stored article, or `None` if it could not be saved.
    pub async fn save_article(&self, article: &Article) -> Result<Option<Article>> {
        tracing::info!(title = %article.title, "Saving article");

        if article.is_saved() {
            let updated = recover(self.articles.update(article).await, "update")?;
            return Ok(updated.then(|| article.clone()));
        }

        match self.articles.insert(article).await {
            Ok(id) => Ok(Some(Article {
                id,
                ..article.clone()
            })),
            Err(StoreError::Unavailable(e)) => Err(Error::Pool(e)),
            Err(e) => {
                tracing::warn!(url = %article.url, error = %e, "Failed to save article");
                Ok(None)
            }
        }
    }

    /// Add one view and wait for it; false if the article does not exist
    pub async fn increment_view_count(&self, id: ArticleId) -> Result<bool> {
        tracing::debug!(id, "Incrementing view count");
        recover(
            self.articles.increment_view_count(id).await,
            "increment_view_count",
        )
    }

    /// Set or clear the trending flag; false if the article does not exist
    pub async fn set_trending(&self, id: ArticleId, trending: bool) -> Result<bool> {
        tracing::info!(id, trending, "Setting trending status");
        recover(
            self.articles.set_trending(id, trending).await,
            "set_trending",
        )
    }

    // ========================================================================
    // Refresh
    // ========================================================================

    /// Explicit refresh with the configured fetch ceiling.
    ///
    /// Returns the number of newly stored articles; zero is not a failure.
    pub async fn refresh(&self, filter: NewsFilter) -> Result<usize> {
        tracing::info!(?filter, "Refreshing news cache");
        let inserted = self
            .refresh_cycle(filter, self.config.refresh_limit, "explicit")
            .await?;

        let total = recover(self.articles.count_total().await, "count_total")?;
        tracing::info!(inserted, total, "News cache refresh completed");
        Ok(inserted)
    }

    async fn refresh_cycle(
        &self,
        filter: NewsFilter,
        ceiling: usize,
        trigger: &'static str,
    ) -> Result<usize> {
        let category = match filter.category_id {
            Some(id) => recover(self.categories.find_by_id(id).await, "category_by_id")?,
            None => None,
        };
        let region = match filter.region_id {
            Some(id) => recover(self.regions.find_by_id(id).await, "region_by_id")?,
            None => None,
        };

        let category_hint = category.as_ref().and_then(|c| provider_category(&c.name));
        let region_hint = region.as_ref().and_then(|r| provider_region(&r.country_code));

        let candidates = match self
            .fetcher
            .fetch(category_hint, region_hint.as_deref(), ceiling)
            .await
        {
            Ok(candidates) => candidates,
            Err(e) => {
                metrics::record_fetch_failure();
                tracing::warn!(error = %e, "Fetch from news provider failed");
                return Ok(0);
            }
        };

        if candidates.is_empty() {
            tracing::warn!(category = ?category_hint, region = ?region_hint, "No articles fetched");
            metrics::record_refresh(trigger, 0, 0, 0);
            return Ok(0);
        }

        let category_id = match (&category, category_hint) {
            (Some(c), _) => Some(c.id),
            (None, Some(hint)) => {
                recover(self.categories.find_by_name(hint).await, "category_by_name")?
                    .map(|c| c.id)
            }
            (None, None) => None,
        };
        let region_id = match (&region, region_hint.as_deref()) {
            (Some(r), _) => Some(r.id),
            (None, Some(code)) => {
                recover(self.regions.find_by_code(code).await, "region_by_code")?.map(|r| r.id)
            }
            (None, None) => None,
        };

        let quota = trending_quota(ceiling, self.config.trending_ratio);
        let mut outcome = RefreshOutcome::default();

        for raw in candidates {
            match self.articles.find_by_url(&raw.url).await {
                Ok(Some(_)) => {
                    outcome.duplicates += 1;
                    continue;
                }
                Ok(None) => {}
                Err(StoreError::Unavailable(e)) => return Err(Error::Pool(e)),
                Err(e) => {
                    outcome.failed += 1;
                    tracing::debug!(url = %raw.url, error = %e, "Dedup lookup failed, skipping");
                    continue;
                }
            }

            let mut article = Article::from_raw(raw);
            article.category_id = category_id;
            article.region_id = region_id;
            article.trending = outcome.inserted < quota;

            match self.articles.insert(&article).await {
                Ok(_) => outcome.inserted += 1,
                Err(StoreError::Unavailable(e)) => return Err(Error::Pool(e)),
                Err(e) => {
                    outcome.failed += 1;
                    tracing::debug!(title = %article.title, error = %e, "Failed to cache article");
                }
            }
        }

        metrics::record_refresh(trigger, outcome.inserted, outcome.duplicates, outcome.failed);
        tracing::info!(
            trigger,
            inserted = outcome.inserted,
            duplicates = outcome.duplicates,
            failed = outcome.failed,
            "Cached new articles from news provider"
        );
        Ok(outcome.inserted)
    }

    /// Stop the view-count workers after they apply what is queued
    pub async fn shutdown(&self) {
        self.views.shutdown().await;
        tracing::info!("Cache orchestrator shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::MockFetcher;
    use crate::models::RawArticle;
    use std::sync::Arc;

    fn raw(n: usize) -> RawArticle {
        RawArticle::validated(
            Some(format!("Fetched headline number {n}").as_str()),
            Some(format!("https://feed.example/{n}").as_str()),
        )
        .unwrap()
    }

    fn orchestrator(feed: Vec<RawArticle>) -> (CacheOrchestrator, Arc<MockFetcher>, Storage) {
        let storage = Storage::in_memory();
        let fetcher = Arc::new(MockFetcher::with_articles(feed));
        let orch = CacheOrchestrator::new(&storage, fetcher.clone(), ServiceConfig::default());
        (orch, fetcher, storage)
    }

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(-5, 100), 1);
        assert_eq!(clamp_limit(0, 100), 1);
        assert_eq!(clamp_limit(20, 100), 20);
        assert_eq!(clamp_limit(500, 100), 100);
    }

    #[test]
    fn test_trending_quota_floors() {
        assert_eq!(trending_quota(20, 0.3), 6);
        assert_eq!(trending_quota(100, 0.3), 30);
        assert_eq!(trending_quota(25, 0.3), 7);
        assert_eq!(trending_quota(3, 0.3), 0);
    }

    #[tokio::test]
    async fn test_full_cache_skips_fetch() {
        let (orch, fetcher, storage) = orchestrator(vec![raw(99)]);
        for n in 0..3 {
            storage.articles.insert(&Article::from_raw(raw(n))).await.unwrap();
        }

        let articles = orch.latest(NewsFilter::all(), 3).await.unwrap();
        assert_eq!(articles.len(), 3);
        assert!(fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_short_read_refreshes_with_limit_as_ceiling() {
        let (orch, fetcher, _storage) = orchestrator((0..4).map(raw).collect());

        let articles = orch.latest(NewsFilter::all(), 10).await.unwrap();
        assert_eq!(articles.len(), 4);

        let calls = fetcher.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].limit, 10);
        assert_eq!(calls[0].category, None);
        assert_eq!(calls[0].region, None);
    }

    #[tokio::test]
    async fn test_explicit_refresh_uses_refresh_limit() {
        let (orch, fetcher, _storage) = orchestrator((0..5).map(raw).collect());

        assert_eq!(orch.refresh(NewsFilter::all()).await.unwrap(), 5);
        assert_eq!(fetcher.calls()[0].limit, 100);
        assert_eq!(orch.refresh(NewsFilter::all()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_save_article_inserts_then_updates() {
        let (orch, _fetcher, _storage) = orchestrator(Vec::new());

        let saved = orch
            .save_article(&Article::from_raw(raw(1)))
            .await
            .unwrap()
            .unwrap();
        assert!(saved.is_saved());

        let mut edited = saved.clone();
        edited.title = "An edited headline for the article".to_string();
        let updated = orch.save_article(&edited).await.unwrap().unwrap();
        assert_eq!(updated.id, saved.id);

        // Same URL again is a duplicate, not an error
        assert!(orch
            .save_article(&Article::from_raw(raw(1)))
            .await
            .unwrap()
            .is_none());
    }
}
