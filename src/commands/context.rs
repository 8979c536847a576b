use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use flashnews::config::Config;
use flashnews::fetcher::NewsApiClient;
use flashnews::models::NewsFilter;
use flashnews::orchestrator::CacheOrchestrator;
use flashnews::storage::{seed, Storage};

/// Load configuration from a TOML file, or from the environment when no
/// file is given
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Everything a command needs: stores, orchestrator and configuration
pub struct AppContext {
    pub config: Config,
    pub storage: Storage,
    pub news: CacheOrchestrator,
}

impl AppContext {
    /// Open the database, seed reference data and start the orchestrator
    pub async fn open(config: Config) -> Result<Self> {
        let storage = Storage::open_sqlite(&config.database)
            .await
            .with_context(|| format!("Failed to open database {}", config.database.path.display()))?;

        seed::seed_reference_data(storage.categories.as_ref(), storage.regions.as_ref())
            .await
            .context("Failed to seed categories and regions")?;

        let fetcher = NewsApiClient::new(&config.news_api)
            .context("Failed to create news provider client")?;
        if !fetcher.has_api_key() {
            tracing::warn!("NEWS_API_KEY not set; refreshes will not fetch new articles");
        }

        let news = CacheOrchestrator::new(&storage, Arc::new(fetcher), config.service.clone());

        Ok(Self {
            config,
            storage,
            news,
        })
    }

    /// Resolve category name and region code arguments to a filter
    pub async fn filter(&self, category: Option<&str>, region: Option<&str>) -> Result<NewsFilter> {
        let mut filter = NewsFilter::all();

        if let Some(name) = category {
            let found = self
                .storage
                .categories
                .find_by_name(name)
                .await?
                .with_context(|| format!("Unknown category: {name}"))?;
            filter = filter.category(found.id);
        }

        if let Some(code) = region {
            let found = self
                .storage
                .regions
                .find_by_code(code)
                .await?
                .with_context(|| format!("Unknown region: {code}"))?;
            filter = filter.region(found.id);
        }

        Ok(filter)
    }

    /// Requested limit, or the configured default
    pub fn limit(&self, requested: Option<i64>) -> i64 {
        requested.unwrap_or(self.config.service.default_limit as i64)
    }

    /// Drain pending view counts, then close pooled connections
    pub async fn shutdown(&self) {
        self.news.shutdown().await;
        self.storage.shutdown();
    }
}
