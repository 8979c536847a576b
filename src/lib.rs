//! flashnews - Pooled news cache with read-through refresh
//!
//! Serves news articles from a local store, topping the store up from an
//! external news provider whenever a read comes back short.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`pool`] - Bounded pool of reusable backing-store handles
//! - [`storage`] - Article, category and region stores (SQLite, in-memory)
//! - [`fetcher`] - External news provider clients
//! - [`orchestrator`] - Read-through cache, refresh cycle and view counting
//! - [`models`] - Core data structures and types
//! - [`config`] - Configuration management and settings
//! - [`metrics`] - Prometheus metrics
//! - [`error`] - Unified error handling
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use flashnews::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let storage = Storage::open_sqlite(&config.database).await?;
//!     let fetcher = Arc::new(NewsApiClient::new(&config.news_api)?);
//!     let news = CacheOrchestrator::new(&storage, fetcher, config.service.clone());
//!
//!     let latest = news.latest(NewsFilter::all(), 20).await?;
//!     println!("{} articles", latest.len());
//!
//!     news.shutdown().await;
//!     storage.shutdown();
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod fetcher;
pub mod metrics;
pub mod models;
pub mod orchestrator;
pub mod pool;
pub mod storage;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, NewsErrorTrait, Result};
    pub use crate::fetcher::{NewsApiClient, NewsFetcher};
    pub use crate::models::{Article, Category, FeedKind, NewsFilter, NewsStats, RawArticle, Region};
    pub use crate::orchestrator::CacheOrchestrator;
    pub use crate::pool::{HandleManager, PoolSettings, ResourcePool, SqlitePool};
    pub use crate::storage::{ArticleStore, CategoryStore, RegionStore, Storage};
}

// Direct re-exports for convenience
pub use models::{Article, Category, NewsFilter, NewsStats, Region};
