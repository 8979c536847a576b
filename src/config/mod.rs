//! Configuration management for flashnews
//!
//! This module handles loading and validating configuration from environment variables,
//! files, and command-line arguments.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Backing store and pool configuration
    pub database: DatabaseConfig,

    /// External news provider configuration
    pub news_api: NewsApiConfig,

    /// Read-through cache behaviour
    pub service: ServiceConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Database and connection pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database path
    pub path: PathBuf,

    /// Handles opened when the pool initializes
    pub initial_pool_size: usize,

    /// Maximum idle handles kept by the pool
    pub max_pool_size: usize,

    /// Seconds to wait for an idle handle before opening a new one
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/flashnews.db"),
            initial_pool_size: 5,
            max_pool_size: 20,
            acquire_timeout_secs: 10,
        }
    }
}

impl DatabaseConfig {
    /// Get acquire timeout as Duration
    #[must_use]
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

/// External news provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsApiConfig {
    /// Provider base URL
    pub base_url: String,

    /// API key; an empty key disables fetching
    pub api_key: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Rate limit (requests per second)
    pub requests_per_second: u32,

    /// Article language requested from the provider
    pub language: String,

    /// User agent string
    pub user_agent: String,
}

impl Default for NewsApiConfig {
    fn default() -> Self {
        Self {
            base_url: String::from("https://newsapi.org/v2"),
            api_key: String::new(),
            timeout_secs: 30,
            requests_per_second: 2,
            language: String::from("en"),
            user_agent: format!("FlashNews/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl NewsApiConfig {
    /// Get request timeout as Duration
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Read-through cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Result count used when a caller has no preference
    pub default_limit: usize,

    /// Upper bound every requested limit is clamped to
    pub max_limit: usize,

    /// Fetch ceiling used by an explicit refresh
    pub refresh_limit: usize,

    /// Share of a refresh ceiling marked trending, in fetch order
    pub trending_ratio: f64,

    /// Background workers applying view-count increments
    pub view_workers: usize,

    /// Pending view-count increments before new ones are dropped
    pub view_queue_capacity: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 100,
            refresh_limit: 100,
            trending_ratio: 0.3,
            view_workers: 5,
            view_queue_capacity: 1024,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let database = DatabaseConfig {
            path: std::env::var("FLASHNEWS_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database.path),
            initial_pool_size: env_parse("FLASHNEWS_POOL_INITIAL")
                .unwrap_or(defaults.database.initial_pool_size),
            max_pool_size: env_parse("FLASHNEWS_POOL_MAX")
                .unwrap_or(defaults.database.max_pool_size),
            acquire_timeout_secs: env_parse("FLASHNEWS_POOL_TIMEOUT")
                .unwrap_or(defaults.database.acquire_timeout_secs),
        };

        let news_api = NewsApiConfig {
            base_url: std::env::var("NEWS_API_URL").unwrap_or(defaults.news_api.base_url),
            api_key: std::env::var("NEWS_API_KEY").unwrap_or_default(),
            timeout_secs: env_parse("NEWS_API_TIMEOUT").unwrap_or(defaults.news_api.timeout_secs),
            requests_per_second: env_parse("NEWS_API_RATE_LIMIT")
                .unwrap_or(defaults.news_api.requests_per_second),
            language: std::env::var("NEWS_API_LANGUAGE").unwrap_or(defaults.news_api.language),
            user_agent: std::env::var("FLASHNEWS_USER_AGENT")
                .unwrap_or(defaults.news_api.user_agent),
        };

        let service = ServiceConfig {
            default_limit: env_parse("FLASHNEWS_DEFAULT_LIMIT")
                .unwrap_or(defaults.service.default_limit),
            max_limit: env_parse("FLASHNEWS_MAX_LIMIT").unwrap_or(defaults.service.max_limit),
            refresh_limit: env_parse("FLASHNEWS_REFRESH_LIMIT")
                .unwrap_or(defaults.service.refresh_limit),
            view_workers: env_parse("FLASHNEWS_VIEW_WORKERS")
                .unwrap_or(defaults.service.view_workers),
            ..defaults.service
        };

        let logging = LoggingConfig {
            level: std::env::var("FLASHNEWS_LOG_LEVEL").unwrap_or(defaults.logging.level),
            format: std::env::var("FLASHNEWS_LOG_FORMAT").unwrap_or(defaults.logging.format),
        };

        Ok(Self {
            database,
            news_api,
            service,
            logging,
        })
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.database.max_pool_size == 0 {
            anyhow::bail!("max_pool_size must be greater than 0");
        }

        if self.database.initial_pool_size > self.database.max_pool_size {
            anyhow::bail!("initial_pool_size must not exceed max_pool_size");
        }

        if self.service.max_limit == 0 {
            anyhow::bail!("max_limit must be greater than 0");
        }

        if self.service.default_limit == 0 || self.service.default_limit > self.service.max_limit {
            anyhow::bail!("default_limit must be within 1..=max_limit");
        }

        if !(0.0..=1.0).contains(&self.service.trending_ratio) {
            anyhow::bail!("trending_ratio must be within 0.0..=1.0");
        }

        if self.service.view_workers == 0 || self.service.view_queue_capacity == 0 {
            anyhow::bail!("view_workers and view_queue_capacity must be greater than 0");
        }

        if self.news_api.requests_per_second == 0 {
            anyhow::bail!("requests_per_second must be greater than 0");
        }

        Ok(())
    }
}
