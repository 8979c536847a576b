//! NewsAPI-style HTTP provider
//!
//! Requests `/top-headlines` when a category hint is given and
//! `/everything?q=news` otherwise, one attempt per call, paced by a
//! `governor` rate limiter.

use std::num::NonZeroU32;

use async_trait::async_trait;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use url::Url;

use super::NewsFetcher;
use crate::config::NewsApiConfig;
use crate::models::RawArticle;
use crate::utils::error::FetchError;

/// Largest page the provider serves
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    articles: Vec<ApiArticle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiArticle {
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    url_to_image: Option<String>,
    published_at: Option<String>,
    content: Option<String>,
    source: Option<ApiSource>,
}

#[derive(Debug, Deserialize)]
struct ApiSource {
    name: Option<String>,
    url: Option<String>,
}

impl ApiArticle {
    fn into_raw(self) -> Option<RawArticle> {
        let (source_name, source_url) = self
            .source
            .map(|s| (s.name, s.url))
            .unwrap_or_default();

        match RawArticle::validated(self.title.as_deref(), self.url.as_deref()) {
            Ok(raw) => Some(
                raw.with_details(
                    self.description.as_deref(),
                    self.content.as_deref(),
                    self.url_to_image.as_deref(),
                )
                .with_source(source_name.as_deref(), source_url.as_deref())
                .with_published_at(self.published_at.as_deref()),
            ),
            Err(e) => {
                tracing::debug!(error = %e, url = ?self.url, "Discarding fetched item");
                None
            }
        }
    }
}

/// HTTP client for a NewsAPI-compatible provider
pub struct NewsApiClient {
    /// HTTP client with configured timeout and compression
    client: Client,

    /// Rate limiter to control request frequency
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,

    base_url: String,
    api_key: String,
    language: String,
}

impl NewsApiClient {
    /// Create a client from the provider configuration
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created and
    /// `FetchError::InvalidUrl` if the base URL does not parse.
    pub fn new(config: &NewsApiConfig) -> Result<Self, FetchError> {
        Url::parse(&config.base_url)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {e}", config.base_url)))?;

        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .gzip(true)
            .build()?;

        let rate = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(rate));

        Ok(Self {
            client,
            rate_limiter,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.trim().to_string(),
            language: config.language.clone(),
        })
    }

    /// Whether an API key is configured
    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Build the request URL for one fetch
    pub fn request_url(
        &self,
        category: Option<&str>,
        region: Option<&str>,
        limit: usize,
    ) -> Result<Url, FetchError> {
        let category = category.map(str::trim).filter(|c| !c.is_empty());
        let endpoint = if category.is_some() {
            "top-headlines"
        } else {
            "everything"
        };

        let mut url = Url::parse(&format!("{}/{endpoint}", self.base_url))
            .map_err(|e| FetchError::InvalidUrl(e.to_string()))?;

        {
            let mut query = url.query_pairs_mut();
            match category {
                Some(c) => query.append_pair("category", c),
                None => query.append_pair("q", "news"),
            };
            if let Some(r) = region.map(str::trim).filter(|r| !r.is_empty()) {
                query.append_pair("country", &r.to_lowercase());
            }
            query
                .append_pair("pageSize", &limit.min(MAX_PAGE_SIZE).to_string())
                .append_pair("sortBy", "publishedAt")
                .append_pair("language", &self.language)
                .append_pair("apiKey", &self.api_key);
        }

        Ok(url)
    }

    fn masked(&self, url: &Url) -> String {
        if self.api_key.is_empty() {
            return url.to_string();
        }
        url.as_str().replace(&self.api_key, "***")
    }

    /// Issue a one-item request; true if the provider returned anything
    pub async fn health_check(&self) -> bool {
        match self.fetch(None, None, 1).await {
            Ok(items) => !items.is_empty(),
            Err(e) => {
                tracing::warn!(error = %e, "News provider health check failed");
                false
            }
        }
    }
}

#[async_trait]
impl NewsFetcher for NewsApiClient {
    async fn fetch(
        &self,
        category: Option<&str>,
        region: Option<&str>,
        limit: usize,
    ) -> Result<Vec<RawArticle>, FetchError> {
        if !self.has_api_key() {
            tracing::warn!("News API key not configured, returning no articles");
            return Ok(Vec::new());
        }

        let url = self.request_url(category, region, limit)?;

        // Wait for rate limiter
        self.rate_limiter.until_ready().await;

        tracing::info!(url = %self.masked(&url), "Fetching news from provider");

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Http(e)
            }
        })?;

        let status = response.status();
        if status != StatusCode::OK {
            tracing::error!(status = status.as_u16(), "News provider request failed");
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let parsed: ApiResponse =
            serde_json::from_str(&body).map_err(|e| FetchError::Decode(e.to_string()))?;

        let received = parsed.articles.len();
        let articles: Vec<RawArticle> = parsed
            .articles
            .into_iter()
            .filter_map(ApiArticle::into_raw)
            .collect();

        tracing::info!(
            received,
            accepted = articles.len(),
            "Fetched articles from provider"
        );
        Ok(articles)
    }
}
