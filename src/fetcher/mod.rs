//! External news providers
//!
//! The orchestrator asks a [`NewsFetcher`] for candidate articles by
//! provider category and two-letter region code. Items that fail title/URL
//! validation never leave the fetcher.

pub mod newsapi;

pub use newsapi::NewsApiClient;

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::models::RawArticle;
use crate::utils::error::FetchError;

/// Source of candidate articles
#[async_trait]
pub trait NewsFetcher: Send + Sync {
    /// Fetch up to `limit` candidates, newest first.
    ///
    /// `category` is a provider category, `region` a lowercase two-letter
    /// country code. An empty list is a normal outcome.
    async fn fetch(
        &self,
        category: Option<&str>,
        region: Option<&str>,
        limit: usize,
    ) -> Result<Vec<RawArticle>, FetchError>;
}

/// Shared fetcher handle
pub type SharedFetcher = Arc<dyn NewsFetcher>;

/// Arguments of one `fetch` call, as seen by [`MockFetcher`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCall {
    pub category: Option<String>,
    pub region: Option<String>,
    pub limit: usize,
}

/// Fetcher returning a fixed feed (for testing)
///
/// Returns at most `limit` items of the feed, in order, and records every
/// call it receives.
#[derive(Default)]
pub struct MockFetcher {
    feed: Mutex<Vec<RawArticle>>,
    fail: bool,
    calls: Mutex<Vec<FetchCall>>,
}

impl MockFetcher {
    /// Fetcher answering every call with `feed`
    pub fn with_articles(feed: Vec<RawArticle>) -> Self {
        Self {
            feed: Mutex::new(feed),
            ..Self::default()
        }
    }

    /// Fetcher whose every call fails with a provider error
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Replace the feed served from now on
    pub fn set_articles(&self, feed: Vec<RawArticle>) {
        *self.feed.lock().unwrap_or_else(PoisonError::into_inner) = feed;
    }

    /// Calls received so far
    pub fn calls(&self) -> Vec<FetchCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl NewsFetcher for MockFetcher {
    async fn fetch(
        &self,
        category: Option<&str>,
        region: Option<&str>,
        limit: usize,
    ) -> Result<Vec<RawArticle>, FetchError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(FetchCall {
                category: category.map(String::from),
                region: region.map(String::from),
                limit,
            });

        if self.fail {
            return Err(FetchError::Status(503));
        }

        let feed = self.feed.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(feed.iter().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(n: usize) -> RawArticle {
        RawArticle::validated(
            Some(format!("Generated headline number {n}").as_str()),
            Some(format!("https://e.com/{n}").as_str()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_mock_fetcher_honours_limit_and_records_calls() {
        let fetcher = MockFetcher::with_articles((0..5).map(raw).collect());

        let items = fetcher.fetch(Some("sports"), Some("us"), 3).await.unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].url, "https://e.com/0");

        assert_eq!(
            fetcher.calls(),
            vec![FetchCall {
                category: Some("sports".to_string()),
                region: Some("us".to_string()),
                limit: 3,
            }]
        );
    }

    #[tokio::test]
    async fn test_failing_mock_fetcher() {
        let fetcher = MockFetcher::failing();
        assert!(matches!(
            fetcher.fetch(None, None, 10).await,
            Err(FetchError::Status(503))
        ));
        assert_eq!(fetcher.calls().len(), 1);
    }
}
