// Core data structures for flashnews

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::utils::error::ParseError;
use crate::utils::{is_http_url, non_blank, normalize_whitespace};

/// Store-assigned article identifier
pub type ArticleId = i64;

/// Titles must be longer than this many characters to be kept
pub const MIN_TITLE_CHARS: usize = 10;

/// Cached news article; the URL is its identity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    /// Zero until the article is stored
    pub id: ArticleId,
    pub title: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub url: String,
    pub image_url: Option<String>,
    pub source_name: Option<String>,
    pub source_url: Option<String>,
    pub category_id: Option<i64>,
    pub region_id: Option<i64>,
    pub published_at: DateTime<Utc>,
    pub cached_at: DateTime<Utc>,
    pub trending: bool,
    pub view_count: u64,
}

impl Article {
    /// Create an unsaved article published and cached now
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            title: title.into(),
            description: None,
            content: None,
            url: url.into(),
            image_url: None,
            source_name: None,
            source_url: None,
            category_id: None,
            region_id: None,
            published_at: now,
            cached_at: now,
            trending: false,
            view_count: 0,
        }
    }

    /// Map a validated fetch result into an unsaved article.
    ///
    /// An unparseable timestamp falls back to the current time.
    pub fn from_raw(raw: RawArticle) -> Self {
        let now = Utc::now();
        let published_at = match raw.published_at.as_deref() {
            Some(value) => parse_published_at(value).unwrap_or_else(|e| {
                tracing::debug!(url = %raw.url, error = %e, "Using current time for published_at");
                now
            }),
            None => now,
        };

        Self {
            id: 0,
            title: raw.title,
            description: raw.description,
            content: raw.content,
            url: raw.url,
            image_url: raw.image_url,
            source_name: raw.source_name,
            source_url: raw.source_url,
            category_id: None,
            region_id: None,
            published_at,
            cached_at: now,
            trending: false,
            view_count: 0,
        }
    }

    /// Whether the article has been stored
    pub fn is_saved(&self) -> bool {
        self.id > 0
    }
}

/// Candidate article as returned by an external provider
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RawArticle {
    pub title: String,
    pub description: Option<String>,
    pub url: String,
    pub image_url: Option<String>,
    pub source_name: Option<String>,
    pub source_url: Option<String>,
    /// ISO-8601 timestamp as sent by the provider
    pub published_at: Option<String>,
    pub content: Option<String>,
}

impl RawArticle {
    /// Build a candidate from optional provider fields, rejecting items
    /// without a usable title or URL.
    pub fn validated(title: Option<&str>, url: Option<&str>) -> Result<Self, ParseError> {
        let title = title
            .map(normalize_whitespace)
            .filter(|t| !t.is_empty())
            .ok_or(ParseError::TitleNotFound)?;
        let url = url
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or(ParseError::UrlNotFound)?;

        if title.chars().count() <= MIN_TITLE_CHARS {
            return Err(ParseError::TitleTooShort(title));
        }
        if !is_http_url(url) {
            return Err(ParseError::InvalidUrl(url.to_string()));
        }

        Ok(Self {
            title,
            url: url.to_string(),
            ..Default::default()
        })
    }

    /// Set the optional text fields, dropping blank values
    #[must_use]
    pub fn with_details(
        mut self,
        description: Option<&str>,
        content: Option<&str>,
        image_url: Option<&str>,
    ) -> Self {
        self.description = non_blank(description);
        self.content = non_blank(content);
        self.image_url = image_url.map(str::trim).filter(|s| !s.is_empty()).map(String::from);
        self
    }

    /// Set the source attribution
    #[must_use]
    pub fn with_source(mut self, name: Option<&str>, url: Option<&str>) -> Self {
        self.source_name = non_blank(name);
        self.source_url = url.map(str::trim).filter(|s| !s.is_empty()).map(String::from);
        self
    }

    /// Set the raw published timestamp
    #[must_use]
    pub fn with_published_at(mut self, published_at: Option<&str>) -> Self {
        self.published_at = published_at
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from);
        self
    }
}

/// Parse a provider timestamp such as `2025-10-26T06:52:51Z` or
/// `2025-10-26T06:52:51.000Z`. Values without an offset are read as UTC.
pub fn parse_published_at(value: &str) -> Result<DateTime<Utc>, ParseError> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = value.strip_suffix('Z').unwrap_or(value);
    NaiveDateTime::parse_from_str(naive, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|dt| dt.and_utc())
        .map_err(|_| ParseError::InvalidTimestamp(value.to_string()))
}

/// News category; `name` is the lowercase natural key
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Category {
    /// Create an unsaved, active category
    pub fn new(name: &str, display_name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: Self::normalize_name(name),
            display_name: display_name.into(),
            description: None,
            active: true,
            created_at: Utc::now(),
        }
    }

    /// Normalize a category natural key
    pub fn normalize_name(name: &str) -> String {
        name.trim().to_lowercase()
    }
}

/// Geographic region; `country_code` is the uppercase natural key
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub id: i64,
    pub name: String,
    pub country_code: String,
    pub timezone: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Region {
    /// Create an unsaved, active region
    pub fn new(name: impl Into<String>, country_code: &str) -> Self {
        Self {
            id: 0,
            name: name.into(),
            country_code: Self::normalize_code(country_code),
            timezone: None,
            active: true,
            created_at: Utc::now(),
        }
    }

    /// Normalize a region natural key
    pub fn normalize_code(code: &str) -> String {
        code.trim().to_uppercase()
    }
}

/// Optional category/region restriction for reads and refreshes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsFilter {
    pub category_id: Option<i64>,
    pub region_id: Option<i64>,
}

impl NewsFilter {
    /// No restriction
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict to a category
    #[must_use]
    pub fn category(mut self, id: i64) -> Self {
        self.category_id = Some(id);
        self
    }

    /// Restrict to a region
    #[must_use]
    pub fn region(mut self, id: i64) -> Self {
        self.region_id = Some(id);
        self
    }

    /// Whether an article satisfies this filter
    pub fn matches(&self, article: &Article) -> bool {
        self.category_id.map_or(true, |id| article.category_id == Some(id))
            && self.region_id.map_or(true, |id| article.region_id == Some(id))
    }
}

/// Named article feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeedKind {
    Latest,
    Trending,
    /// Region-scoped latest news
    Local,
}

impl FeedKind {
    /// Parse a feed name; blank or unknown names mean `Latest`
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "trending" => Self::Trending,
            "local" => Self::Local,
            _ => Self::Latest,
        }
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Latest => "latest",
            Self::Trending => "trending",
            Self::Local => "local",
        }
    }
}

impl std::fmt::Display for FeedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Aggregate counts over the cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsStats {
    pub total_articles: u64,
    pub trending_articles: u64,
    /// Published within the last 24 hours
    pub recent_articles: u64,
    pub total_views: u64,
    pub categories_count: u64,
    pub locations_count: u64,
}

impl NewsStats {
    /// Flat key/value view of the statistics
    pub fn to_map(&self) -> BTreeMap<&'static str, u64> {
        BTreeMap::from([
            ("totalArticles", self.total_articles),
            ("trendingArticles", self.trending_articles),
            ("recentArticles", self.recent_articles),
            ("totalViews", self.total_views),
            ("categoriesCount", self.categories_count),
            ("locationsCount", self.locations_count),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_published_at_formats() {
        let plain = parse_published_at("2025-10-26T06:52:51Z").unwrap();
        assert_eq!((plain.hour(), plain.minute(), plain.second()), (6, 52, 51));

        let fractional = parse_published_at("2025-10-26T06:52:51.000Z").unwrap();
        assert_eq!(plain, fractional);

        let no_zone = parse_published_at("2025-10-26T06:52:51").unwrap();
        assert_eq!(plain, no_zone);

        let offset = parse_published_at("2025-10-26T08:52:51+02:00").unwrap();
        assert_eq!(plain, offset);
        assert_eq!(offset.year(), 2025);
    }

    #[test]
    fn test_parse_published_at_rejects_garbage() {
        assert!(matches!(
            parse_published_at("yesterday"),
            Err(ParseError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn test_from_raw_falls_back_to_now() {
        let raw = RawArticle::validated(Some("A headline long enough"), Some("https://e.com/a"))
            .unwrap()
            .with_published_at(Some("not a date"));
        let before = Utc::now();
        let article = Article::from_raw(raw);
        assert!(article.published_at >= before);
        assert!(!article.trending);
        assert_eq!(article.view_count, 0);
        assert!(!article.is_saved());
    }

    #[test]
    fn test_validated_rejects_short_title() {
        assert_eq!(
            RawArticle::validated(Some("Ten chars!"), Some("https://e.com/a")),
            Err(ParseError::TitleTooShort("Ten chars!".to_string()))
        );
        assert!(RawArticle::validated(Some("Eleven char"), Some("https://e.com/a")).is_ok());
    }

    #[test]
    fn test_validated_rejects_missing_or_non_http_url() {
        assert_eq!(
            RawArticle::validated(Some("A headline long enough"), None),
            Err(ParseError::UrlNotFound)
        );
        assert!(matches!(
            RawArticle::validated(Some("A headline long enough"), Some("ftp://e.com/a")),
            Err(ParseError::InvalidUrl(_))
        ));
        assert!(matches!(
            RawArticle::validated(Some("A headline long enough"), Some("HTTPS://E.COM/A")),
            Err(ParseError::InvalidUrl(_))
        ));
        assert_eq!(
            RawArticle::validated(None, Some("https://e.com/a")),
            Err(ParseError::TitleNotFound)
        );
    }

    #[test]
    fn test_validated_keeps_malformed_http_url() {
        let raw = RawArticle::validated(
            Some("A headline long enough"),
            Some(" https://e.com/a story?x=1 "),
        )
        .unwrap();
        assert_eq!(raw.url, "https://e.com/a story?x=1");
    }

    #[test]
    fn test_natural_keys_are_normalized() {
        assert_eq!(Category::new("  Technology ", "Tech").name, "technology");
        assert_eq!(Region::new("United States", " usa").country_code, "USA");
    }

    #[test]
    fn test_feed_kind_parse() {
        assert_eq!(FeedKind::parse("TRENDING"), FeedKind::Trending);
        assert_eq!(FeedKind::parse("local"), FeedKind::Local);
        assert_eq!(FeedKind::parse(""), FeedKind::Latest);
        assert_eq!(FeedKind::parse("whatever"), FeedKind::Latest);
    }

    #[test]
    fn test_filter_matches() {
        let mut article = Article::new("Some long headline", "https://e.com/1");
        article.category_id = Some(2);
        assert!(NewsFilter::all().matches(&article));
        assert!(NewsFilter::all().category(2).matches(&article));
        assert!(!NewsFilter::all().category(3).matches(&article));
        assert!(!NewsFilter::all().region(1).matches(&article));
    }

    #[test]
    fn test_stats_serialize_flat_keys() {
        let stats = NewsStats {
            total_articles: 3,
            ..Default::default()
        };
        let json = serde_json::to_value(stats).unwrap();
        for key in [
            "totalArticles",
            "trendingArticles",
            "recentArticles",
            "totalViews",
            "categoriesCount",
            "locationsCount",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert_eq!(stats.to_map()["totalArticles"], 3);
    }
}
