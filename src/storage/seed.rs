//! Reference data and demonstration articles

use chrono::{Duration, Utc};

use super::repository::{ArticleStore, CategoryStore, RegionStore, StoreResult};
use crate::models::{Article, Category, Region};
use crate::utils::error::StoreError;

/// Default categories: (name, display name, description)
pub const DEFAULT_CATEGORIES: &[(&str, &str, &str)] = &[
    ("technology", "Technology", "Gadgets, software and the tech industry"),
    ("sports", "Sports", "Scores, transfers and tournaments"),
    ("business", "Business", "Markets, companies and the economy"),
    ("health", "Health", "Medicine, wellness and public health"),
    ("entertainment", "Entertainment", "Film, music and celebrity news"),
    ("science", "Science", "Research, space and the environment"),
    ("politics", "Politics", "Government, elections and policy"),
    ("world", "World", "International affairs"),
];

/// Default regions: (name, 3-letter country code, timezone)
pub const DEFAULT_REGIONS: &[(&str, &str, &str)] = &[
    ("United States", "USA", "America/New_York"),
    ("United Kingdom", "GBR", "Europe/London"),
    ("Canada", "CAN", "America/Toronto"),
    ("Australia", "AUS", "Australia/Sydney"),
    ("India", "IND", "Asia/Kolkata"),
    ("Germany", "DEU", "Europe/Berlin"),
    ("France", "FRA", "Europe/Paris"),
    ("Japan", "JPN", "Asia/Tokyo"),
    ("Brazil", "BRA", "America/Sao_Paulo"),
    ("China", "CHN", "Asia/Shanghai"),
];

/// Demo data is only added while the store holds at most this many articles
pub const DEMO_THRESHOLD: u64 = 20;

struct DemoArticle {
    title: &'static str,
    description: &'static str,
    slug: &'static str,
    source: &'static str,
    source_url: &'static str,
    category: &'static str,
    region: &'static str,
    hours_ago: i64,
}

const DEMO_ARTICLES: &[DemoArticle] = &[
    DemoArticle {
        title: "Revolutionary AI Technology Transforms Healthcare Industry",
        description: "A new diagnostic system reaches accuracy levels that could change how diseases are detected.",
        slug: "ai-healthcare",
        source: "TechNews",
        source_url: "https://technews.com",
        category: "technology",
        region: "USA",
        hours_ago: 2,
    },
    DemoArticle {
        title: "New Quantum Computer Breaks World Record",
        description: "Researchers report calculations running orders of magnitude faster than on classical machines.",
        slug: "quantum-computer",
        source: "Science Daily",
        source_url: "https://sciencedaily.com",
        category: "technology",
        region: "GBR",
        hours_ago: 4,
    },
    DemoArticle {
        title: "Championship Finals Set for This Weekend",
        description: "The top two teams of the season meet in a long-awaited showdown.",
        slug: "championship-finals",
        source: "Sports Central",
        source_url: "https://sportscentral.com",
        category: "sports",
        region: "USA",
        hours_ago: 1,
    },
    DemoArticle {
        title: "Olympic Athlete Breaks World Record",
        description: "A record-setting performance inspires athletes around the globe.",
        slug: "olympic-record",
        source: "Olympic News",
        source_url: "https://olympicnews.com",
        category: "sports",
        region: "CAN",
        hours_ago: 3,
    },
    DemoArticle {
        title: "Stock Market Reaches All-Time High",
        description: "Major indices post strong growth across every sector.",
        slug: "stock-market-high",
        source: "Business Today",
        source_url: "https://businesstoday.com",
        category: "business",
        region: "USA",
        hours_ago: 5,
    },
    DemoArticle {
        title: "New Startup Raises $50 Million in Funding",
        description: "A young company closes its Series A round and plans a global expansion.",
        slug: "startup-funding",
        source: "Venture News",
        source_url: "https://venturenews.com",
        category: "business",
        region: "GBR",
        hours_ago: 7,
    },
    DemoArticle {
        title: "Breakthrough in Cancer Treatment Research",
        description: "Early-stage patients respond well to a newly discovered treatment method.",
        slug: "cancer-treatment",
        source: "Medical News",
        source_url: "https://medicalnews.com",
        category: "health",
        region: "USA",
        hours_ago: 8,
    },
    DemoArticle {
        title: "Blockbuster Movie Breaks Box Office Records",
        description: "The release becomes the highest-grossing film of the year.",
        slug: "box-office-record",
        source: "Entertainment Weekly",
        source_url: "https://entertainmentweekly.com",
        category: "entertainment",
        region: "USA",
        hours_ago: 12,
    },
    DemoArticle {
        title: "Mars Rover Discovers Signs of Ancient Life",
        description: "New samples hold compelling evidence of ancient microbial life.",
        slug: "mars-life-discovery",
        source: "Space News",
        source_url: "https://spacenews.com",
        category: "science",
        region: "USA",
        hours_ago: 16,
    },
    DemoArticle {
        title: "Climate Change Research Shows Urgent Action Needed",
        description: "A new study finds that immediate action is required to avoid lasting environmental damage.",
        slug: "climate-research",
        source: "Environmental News",
        source_url: "https://environmentalnews.com",
        category: "science",
        region: "GBR",
        hours_ago: 18,
    },
    DemoArticle {
        title: "New Legislation Aims to Improve Education System",
        description: "Lawmakers introduce a bill to widen opportunities for students.",
        slug: "education-legislation",
        source: "Political Times",
        source_url: "https://politicaltimes.com",
        category: "politics",
        region: "USA",
        hours_ago: 20,
    },
    DemoArticle {
        title: "Peace Agreement Signed Between Rival Nations",
        description: "Years of negotiation end in a historic agreement and hopes for regional stability.",
        slug: "peace-agreement",
        source: "Global Times",
        source_url: "https://globaltimes.com",
        category: "world",
        region: "CAN",
        hours_ago: 24,
    },
];

/// Insert the default categories and regions, skipping keys already stored.
///
/// Returns the number of (categories, regions) inserted.
pub async fn seed_reference_data(
    categories: &dyn CategoryStore,
    regions: &dyn RegionStore,
) -> StoreResult<(usize, usize)> {
    let mut added_categories = 0;
    for (name, display_name, description) in DEFAULT_CATEGORIES {
        let mut category = Category::new(name, *display_name);
        category.description = Some((*description).to_string());
        match categories.insert(&category).await {
            Ok(_) => added_categories += 1,
            Err(StoreError::Duplicate(_)) => {}
            Err(e) => return Err(e),
        }
    }

    let mut added_regions = 0;
    for (name, code, timezone) in DEFAULT_REGIONS {
        let mut region = Region::new(*name, code);
        region.timezone = Some((*timezone).to_string());
        match regions.insert(&region).await {
            Ok(_) => added_regions += 1,
            Err(StoreError::Duplicate(_)) => {}
            Err(e) => return Err(e),
        }
    }

    tracing::info!(
        categories = added_categories,
        regions = added_regions,
        "Reference data seeded"
    );
    Ok((added_categories, added_regions))
}

/// Insert the demonstration articles unless the store already holds more
/// than [`DEMO_THRESHOLD`] articles. Articles whose URL is stored are skipped.
///
/// Returns the number of articles inserted.
pub async fn seed_demo_articles(
    articles: &dyn ArticleStore,
    categories: &dyn CategoryStore,
    regions: &dyn RegionStore,
) -> StoreResult<usize> {
    let total = articles.count_total().await?;
    if total > DEMO_THRESHOLD {
        tracing::info!(total, "Store already populated, skipping demo articles");
        return Ok(0);
    }

    let now = Utc::now();
    let mut inserted = 0;

    for (i, demo) in DEMO_ARTICLES.iter().enumerate() {
        let url = format!("https://example.com/{}", demo.slug);
        if articles.find_by_url(&url).await?.is_some() {
            continue;
        }

        let mut article = Article::new(demo.title, url);
        article.description = Some(demo.description.to_string());
        article.content = Some(format!(
            "{} The story continues with more details about the topic and what it means next.",
            demo.description
        ));
        article.source_name = Some(demo.source.to_string());
        article.source_url = Some(demo.source_url.to_string());
        article.published_at = now - Duration::hours(demo.hours_ago);
        article.category_id = categories.find_by_name(demo.category).await?.map(|c| c.id);
        article.region_id = regions.find_by_code(demo.region).await?.map(|r| r.id);
        // Deterministic stand-ins for popularity
        article.trending = i % 3 == 0;
        article.view_count = ((i as u64 + 1) * 137) % 1000;

        match articles.insert(&article).await {
            Ok(_) => inserted += 1,
            Err(e) if e.is_unavailable() => return Err(e),
            Err(e) => tracing::debug!(title = demo.title, error = %e, "Skipping demo article"),
        }
    }

    tracing::info!(inserted, "Demo articles seeded");
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewsFilter;
    use crate::storage::repository::{MockArticleStore, MockCategoryStore, MockRegionStore};

    #[tokio::test]
    async fn test_reference_seed_is_idempotent() {
        let categories = MockCategoryStore::new();
        let regions = MockRegionStore::new();

        let first = seed_reference_data(&categories, &regions).await.unwrap();
        assert_eq!(first, (DEFAULT_CATEGORIES.len(), DEFAULT_REGIONS.len()));

        let second = seed_reference_data(&categories, &regions).await.unwrap();
        assert_eq!(second, (0, 0));
        assert_eq!(categories.count_active().await.unwrap(), 8);
        assert_eq!(regions.count_active().await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_demo_articles_link_reference_data() {
        let articles = MockArticleStore::new();
        let categories = MockCategoryStore::new();
        let regions = MockRegionStore::new();
        seed_reference_data(&categories, &regions).await.unwrap();

        let inserted = seed_demo_articles(&articles, &categories, &regions)
            .await
            .unwrap();
        assert_eq!(inserted, DEMO_ARTICLES.len());

        let latest = articles.find_latest(NewsFilter::all(), 50).await.unwrap();
        assert!(latest.iter().all(|a| a.category_id.is_some() && a.region_id.is_some()));

        // Second pass finds every URL already stored
        let again = seed_demo_articles(&articles, &categories, &regions)
            .await
            .unwrap();
        assert_eq!(again, 0);
    }

    #[tokio::test]
    async fn test_demo_articles_skipped_when_populated() {
        let articles = MockArticleStore::new();
        for i in 0..=DEMO_THRESHOLD {
            articles
                .insert(&Article::new(
                    format!("Existing headline {i}"),
                    format!("https://e.com/{i}"),
                ))
                .await
                .unwrap();
        }

        let inserted = seed_demo_articles(&articles, &MockCategoryStore::new(), &MockRegionStore::new())
            .await
            .unwrap();
        assert_eq!(inserted, 0);
    }
}
