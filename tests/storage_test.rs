//! Store behaviour shared by the SQLite and in-memory backends

mod common;

use chrono::{Duration, Utc};
use common::{cached_article, sqlite_storage};
use flashnews::error::StoreError;
use flashnews::models::NewsFilter;
use flashnews::storage::{seed, Storage};
use tempfile::TempDir;

async fn check_articles(storage: &Storage) {
    let store = &storage.articles;

    let old = cached_article(1, 30);
    let mut fresh = cached_article(2, 1);
    fresh.description = Some("Markets rally on 100% growth_rate news".to_string());
    fresh.trending = true;
    let middle = cached_article(3, 5);

    let old_id = store.insert(&old).await.unwrap();
    let fresh_id = store.insert(&fresh).await.unwrap();
    store.insert(&middle).await.unwrap();

    assert!(matches!(
        store.insert(&old).await,
        Err(StoreError::Duplicate(_))
    ));

    let latest = store.find_latest(NewsFilter::all(), 10).await.unwrap();
    let urls: Vec<_> = latest.iter().map(|a| a.url.as_str()).collect();
    assert_eq!(urls, [fresh.url.as_str(), middle.url.as_str(), old.url.as_str()]);

    let limited = store.find_latest(NewsFilter::all(), 2).await.unwrap();
    assert_eq!(limited.len(), 2);

    let trending = store.find_trending(NewsFilter::all(), 10).await.unwrap();
    assert_eq!(trending.len(), 1);
    assert_eq!(trending[0].id, fresh_id);

    // Case-insensitive, wildcards taken literally
    assert_eq!(store.search("MARKETS", NewsFilter::all(), 10).await.unwrap().len(), 1);
    assert_eq!(store.search("100%", NewsFilter::all(), 10).await.unwrap().len(), 1);
    assert_eq!(store.search("growth_rate", NewsFilter::all(), 10).await.unwrap().len(), 1);
    assert!(store.search("1_0", NewsFilter::all(), 10).await.unwrap().is_empty());
    assert_eq!(store.search("headline", NewsFilter::all(), 10).await.unwrap().len(), 3);

    assert!(store.increment_view_count(old_id).await.unwrap());
    assert!(store.increment_view_count(old_id).await.unwrap());
    assert!(!store.increment_view_count(9_999).await.unwrap());
    assert!(store.set_trending(old_id, true).await.unwrap());
    assert!(!store.set_trending(9_999, true).await.unwrap());

    let stored = store.find_by_id(old_id).await.unwrap().unwrap();
    assert_eq!(stored.view_count, 2);
    assert!(stored.trending);
    assert_eq!(stored.published_at.timestamp(), old.published_at.timestamp());

    let by_url = store.find_by_url(&fresh.url).await.unwrap().unwrap();
    assert_eq!(by_url.id, fresh_id);
    assert!(store.find_by_url("https://nowhere.example/x").await.unwrap().is_none());

    let mut edited = stored.clone();
    edited.title = "Edited headline for the oldest story".to_string();
    assert!(store.update(&edited).await.unwrap());
    assert_eq!(
        store.find_by_id(old_id).await.unwrap().unwrap().title,
        edited.title
    );

    edited.url = fresh.url.clone();
    assert!(matches!(
        store.update(&edited).await,
        Err(StoreError::Duplicate(_))
    ));

    assert_eq!(store.count_total().await.unwrap(), 3);
    assert_eq!(store.count_trending().await.unwrap(), 2);
    assert_eq!(
        store.count_recent(Utc::now() - Duration::hours(24)).await.unwrap(),
        2
    );
    assert_eq!(store.total_views().await.unwrap(), 2);
}

async fn check_reference_data(storage: &Storage) {
    let (categories, regions) =
        seed::seed_reference_data(storage.categories.as_ref(), storage.regions.as_ref())
            .await
            .unwrap();
    assert_eq!((categories, regions), (8, 10));

    let again =
        seed::seed_reference_data(storage.categories.as_ref(), storage.regions.as_ref())
            .await
            .unwrap();
    assert_eq!(again, (0, 0));

    let tech = storage
        .categories
        .find_by_name(" Technology ")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(tech.name, "technology");
    assert_eq!(
        storage.categories.find_by_id(tech.id).await.unwrap(),
        Some(tech.clone())
    );

    let usa = storage.regions.find_by_code("usa").await.unwrap().unwrap();
    assert_eq!(usa.country_code, "USA");
    assert_eq!(usa.timezone.as_deref(), Some("America/New_York"));

    assert!(storage.categories.deactivate(tech.id).await.unwrap());
    assert_eq!(storage.categories.count_active().await.unwrap(), 7);
    assert!(storage.categories.find_by_name("technology").await.unwrap().is_none());
    assert!(storage
        .categories
        .find_all()
        .await
        .unwrap()
        .iter()
        .all(|c| c.active));

    assert!(storage.regions.deactivate(usa.id).await.unwrap());
    assert_eq!(storage.regions.count_active().await.unwrap(), 9);
    assert_eq!(storage.regions.find_all().await.unwrap().len(), 9);
}

async fn check_demo_seed(storage: &Storage) {
    seed::seed_reference_data(storage.categories.as_ref(), storage.regions.as_ref())
        .await
        .unwrap();

    let inserted = seed::seed_demo_articles(
        storage.articles.as_ref(),
        storage.categories.as_ref(),
        storage.regions.as_ref(),
    )
    .await
    .unwrap();
    assert!(inserted > 0);

    let again = seed::seed_demo_articles(
        storage.articles.as_ref(),
        storage.categories.as_ref(),
        storage.regions.as_ref(),
    )
    .await
    .unwrap();
    assert_eq!(again, 0);

    let tech = storage
        .categories
        .find_by_name("technology")
        .await
        .unwrap()
        .unwrap();
    let tech_news = storage
        .articles
        .find_latest(NewsFilter::all().category(tech.id), 50)
        .await
        .unwrap();
    assert!(!tech_news.is_empty());
    assert!(tech_news.iter().all(|a| a.category_id == Some(tech.id)));
}

#[tokio::test]
async fn test_article_store_in_memory() {
    check_articles(&Storage::in_memory()).await;
}

#[tokio::test]
async fn test_article_store_sqlite() {
    let dir = TempDir::new().unwrap();
    check_articles(&sqlite_storage(&dir).await).await;
}

#[tokio::test]
async fn test_reference_data_in_memory() {
    check_reference_data(&Storage::in_memory()).await;
}

#[tokio::test]
async fn test_reference_data_sqlite() {
    let dir = TempDir::new().unwrap();
    check_reference_data(&sqlite_storage(&dir).await).await;
}

#[tokio::test]
async fn test_demo_seed_in_memory() {
    check_demo_seed(&Storage::in_memory()).await;
}

#[tokio::test]
async fn test_demo_seed_sqlite() {
    let dir = TempDir::new().unwrap();
    check_demo_seed(&sqlite_storage(&dir).await).await;
}

#[tokio::test]
async fn test_sqlite_data_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let url = {
        let storage = sqlite_storage(&dir).await;
        let article = cached_article(7, 2);
        storage.articles.insert(&article).await.unwrap();
        storage.shutdown();
        article.url
    };

    let reopened = sqlite_storage(&dir).await;
    assert!(reopened.articles.find_by_url(&url).await.unwrap().is_some());
}
