use anyhow::{Context, Result};

use flashnews::models::{Article, FeedKind};
use flashnews::utils::truncate_text;

use super::AppContext;

pub(crate) fn print_articles(articles: &[Article], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(articles)?);
        return Ok(());
    }

    if articles.is_empty() {
        println!("No articles found.");
        return Ok(());
    }

    for (i, article) in articles.iter().enumerate() {
        let marker = if article.trending { " [trending]" } else { "" };
        println!("{}. {}{marker}", i + 1, article.title);
        println!(
            "   #{} | {} | {} | {} views",
            article.id,
            article.source_name.as_deref().unwrap_or("Unknown"),
            article.published_at.format("%Y-%m-%d %H:%M UTC"),
            article.view_count
        );
        if let Some(description) = &article.description {
            println!("   > {}", truncate_text(description, 150));
        }
        println!("   URL: {}", article.url);
        println!();
    }

    Ok(())
}

pub async fn feed(
    app: &AppContext,
    feed: &str,
    category: Option<&str>,
    region: Option<&str>,
    limit: Option<i64>,
    json: bool,
) -> Result<()> {
    let filter = app.filter(category, region).await?;
    let kind = FeedKind::parse(feed);

    let articles = app
        .news
        .by_feed(kind, filter, app.limit(limit))
        .await
        .with_context(|| format!("Failed to read {kind} feed"))?;

    if !json {
        println!("{} news ({} articles)", kind, articles.len());
        println!("================================");
    }
    print_articles(&articles, json)
}

pub async fn search(
    app: &AppContext,
    keyword: &str,
    category: Option<&str>,
    region: Option<&str>,
    limit: Option<i64>,
    json: bool,
) -> Result<()> {
    let filter = app.filter(category, region).await?;
    let articles = app
        .news
        .search(keyword, filter, app.limit(limit))
        .await
        .context("Search failed")?;

    if !json {
        println!("Searching for: \"{}\"", keyword.trim());
        println!("================================");
    }
    print_articles(&articles, json)
}

pub async fn article(
    app: &AppContext,
    id: Option<i64>,
    url: Option<&str>,
    set_trending: Option<bool>,
    json: bool,
) -> Result<()> {
    let found = match (id, url) {
        (Some(id), _) => app.news.article_by_id(id).await?,
        (None, Some(url)) => app.news.article_by_url(url).await?,
        (None, None) => anyhow::bail!("Either --id or --url is required"),
    };

    let Some(mut article) = found else {
        println!("Article not found.");
        return Ok(());
    };

    if let Some(trending) = set_trending {
        if app.news.set_trending(article.id, trending).await? {
            article.trending = trending;
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&article)?);
        return Ok(());
    }

    println!("{}", article.title);
    println!("================================");
    println!(
        "Source: {} | Published: {}",
        article.source_name.as_deref().unwrap_or("Unknown"),
        article.published_at.to_rfc3339()
    );
    println!("Views: {} | Trending: {}", article.view_count, article.trending);
    if let Some(description) = &article.description {
        println!("\n{description}");
    }
    if let Some(content) = &article.content {
        println!("\n{content}");
    }
    println!("\nURL: {}", article.url);
    Ok(())
}

pub async fn refresh(app: &AppContext, category: Option<&str>, region: Option<&str>) -> Result<()> {
    let filter = app.filter(category, region).await?;
    let inserted = app.news.refresh(filter).await.context("Refresh failed")?;

    println!("Refresh completed: {inserted} new articles cached");
    Ok(())
}
