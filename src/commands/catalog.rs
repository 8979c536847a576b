use anyhow::{Context, Result};

use flashnews::metrics;
use flashnews::storage::seed;

use super::AppContext;

pub async fn stats(app: &AppContext, show_metrics: bool, json: bool) -> Result<()> {
    let stats = app.news.statistics().await.context("Failed to read statistics")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("Cache statistics");
        println!("================================");
        for (key, value) in stats.to_map() {
            println!("  {key:<18} {value}");
        }

        if let Some(pool) = app.storage.pool_status() {
            println!();
            println!("Connection pool");
            println!("  idle               {}/{}", pool.idle, pool.max_size);
            println!("  created            {}", pool.created);
            println!("  replaced           {}", pool.replaced);
            println!("  acquire timeouts   {}", pool.timeouts);
        }
    }

    if show_metrics {
        let text = metrics::encode_metrics().map_err(|e| anyhow::anyhow!("{e}"))?;
        println!("{text}");
    }

    Ok(())
}

pub async fn categories(app: &AppContext, json: bool) -> Result<()> {
    let categories = app.news.categories().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&categories)?);
        return Ok(());
    }

    for category in &categories {
        println!(
            "{:>3}  {:<15} {}",
            category.id,
            category.name,
            category.description.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

pub async fn regions(app: &AppContext, json: bool) -> Result<()> {
    let regions = app.news.regions().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&regions)?);
        return Ok(());
    }

    for region in &regions {
        println!(
            "{:>3}  {}  {:<16} {}",
            region.id,
            region.country_code,
            region.name,
            region.timezone.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

pub async fn seed(app: &AppContext) -> Result<()> {
    let storage = &app.storage;
    let inserted = seed::seed_demo_articles(
        storage.articles.as_ref(),
        storage.categories.as_ref(),
        storage.regions.as_ref(),
    )
    .await
    .context("Failed to insert demo articles")?;

    println!("Inserted {inserted} demo articles");
    Ok(())
}
