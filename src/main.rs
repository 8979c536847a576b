use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::AppContext;

#[derive(Parser)]
#[command(
    name = "flashnews",
    version,
    about = "News cache with pooled SQLite storage and read-through refresh",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a TOML config file (defaults to environment variables)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides the config file
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true, default_value = "false")]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the latest articles, refreshing when the cache is short
    Latest {
        /// Category name (e.g. technology)
        #[arg(short, long)]
        category: Option<String>,

        /// Region country code (e.g. USA)
        #[arg(short, long)]
        region: Option<String>,

        /// Number of articles to show
        #[arg(short, long)]
        limit: Option<i64>,

        /// Feed to read (latest, trending, local)
        #[arg(long, default_value = "latest")]
        feed: String,
    },

    /// Show trending articles, refreshing when the cache is short
    Trending {
        /// Category name
        #[arg(short, long)]
        category: Option<String>,

        /// Region country code
        #[arg(short, long)]
        region: Option<String>,

        /// Number of articles to show
        #[arg(short, long)]
        limit: Option<i64>,
    },

    /// Search cached articles by keyword
    Search {
        /// Keyword matched against titles and descriptions
        keyword: String,

        /// Category name
        #[arg(short, long)]
        category: Option<String>,

        /// Region country code
        #[arg(short, long)]
        region: Option<String>,

        /// Number of articles to show
        #[arg(short, long)]
        limit: Option<i64>,
    },

    /// Show one article by id or URL
    Article {
        /// Article id
        #[arg(long, conflicts_with = "url", required_unless_present = "url")]
        id: Option<i64>,

        /// Canonical article URL
        #[arg(long)]
        url: Option<String>,

        /// Mark the article trending (true) or not (false)
        #[arg(long)]
        set_trending: Option<bool>,
    },

    /// Fetch fresh articles from the news provider
    Refresh {
        /// Category name
        #[arg(short, long)]
        category: Option<String>,

        /// Region country code
        #[arg(short, long)]
        region: Option<String>,
    },

    /// Show cache statistics
    Stats {
        /// Also print Prometheus metrics
        #[arg(long, default_value = "false")]
        metrics: bool,
    },

    /// List active categories
    Categories,

    /// List active regions
    Regions,

    /// Insert demonstration articles into a sparse cache
    Seed,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = commands::load_config(cli.config.as_deref())?;
    let log_format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| config.logging.format.clone());
    setup_tracing(&log_format, &config.logging.level, cli.verbose)?;

    if let Err(e) = flashnews::metrics::init_metrics() {
        tracing::warn!(error = %e, "Metrics disabled");
    }

    let app = AppContext::open(config).await?;
    let json = cli.json;

    let result = match cli.command {
        Commands::Latest {
            category,
            region,
            limit,
            feed,
        } => {
            tracing::info!(feed = %feed, category = ?category, region = ?region, "Starting latest command");
            commands::feed(&app, &feed, category.as_deref(), region.as_deref(), limit, json).await
        }
        Commands::Trending {
            category,
            region,
            limit,
        } => {
            commands::feed(&app, "trending", category.as_deref(), region.as_deref(), limit, json)
                .await
        }
        Commands::Search {
            keyword,
            category,
            region,
            limit,
        } => {
            tracing::info!(keyword = %keyword, "Starting search command");
            commands::search(&app, &keyword, category.as_deref(), region.as_deref(), limit, json)
                .await
        }
        Commands::Article {
            id,
            url,
            set_trending,
        } => commands::article(&app, id, url.as_deref(), set_trending, json).await,
        Commands::Refresh { category, region } => {
            tracing::info!(category = ?category, region = ?region, "Starting refresh command");
            commands::refresh(&app, category.as_deref(), region.as_deref()).await
        }
        Commands::Stats { metrics } => commands::stats(&app, metrics, json).await,
        Commands::Categories => commands::categories(&app, json).await,
        Commands::Regions => commands::regions(&app, json).await,
        Commands::Seed => commands::seed(&app).await,
    };

    app.shutdown().await;
    result?;

    tracing::info!("flashnews completed successfully");
    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("flashnews=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("flashnews={level},warn")))
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
