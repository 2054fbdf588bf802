//! Collect liked Findy postings and analyze them into the local cache.

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use findy_sync::ai::OpenAIFieldExtractor;
use findy_sync::analysis::AnalysisConfig;
use findy_sync::browser::BrowserSession;
use findy_sync::cache::CacheStore;
use findy_sync::config::ScraperConfig;
use findy_sync::pipeline::{scrape_and_analyze, ScrapeOptions};
use findy_sync::scrape::{DetailConfig, LoginConfig};

#[derive(Parser, Debug)]
#[command(name = "findy-scraper")]
#[command(about = "Scrape liked Findy job postings and extract their details")]
struct Args {
    /// Re-analyze every posting, including ones already in the cache
    #[arg(long)]
    force_reload: bool,

    /// Show the browser window
    #[arg(long)]
    no_headless: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,findy_sync=debug,chromiumoxide=warn".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    let args = Args::parse();
    let config = ScraperConfig::from_env().context("Failed to load scraper configuration")?;

    if config.openai_api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY not set, every analysis will be recorded as an error");
    }

    let mut cache = CacheStore::load(&config.cache_path);
    let extractor = OpenAIFieldExtractor::new(config.openai_api_key.as_ref(), &config.openai_model)
        .with_target_fields(config.target_fields.clone());

    let options = ScrapeOptions {
        force_reload: args.force_reload,
        login: LoginConfig::default().with_artifact_dir(&config.artifact_dir),
        analysis: AnalysisConfig::default()
            .with_detail(DetailConfig::default().with_artifact_dir(&config.artifact_dir)),
        ..Default::default()
    };

    tracing::info!(
        model = %config.openai_model,
        fields = extractor.target_fields().len(),
        headless = !args.no_headless,
        "Starting Findy scrape"
    );

    let mut session = BrowserSession::launch(!args.no_headless)
        .await
        .context("Failed to launch browser")?;

    let result = scrape_and_analyze(
        session.page(),
        &extractor,
        &config.credentials,
        &mut cache,
        &options,
    )
    .await;

    if let Err(e) = session.close().await {
        tracing::warn!(error = %e, "Failed to close browser");
    }

    let report = result.context("Scrape failed")?;
    tracing::info!(
        collected = report.collected,
        eligible = report.eligible,
        analyzed = report.analysis.analyzed,
        failed = report.analysis.failed,
        cached = report.cached,
        "Done"
    );

    Ok(())
}
