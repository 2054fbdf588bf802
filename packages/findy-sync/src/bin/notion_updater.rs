//! Push cached Findy analyses into a Notion database.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use findy_sync::cache::CacheStore;
use findy_sync::config::UpdaterConfig;
use findy_sync::notion::{NotionDatabaseClient, SyncConfig};
use findy_sync::pipeline::sync_to_notion;
use notion_client::NotionClient;

#[derive(Parser, Debug)]
#[command(name = "notion-updater")]
#[command(about = "Create or update Notion rows from the analysis cache")]
struct Args {
    /// Cache file to read (defaults to FINDY_CACHE_PATH or the shared cache)
    #[arg(long)]
    cache: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,findy_sync=debug,notion_client=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    let args = Args::parse();
    let config = UpdaterConfig::from_env().context("Failed to load updater configuration")?;
    let cache_path = args.cache.unwrap_or(config.cache_path);

    let cache = CacheStore::read(&cache_path)
        .with_context(|| format!("Failed to read cache {}", cache_path.display()))?;
    if cache.is_empty() {
        tracing::warn!(path = %cache_path.display(), "Cache is empty, nothing to sync");
        return Ok(());
    }

    let client = NotionClient::new(config.notion_api_key.expose())
        .context("Failed to create Notion client")?;
    let db = NotionDatabaseClient::new(client, config.database_id);

    let report = sync_to_notion(&db, &cache, &SyncConfig::default())
        .await
        .context("Notion sync failed")?;

    tracing::info!(
        total = report.total(),
        created = report.created,
        updated = report.updated,
        failed = report.failed,
        "Done"
    );

    Ok(())
}
