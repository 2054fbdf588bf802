//! End-to-end runs behind the two binaries.

use tracing::{debug, error, info};

use crate::analysis::{analyze_links, select_pending, AnalysisConfig, AnalysisSummary};
use crate::cache::CacheStore;
use crate::credentials::SiteCredentials;
use crate::error::{ScrapeResult, SyncResult};
use crate::notion::index::fetch_existing_index;
use crate::notion::properties::{desired_schema, URL_PROPERTY};
use crate::notion::schema::reconcile_schema;
use crate::notion::sync::{RecordSyncer, SyncConfig, SyncReport};
use crate::scrape::{collect_links, login, CollectorConfig, LoginConfig};
use crate::traits::{browser::BrowserPage, extractor::FieldExtractor, notion::NotionDatabase};

/// Records logged after a scrape run.
const PREVIEW_RECORDS: usize = 5;

#[derive(Debug, Clone, Default)]
pub struct ScrapeOptions {
    /// Re-analyze every collected link, even successfully cached ones
    pub force_reload: bool,
    pub login: LoginConfig,
    pub collector: CollectorConfig,
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrapeReport {
    pub collected: usize,
    pub eligible: usize,
    pub analysis: AnalysisSummary,
    pub cached: usize,
}

/// Log in, collect liked postings, analyze the pending ones and persist the
/// cache. The cache is written even when the run fails part-way.
pub async fn scrape_and_analyze<P, E>(
    page: &mut P,
    extractor: &E,
    credentials: &SiteCredentials,
    cache: &mut CacheStore,
    options: &ScrapeOptions,
) -> ScrapeResult<ScrapeReport>
where
    P: BrowserPage + ?Sized,
    E: FieldExtractor + ?Sized,
{
    let result = run_scrape(page, extractor, credentials, cache, options).await;

    match (result, cache.persist()) {
        (Ok(mut report), Ok(())) => {
            report.cached = cache.len();
            info!(path = %cache.path().display(), records = cache.len(), "Cache saved");
            for record in cache.records().take(PREVIEW_RECORDS) {
                debug!(record = ?record, "Cached record");
            }
            Ok(report)
        }
        (Ok(_), Err(e)) => {
            error!(error = %e, "Failed to save cache");
            Err(e.into())
        }
        (Err(e), persisted) => {
            if let Err(persist_error) = persisted {
                error!(error = %persist_error, "Failed to save cache after aborted run");
            } else {
                info!(records = cache.len(), "Cache saved after aborted run");
            }
            Err(e)
        }
    }
}

async fn run_scrape<P, E>(
    page: &mut P,
    extractor: &E,
    credentials: &SiteCredentials,
    cache: &mut CacheStore,
    options: &ScrapeOptions,
) -> ScrapeResult<ScrapeReport>
where
    P: BrowserPage + ?Sized,
    E: FieldExtractor + ?Sized,
{
    login(page, credentials, &options.login).await?;

    let links = collect_links(page, &options.collector).await?;
    let pending = select_pending(&links, cache, options.force_reload);
    info!(
        collected = links.len(),
        pending = pending.len(),
        cached = cache.len(),
        force_reload = options.force_reload,
        "Selected postings for analysis"
    );

    let analysis = analyze_links(page, extractor, &pending, cache, &options.analysis).await;
    info!(newly_analyzed = analysis.analyzed, "Scrape finished");

    Ok(ScrapeReport {
        collected: links.len(),
        eligible: pending.len(),
        analysis,
        cached: cache.len(),
    })
}

/// Reconcile the schema, index existing rows and write every cached record.
///
/// Schema or index failures abort before any row is written.
pub async fn sync_to_notion<D>(db: &D, cache: &CacheStore, config: &SyncConfig) -> SyncResult<SyncReport>
where
    D: NotionDatabase + ?Sized,
{
    info!(records = cache.len(), "Starting Notion sync");

    let desired = desired_schema();
    let live = reconcile_schema(db, &desired).await?;
    let index = fetch_existing_index(db, URL_PROPERTY, config.query_pause).await?;

    let mut syncer = RecordSyncer::new(db, &desired, &live, &index).with_config(config.clone());
    Ok(syncer.sync_all(cache.records()).await)
}
