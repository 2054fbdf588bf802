//! Detail fetch + field extraction for every pending link.
//!
//! Units run concurrently. They share one browser page, so the pacing delay
//! and the detail fetch happen under a lock; the extraction calls overlap.

use futures::future::join_all;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::cache::CacheStore;
use crate::scrape::{detail::fetch_detail_text, pause, DetailConfig};
use crate::traits::{browser::BrowserPage, extractor::FieldExtractor};
use crate::types::{link::LinkInfo, record::CacheRecord};

/// Error marker for postings whose page yielded no text.
pub const DETAIL_FETCH_FAILED: &str = "failed to fetch detail page text";

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Sleep before each detail fetch
    pub fetch_pacing: Duration,

    /// Rendered text is cut to this many characters before extraction
    pub max_text_chars: usize,

    pub detail: DetailConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fetch_pacing: Duration::from_secs(1),
            max_text_chars: 20_000,
            detail: DetailConfig::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn with_detail(mut self, detail: DetailConfig) -> Self {
        self.detail = detail;
        self
    }

    pub fn without_delays(mut self) -> Self {
        self.fetch_pacing = Duration::ZERO;
        self.detail = self.detail.without_delays();
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalysisSummary {
    /// Links handed to the orchestrator
    pub attempted: usize,

    /// Error-free records written
    pub analyzed: usize,

    /// Error records written
    pub failed: usize,
}

/// Links that need (re)analysis: not cached, or cached with an error.
/// `force_reload` selects every link.
pub fn select_pending(links: &[LinkInfo], cache: &CacheStore, force_reload: bool) -> Vec<LinkInfo> {
    links
        .iter()
        .filter(|link| {
            force_reload
                || cache
                    .get(&link.link)
                    .map_or(true, CacheRecord::has_error)
        })
        .cloned()
        .collect()
}

/// Analyze `links` and write every result into `cache`, replacing earlier
/// entries for the same link.
pub async fn analyze_links<P, E>(
    page: &mut P,
    extractor: &E,
    links: &[LinkInfo],
    cache: &mut CacheStore,
    config: &AnalysisConfig,
) -> AnalysisSummary
where
    P: BrowserPage + ?Sized,
    E: FieldExtractor + ?Sized,
{
    let mut summary = AnalysisSummary {
        attempted: links.len(),
        ..Default::default()
    };
    if links.is_empty() {
        return summary;
    }

    info!(links = links.len(), "Analyzing job postings");
    let page = Mutex::new(page);
    let records = join_all(links.iter().map(|link| analyze_one(&page, extractor, link, config))).await;

    for record in records {
        if record.has_error() {
            summary.failed += 1;
        } else {
            summary.analyzed += 1;
        }
        cache.insert(record);
    }

    info!(
        analyzed = summary.analyzed,
        failed = summary.failed,
        "Analysis finished"
    );
    summary
}

async fn analyze_one<P, E>(
    page: &Mutex<&mut P>,
    extractor: &E,
    link: &LinkInfo,
    config: &AnalysisConfig,
) -> CacheRecord
where
    P: BrowserPage + ?Sized,
    E: FieldExtractor + ?Sized,
{
    let text = {
        let mut page = page.lock().await;
        pause(config.fetch_pacing).await;
        fetch_detail_text(&mut **page, link, &config.detail).await
    };

    let Some(text) = text else {
        return CacheRecord::failed(&link.title, &link.link, DETAIL_FETCH_FAILED);
    };

    let text = truncate_chars(&text, config.max_text_chars);
    match extractor.extract(text, &link.title, &link.link).await {
        Ok(fields) => {
            info!(url = %link.link, fields = fields.len(), "Posting analyzed");
            CacheRecord::from_extraction(&link.title, &link.link, fields)
        }
        Err(e) => {
            warn!(url = %link.link, error = %e, "Field extraction failed");
            let record = CacheRecord::failed(&link.title, &link.link, e.to_string());
            match e.raw_response() {
                Some(raw) => record.with_raw_response(raw),
                None => record,
            }
        }
    }
}

/// The first `max` characters of `s`.
pub(crate) fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractError;
    use crate::testing::{MockBrowser, MockFieldExtractor, MockPage};
    use crate::types::record::{COMPANY_FIELD, URL_FIELD};
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_select_pending_retries_errors_and_skips_successes() {
        let mut cache = CacheStore::empty("unused.json");
        cache.insert(CacheRecord::new("A", "https://x/1"));
        cache.insert(CacheRecord::failed("B", "https://x/2", "boom"));

        let links = vec![
            LinkInfo::new("A", "https://x/1"),
            LinkInfo::new("B", "https://x/2"),
            LinkInfo::new("C", "https://x/3"),
        ];

        let pending: Vec<_> = select_pending(&links, &cache, false)
            .into_iter()
            .map(|l| l.link)
            .collect();
        assert_eq!(pending, vec!["https://x/2", "https://x/3"]);
        assert_eq!(select_pending(&links, &cache, true).len(), 3);
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("日本語テキスト", 3), "日本語");
        assert_eq!(truncate_chars("short", 100), "short");
    }

    #[tokio::test]
    async fn test_results_overwrite_cache_and_only_successes_count() {
        let dir = TempDir::new().unwrap();
        let mut browser = MockBrowser::new()
            .with_page("https://x/1", MockPage::new().with_body("T1"))
            .with_page("https://x/2", MockPage::new().with_body("T2"));
        let extractor = MockFieldExtractor::new()
            .with_fields("https://x/1", json!({"会社名": "ACME", "URL": "https://x/1"}))
            .with_error(
                "https://x/2",
                ExtractError::Parse {
                    message: "bad".into(),
                    raw: "not json".into(),
                },
            );

        let mut cache = CacheStore::empty(dir.path().join("cache.json"));
        cache.insert(CacheRecord::failed("A", "https://x/1", "old failure"));

        let links = vec![
            LinkInfo::new("A", "https://x/1"),
            LinkInfo::new("B", "https://x/2"),
            LinkInfo::new("C", "https://x/3"),
        ];
        let config = AnalysisConfig::default()
            .with_detail(DetailConfig::default().with_artifact_dir(dir.path()))
            .without_delays();

        let summary = analyze_links(&mut browser, &extractor, &links, &mut cache, &config).await;

        assert_eq!(summary.analyzed, 1);
        assert_eq!(summary.failed, 2);

        let a = cache.get("https://x/1").unwrap();
        assert!(!a.has_error());
        assert_eq!(a.get(COMPANY_FIELD), Some(&json!("ACME")));

        let b = cache.get("https://x/2").unwrap();
        assert!(b.has_error());
        assert_eq!(b.raw_response.as_deref(), Some("not json"));

        let c = cache.get("https://x/3").unwrap();
        assert_eq!(c.error.as_deref(), Some(DETAIL_FETCH_FAILED));
        assert!(c.get(URL_FIELD).is_none());

        // No extraction for a posting without text
        assert_eq!(extractor.calls().len(), 2);
    }
}
