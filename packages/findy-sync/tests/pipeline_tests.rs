//! Scrape and sync runs against the in-memory browser, extractor and Notion.

use findy_sync::analysis::AnalysisConfig;
use findy_sync::cache::CacheStore;
use findy_sync::credentials::SiteCredentials;
use findy_sync::error::{CacheError, ExtractError};
use findy_sync::notion::SyncConfig;
use findy_sync::pipeline::{scrape_and_analyze, sync_to_notion, ScrapeOptions};
use findy_sync::scrape::{CollectorConfig, DetailConfig, LoginConfig};
use findy_sync::testing::{MockBrowser, MockFieldExtractor, MockNotion, MockPage};
use findy_sync::types::schema::{LiveProperty, LiveSchema, PropertyType};
use findy_sync::{Anchor, CacheRecord, SyncError};
use serde_json::json;
use tempfile::TempDir;

const BASE: &str = "https://jobs.test";

fn options(dir: &TempDir, force_reload: bool) -> ScrapeOptions {
    let artifacts = dir.path().join("artifacts");
    ScrapeOptions {
        force_reload,
        login: LoginConfig::default()
            .with_base_url(BASE)
            .with_artifact_dir(&artifacts),
        collector: CollectorConfig::default().with_base_url(BASE).without_delays(),
        analysis: AnalysisConfig::default()
            .with_detail(DetailConfig::default().with_artifact_dir(&artifacts))
            .without_delays(),
    }
}

fn credentials() -> SiteCredentials {
    SiteCredentials::new("me@example.com", "pw")
}

/// Login form on every page, one listing page with the given anchors.
fn browser_with_listing(anchors: &[(&str, &str)]) -> MockBrowser {
    let listing = anchors
        .iter()
        .fold(MockPage::new(), |page, (text, href)| page.with_anchor(Anchor::new(*text, *href)));

    MockBrowser::new()
        .with_visible(r#"input[name="email"]"#)
        .with_clickable(r#"button[type="submit"]"#)
        .with_page(format!("{BASE}/likes"), listing)
}

/// A database holding only the default title column.
fn fresh_database() -> MockNotion {
    MockNotion::new().with_schema(
        LiveSchema::new().with_property("Name", LiveProperty::new("title", PropertyType::Title)),
    )
}

#[tokio::test]
async fn scraped_posting_is_cached_and_created_in_notion() {
    let dir = TempDir::new().unwrap();
    let cache_path = dir.path().join("jobs.json");
    let link = format!("{BASE}/companies/1/jobs/1");

    let mut browser = browser_with_listing(&[("Backend Engineer", "/companies/1/jobs/1")])
        .with_page(&link, MockPage::new().with_body("T"));
    let extractor = MockFieldExtractor::new().with_fields(&link, json!({ "会社名": "ACME" }));

    let mut cache = CacheStore::load(&cache_path);
    let report = scrape_and_analyze(&mut browser, &extractor, &credentials(), &mut cache, &options(&dir, false))
        .await
        .unwrap();

    assert_eq!(report.collected, 1);
    assert_eq!(report.analysis.analyzed, 1);
    assert_eq!(extractor.calls()[0].text, "T");

    let reloaded = CacheStore::read(&cache_path).unwrap();
    let record = reloaded.get(&link).unwrap();
    assert!(!record.has_error());
    assert_eq!(record.get("会社名"), Some(&json!("ACME")));

    let db = fresh_database();
    let sync = sync_to_notion(&db, &reloaded, &SyncConfig::without_delays())
        .await
        .unwrap();

    assert_eq!(sync.created, 1);
    let created = db.created_pages();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0]["URL"], json!({ "url": link }));
    assert_eq!(
        created[0]["会社名"]["title"][0]["text"]["content"],
        json!("ACME")
    );
    assert!(db.schema().title_property().is_some_and(|(name, _)| name == "会社名"));
}

#[tokio::test]
async fn second_run_skips_cached_postings() {
    let dir = TempDir::new().unwrap();
    let cache_path = dir.path().join("jobs.json");
    let link = format!("{BASE}/companies/1/jobs/1");

    let extractor = MockFieldExtractor::new().with_fields(&link, json!({ "会社名": "ACME" }));

    for expected in [1, 0] {
        let mut browser = browser_with_listing(&[("A", "/companies/1/jobs/1")])
            .with_page(&link, MockPage::new().with_body("T"));
        let mut cache = CacheStore::load(&cache_path);

        let report = scrape_and_analyze(&mut browser, &extractor, &credentials(), &mut cache, &options(&dir, false))
            .await
            .unwrap();

        assert_eq!(report.analysis.analyzed, expected);
        assert_eq!(report.cached, 1);
    }

    assert_eq!(extractor.calls().len(), 1);
}

#[tokio::test]
async fn force_reload_reanalyzes_cached_postings() {
    let dir = TempDir::new().unwrap();
    let cache_path = dir.path().join("jobs.json");
    let link = format!("{BASE}/companies/1/jobs/1");
    let extractor = MockFieldExtractor::new().with_fields(&link, json!({ "会社名": "ACME" }));

    for force_reload in [false, true] {
        let mut browser = browser_with_listing(&[("A", "/companies/1/jobs/1")])
            .with_page(&link, MockPage::new().with_body("T"));
        let mut cache = CacheStore::load(&cache_path);
        scrape_and_analyze(&mut browser, &extractor, &credentials(), &mut cache, &options(&dir, force_reload))
            .await
            .unwrap();
    }

    assert_eq!(extractor.calls().len(), 2);
}

#[tokio::test]
async fn failed_postings_are_retried_on_next_run() {
    let dir = TempDir::new().unwrap();
    let cache_path = dir.path().join("jobs.json");
    let link = format!("{BASE}/companies/1/jobs/1");

    let failing = MockFieldExtractor::new().with_error(&link, ExtractError::Api("rate limited".into()));
    let mut browser = browser_with_listing(&[("A", "/companies/1/jobs/1")])
        .with_page(&link, MockPage::new().with_body("T"));
    let mut cache = CacheStore::load(&cache_path);
    let first = scrape_and_analyze(&mut browser, &failing, &credentials(), &mut cache, &options(&dir, false))
        .await
        .unwrap();
    assert_eq!(first.analysis.failed, 1);
    assert!(CacheStore::read(&cache_path).unwrap().get(&link).unwrap().has_error());

    let working = MockFieldExtractor::new().with_fields(&link, json!({ "会社名": "ACME" }));
    let mut browser = browser_with_listing(&[("A", "/companies/1/jobs/1")])
        .with_page(&link, MockPage::new().with_body("T"));
    let mut cache = CacheStore::load(&cache_path);
    let second = scrape_and_analyze(&mut browser, &working, &credentials(), &mut cache, &options(&dir, false))
        .await
        .unwrap();

    assert_eq!(second.eligible, 1);
    assert_eq!(second.analysis.analyzed, 1);
    assert!(!CacheStore::read(&cache_path).unwrap().get(&link).unwrap().has_error());
}

#[tokio::test]
async fn empty_detail_page_is_recorded_as_error() {
    let dir = TempDir::new().unwrap();
    let link = format!("{BASE}/companies/1/jobs/1");

    let mut browser = browser_with_listing(&[("A", "/companies/1/jobs/1")])
        .with_page(&link, MockPage::new().with_body("   "));
    let extractor = MockFieldExtractor::new().with_fields(&link, json!({ "会社名": "ACME" }));
    let mut cache = CacheStore::empty(dir.path().join("jobs.json"));

    let report = scrape_and_analyze(&mut browser, &extractor, &credentials(), &mut cache, &options(&dir, false))
        .await
        .unwrap();

    assert_eq!(report.analysis.failed, 1);
    assert!(extractor.calls().is_empty());
    assert!(cache.get(&link).unwrap().has_error());
}

#[tokio::test]
async fn postings_are_deduplicated_across_listing_pages() {
    let dir = TempDir::new().unwrap();
    let page_two = format!("{BASE}/likes?page=2");

    let mut browser = MockBrowser::new()
        .with_visible(r#"input[name="email"]"#)
        .with_clickable(r#"button[type="submit"]"#)
        .with_page(
            format!("{BASE}/likes"),
            MockPage::new()
                .with_anchor(Anchor::new("A", "/companies/1/jobs/1"))
                .with_next(&page_two),
        )
        .with_page(
            &page_two,
            MockPage::new()
                .with_anchor(Anchor::new("A again", "/companies/1/jobs/1"))
                .with_anchor(Anchor::new("B", "/companies/2/jobs/2"))
                // Points back at itself: the visited guard ends pagination
                .with_next(&page_two),
        );
    let extractor = MockFieldExtractor::new();
    let mut cache = CacheStore::empty(dir.path().join("jobs.json"));

    let report = scrape_and_analyze(&mut browser, &extractor, &credentials(), &mut cache, &options(&dir, false))
        .await
        .unwrap();

    assert_eq!(report.collected, 2);
    assert_eq!(
        cache.get(&format!("{BASE}/companies/1/jobs/1")).unwrap().origin_title,
        "A again"
    );
}

#[tokio::test]
async fn cache_is_saved_when_login_fails() {
    let dir = TempDir::new().unwrap();
    let cache_path = dir.path().join("jobs.json");

    // No login form anywhere
    let mut browser = MockBrowser::new();
    let extractor = MockFieldExtractor::new();
    let mut cache = CacheStore::empty(&cache_path);

    let result = scrape_and_analyze(&mut browser, &extractor, &credentials(), &mut cache, &options(&dir, false)).await;

    assert!(result.is_err());
    assert!(cache_path.exists());
    assert!(CacheStore::read(&cache_path).unwrap().is_empty());
}

#[tokio::test]
async fn known_posting_is_updated_not_duplicated() {
    let dir = TempDir::new().unwrap();
    let link = format!("{BASE}/companies/1/jobs/1");

    let mut browser = browser_with_listing(&[("A", "/companies/1/jobs/1")])
        .with_page(&link, MockPage::new().with_body("T"));
    let extractor = MockFieldExtractor::new().with_fields(
        &link,
        json!({ "会社名": "ACME", "メモ": "from the model" }),
    );
    let mut cache = CacheStore::empty(dir.path().join("jobs.json"));
    scrape_and_analyze(&mut browser, &extractor, &credentials(), &mut cache, &options(&dir, false))
        .await
        .unwrap();

    let db = fresh_database().with_existing_page(&link, "page-existing");
    let report = sync_to_notion(&db, &cache, &SyncConfig::without_delays())
        .await
        .unwrap();

    assert_eq!(report.updated, 1);
    assert_eq!(report.created, 0);
    let updated = db.updated_pages();
    assert_eq!(updated[0].0, "page-existing");
    assert!(updated[0].1.contains_key("最終更新日時"));
    assert!(!updated[0].1.contains_key("メモ"));
}

#[tokio::test]
async fn sync_is_idempotent_across_runs() {
    let dir = TempDir::new().unwrap();
    let link = format!("{BASE}/companies/1/jobs/1");

    let mut browser = browser_with_listing(&[("A", "/companies/1/jobs/1")])
        .with_page(&link, MockPage::new().with_body("T"));
    let extractor = MockFieldExtractor::new().with_fields(&link, json!({ "会社名": "ACME" }));
    let mut cache = CacheStore::empty(dir.path().join("jobs.json"));
    scrape_and_analyze(&mut browser, &extractor, &credentials(), &mut cache, &options(&dir, false))
        .await
        .unwrap();

    let db = fresh_database();
    let first = sync_to_notion(&db, &cache, &SyncConfig::without_delays()).await.unwrap();
    let second = sync_to_notion(&db, &cache, &SyncConfig::without_delays()).await.unwrap();

    assert_eq!((first.created, first.updated), (1, 0));
    assert_eq!((second.created, second.updated), (0, 1));
    assert_eq!(db.created_pages().len(), 1);
}

#[test]
fn missing_cache_file_is_an_error() {
    let dir = TempDir::new().unwrap();

    let result = CacheStore::read(dir.path().join("missing.json"));

    assert!(matches!(result, Err(CacheError::Io { .. })));
}

#[tokio::test]
async fn rejected_schema_update_aborts_sync() {
    let dir = TempDir::new().unwrap();
    let cache = CacheStore::empty(dir.path().join("jobs.json"));
    let db = fresh_database().failing_schema_update();

    let result = sync_to_notion(&db, &cache, &SyncConfig::without_delays()).await;

    assert!(matches!(result, Err(SyncError::Schema(_))));
    assert!(db.created_pages().is_empty());
}

#[tokio::test]
async fn postings_sharing_a_url_become_one_row() {
    let dir = TempDir::new().unwrap();
    let careers = "https://corp.example/careers";

    let mut cache = CacheStore::empty(dir.path().join("jobs.json"));
    for (title, link) in [("Backend", "/companies/1/jobs/1"), ("Frontend", "/companies/1/jobs/2")] {
        cache.insert(
            CacheRecord::new(title, format!("{BASE}{link}"))
                .with_field("会社名", "ACME")
                .with_field("URL", careers),
        );
    }

    let db = fresh_database();
    let report = sync_to_notion(&db, &cache, &SyncConfig::without_delays())
        .await
        .unwrap();

    assert_eq!((report.created, report.updated), (1, 1));
    assert_eq!(db.created_pages().len(), 1);
}
