//! Listing pagination.

use indexmap::IndexMap;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{pause, BASE_URL, JOB_LINK_SELECTOR, NEXT_PAGE_SELECTOR, NEXT_PAGE_TEXT};
use crate::error::ScrapeResult;
use crate::traits::browser::{BrowserPage, Locator};
use crate::types::link::LinkInfo;

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Origin used to resolve relative hrefs
    pub base_url: String,

    /// First listing page
    pub listing_url: String,

    pub ready_timeout: Duration,
    pub initial_settle: Duration,
    pub page_settle: Duration,
    pub link_timeout: Duration,
    pub next_visible_timeout: Duration,
    pub navigation_timeout: Duration,
    pub navigation_settle: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            listing_url: format!("{BASE_URL}/likes"),
            ready_timeout: Duration::from_secs(30),
            initial_settle: Duration::from_secs(1),
            page_settle: Duration::from_millis(1500),
            link_timeout: Duration::from_secs(15),
            next_visible_timeout: Duration::from_secs(5),
            navigation_timeout: Duration::from_secs(30),
            navigation_settle: Duration::from_secs(1),
        }
    }
}

impl CollectorConfig {
    /// Point the collector at another origin; the listing becomes `{base}/likes`.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self.listing_url = format!("{}/likes", self.base_url.trim_end_matches('/'));
        self
    }

    pub fn with_listing_url(mut self, url: impl Into<String>) -> Self {
        self.listing_url = url.into();
        self
    }

    /// Drop all settle delays, keep the timeouts.
    pub fn without_delays(mut self) -> Self {
        self.initial_settle = Duration::ZERO;
        self.page_settle = Duration::ZERO;
        self.navigation_settle = Duration::ZERO;
        self
    }
}

/// Walk every listing page and return the posting links, deduplicated by
/// link in first-seen order; a later duplicate replaces the earlier title.
///
/// Stops at the last page, when following "next" fails, or when a page URL
/// repeats.
pub async fn collect_links<P>(page: &mut P, config: &CollectorConfig) -> ScrapeResult<Vec<LinkInfo>>
where
    P: BrowserPage + ?Sized,
{
    info!(url = %config.listing_url, "Opening listing");
    page.navigate(&config.listing_url, config.navigation_timeout)
        .await?;
    if let Err(e) = page.wait_until_ready(config.ready_timeout).await {
        warn!(error = %e, "Listing did not report ready, continuing");
    }
    pause(config.initial_settle).await;

    let next = Locator::css(NEXT_PAGE_SELECTOR).with_text(NEXT_PAGE_TEXT);
    let mut visited = HashSet::new();
    let mut links: IndexMap<String, LinkInfo> = IndexMap::new();
    let mut page_number = 1usize;

    loop {
        let url = page.current_url().await?;
        if !visited.insert(url.clone()) {
            warn!(url = %url, page = page_number, "Listing page already visited, stopping pagination");
            break;
        }

        pause(config.page_settle).await;

        match page.anchors(JOB_LINK_SELECTOR, config.link_timeout).await {
            Ok(anchors) => {
                let before = links.len();
                for anchor in anchors {
                    let info = LinkInfo::from_anchor(
                        anchor.text.as_deref(),
                        anchor.href.as_deref(),
                        &config.base_url,
                    );
                    if info.is_sentinel() {
                        debug!(title = %info.title, "Skipping anchor without link");
                        continue;
                    }
                    links.insert(info.link.clone(), info);
                }
                info!(
                    page = page_number,
                    new_links = links.len() - before,
                    total = links.len(),
                    "Collected listing page"
                );
            }
            Err(e) if e.is_timeout() => {
                info!(page = page_number, "No job links on this page");
            }
            Err(e) => {
                warn!(page = page_number, error = %e, "Failed to read job links");
            }
        }

        match page.wait_for_visible(&next, config.next_visible_timeout).await {
            Ok(()) => {}
            Err(e) if e.is_timeout() => {
                info!(page = page_number, "No next page, last listing page reached");
                break;
            }
            Err(e) => {
                warn!(page = page_number, error = %e, "Next page control check failed");
                break;
            }
        }

        if let Err(e) = page.click_and_wait(&next, config.navigation_timeout).await {
            warn!(page = page_number, error = %e, "Failed to open next listing page");
            break;
        }
        pause(config.navigation_settle).await;
        page_number += 1;
    }

    info!(links = links.len(), pages = page_number, "Link collection finished");
    Ok(links.into_values().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockBrowser, MockPage};
    use crate::traits::browser::Anchor;
    use crate::types::link::UNKNOWN_LINK;

    fn config() -> CollectorConfig {
        CollectorConfig::default()
            .with_base_url("https://jobs.test")
            .without_delays()
    }

    #[tokio::test]
    async fn test_follows_pages_and_dedups_last_wins() {
        let mut browser = MockBrowser::new()
            .with_page(
                "https://jobs.test/likes",
                MockPage::new()
                    .with_anchor(Anchor::new("A", "/companies/1/jobs/1"))
                    .with_anchor(Anchor::new("B", "/companies/1/jobs/2"))
                    .with_next("https://jobs.test/likes?page=2"),
            )
            .with_page(
                "https://jobs.test/likes?page=2",
                MockPage::new()
                    .with_anchor(Anchor::new("A (updated)", "/companies/1/jobs/1"))
                    .with_anchor(Anchor::new("C", "https://jobs.test/companies/2/jobs/3")),
            );

        let links = collect_links(&mut browser, &config()).await.unwrap();

        assert_eq!(links.len(), 3);
        assert_eq!(links[0], LinkInfo::new("A (updated)", "https://jobs.test/companies/1/jobs/1"));
        assert_eq!(links[2].link, "https://jobs.test/companies/2/jobs/3");
    }

    #[tokio::test]
    async fn test_empty_page_is_not_fatal() {
        let mut browser = MockBrowser::new()
            .with_page("https://jobs.test/likes", MockPage::new().with_next("https://jobs.test/likes?page=2"))
            .with_page(
                "https://jobs.test/likes?page=2",
                MockPage::new().with_anchor(Anchor::new("A", "/companies/1/jobs/1")),
            );

        let links = collect_links(&mut browser, &config()).await.unwrap();

        assert_eq!(links, vec![LinkInfo::new("A", "https://jobs.test/companies/1/jobs/1")]);
    }

    #[tokio::test]
    async fn test_revisited_page_stops_pagination() {
        let mut browser = MockBrowser::new()
            .with_page(
                "https://jobs.test/likes",
                MockPage::new()
                    .with_anchor(Anchor::new("A", "/companies/1/jobs/1"))
                    .with_next("https://jobs.test/likes?page=2"),
            )
            .with_page(
                "https://jobs.test/likes?page=2",
                MockPage::new()
                    .with_anchor(Anchor::new("B", "/companies/1/jobs/2"))
                    .with_next("https://jobs.test/likes"),
            );

        let links = collect_links(&mut browser, &config()).await.unwrap();

        assert_eq!(links.len(), 2);
    }

    #[tokio::test]
    async fn test_sentinel_links_are_dropped() {
        let mut browser = MockBrowser::new().with_page(
            "https://jobs.test/likes",
            MockPage::new()
                .with_anchor(Anchor {
                    text: Some("no href".into()),
                    href: None,
                })
                .with_anchor(Anchor::new("literal sentinel", UNKNOWN_LINK))
                .with_anchor(Anchor::new("A", "/companies/1/jobs/1")),
        );

        let links = collect_links(&mut browser, &config()).await.unwrap();

        assert_eq!(links.len(), 1);
        assert_eq!(links[0].title, "A");
    }
}
