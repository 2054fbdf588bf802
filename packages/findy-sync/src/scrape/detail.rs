//! Rendered text of a single job posting.

use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, warn};

use super::{capture_screenshot, pause, sanitize_file_name};
use crate::error::BrowserError;
use crate::traits::browser::BrowserPage;
use crate::types::link::LinkInfo;

#[derive(Debug, Clone)]
pub struct DetailConfig {
    pub artifact_dir: PathBuf,
    pub navigation_timeout: Duration,
    pub settle: Duration,
    pub body_timeout: Duration,
}

impl Default for DetailConfig {
    fn default() -> Self {
        Self {
            artifact_dir: PathBuf::from(".cache/artifacts"),
            navigation_timeout: Duration::from_secs(90),
            settle: Duration::from_secs(1),
            body_timeout: Duration::from_secs(30),
        }
    }
}

impl DetailConfig {
    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = dir.into();
        self
    }

    pub fn without_delays(mut self) -> Self {
        self.settle = Duration::ZERO;
        self
    }
}

/// Screenshot name for a failed detail page.
pub fn error_screenshot_name(title: &str) -> String {
    let prefix: String = title.chars().take(20).collect();
    format!("error_page_{}.png", sanitize_file_name(&prefix))
}

/// Open `link` and return its body text. Every failure, including an empty
/// body, yields `None` after logging and a screenshot.
pub async fn fetch_detail_text<P>(page: &mut P, link: &LinkInfo, config: &DetailConfig) -> Option<String>
where
    P: BrowserPage + ?Sized,
{
    debug!(url = %link.link, "Opening detail page");

    let loaded = match page.navigate(&link.link, config.navigation_timeout).await {
        Ok(()) => page.wait_until_ready(config.navigation_timeout).await,
        Err(e) => Err(e),
    };
    if let Err(e) = loaded {
        log_failure(link, "load", &e);
        capture(page, link, config).await;
        return None;
    }

    pause(config.settle).await;

    match page.body_text(config.body_timeout).await {
        Ok(text) if !text.trim().is_empty() => {
            debug!(url = %link.link, chars = text.chars().count(), "Detail text extracted");
            Some(text)
        }
        Ok(_) => {
            warn!(url = %link.link, title = %link.title, "Detail page has no text");
            capture(page, link, config).await;
            None
        }
        Err(e) => {
            log_failure(link, "read", &e);
            capture(page, link, config).await;
            None
        }
    }
}

fn log_failure(link: &LinkInfo, stage: &str, e: &BrowserError) {
    if e.is_timeout() {
        warn!(url = %link.link, stage, error = %e, "Detail page timed out");
    } else {
        error!(url = %link.link, stage, error = %e, "Detail page failed");
    }
}

async fn capture<P>(page: &mut P, link: &LinkInfo, config: &DetailConfig)
where
    P: BrowserPage + ?Sized,
{
    capture_screenshot(page, &config.artifact_dir, &error_screenshot_name(&link.title)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockBrowser, MockBrowserCall, MockPage};
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> DetailConfig {
        DetailConfig::default()
            .with_artifact_dir(dir.path())
            .without_delays()
    }

    #[tokio::test]
    async fn test_returns_body_text() {
        let dir = TempDir::new().unwrap();
        let mut browser = MockBrowser::new().with_page("https://x/1", MockPage::new().with_body("T"));

        let text = fetch_detail_text(&mut browser, &LinkInfo::new("A", "https://x/1"), &config(&dir)).await;

        assert_eq!(text.as_deref(), Some("T"));
    }

    #[tokio::test]
    async fn test_blank_body_is_failure_with_screenshot() {
        let dir = TempDir::new().unwrap();
        let mut browser = MockBrowser::new().with_page("https://x/1", MockPage::new().with_body("  \n"));

        let text = fetch_detail_text(&mut browser, &LinkInfo::new("A/B", "https://x/1"), &config(&dir)).await;

        assert!(text.is_none());
        assert!(browser
            .calls()
            .contains(&MockBrowserCall::Screenshot(dir.path().join("error_page_A_B.png"))));
    }

    #[tokio::test]
    async fn test_navigation_timeout_and_failure_both_yield_none() {
        let dir = TempDir::new().unwrap();
        let mut browser = MockBrowser::new()
            .with_navigation_timeout("https://x/1")
            .with_navigation_failure("https://x/2");

        assert!(fetch_detail_text(&mut browser, &LinkInfo::new("A", "https://x/1"), &config(&dir))
            .await
            .is_none());
        assert!(fetch_detail_text(&mut browser, &LinkInfo::new("B", "https://x/2"), &config(&dir))
            .await
            .is_none());
    }

    #[test]
    fn test_error_screenshot_name_truncates_title() {
        let name = error_screenshot_name("株式会社ものすごく長い会社名のバックエンドエンジニア募集");
        assert_eq!(name, "error_page_株式会社ものすごく長い会社名のバックエン.png");
    }
}
