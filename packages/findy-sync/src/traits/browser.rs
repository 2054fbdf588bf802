//! Browser page capability.

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

use crate::error::BrowserResult;

/// An element query: CSS selector, optionally narrowed to elements whose
/// text contains a substring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    pub selector: String,
    pub has_text: Option<String>,
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            has_text: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.has_text = Some(text.into());
        self
    }
}

/// Raw anchor data as found in the DOM.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Anchor {
    /// Visible text
    pub text: Option<String>,

    /// Value of the `href` attribute, unresolved
    pub href: Option<String>,
}

impl Anchor {
    pub fn new(text: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            href: Some(href.into()),
        }
    }
}

/// One browser tab.
///
/// Every operation takes `&mut self`: the page is an exclusive handle, and
/// callers that share it across tasks must serialize access.
#[async_trait]
pub trait BrowserPage: Send {
    /// Navigate and wait for the document to load.
    async fn navigate(&mut self, url: &str, timeout: Duration) -> BrowserResult<()>;

    /// Wait until the current document reports ready.
    async fn wait_until_ready(&mut self, timeout: Duration) -> BrowserResult<()>;

    async fn current_url(&mut self) -> BrowserResult<String>;

    /// All anchors matching `selector`. Waits up to `timeout` for the first
    /// match; returns a timeout error when none appear.
    async fn anchors(&mut self, selector: &str, timeout: Duration) -> BrowserResult<Vec<Anchor>>;

    /// Wait for a visible element matching `locator`.
    async fn wait_for_visible(&mut self, locator: &Locator, timeout: Duration) -> BrowserResult<()>;

    /// Click the first visible match and wait for the resulting navigation.
    async fn click_and_wait(&mut self, locator: &Locator, timeout: Duration) -> BrowserResult<()>;

    async fn fill(&mut self, selector: &str, value: &str, timeout: Duration) -> BrowserResult<()>;

    /// Rendered text of `<body>`.
    async fn body_text(&mut self, timeout: Duration) -> BrowserResult<String>;

    /// Full-page screenshot.
    async fn screenshot(&mut self, path: &Path) -> BrowserResult<()>;
}
