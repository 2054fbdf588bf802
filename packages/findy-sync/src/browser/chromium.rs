//! [`BrowserPage`] driven through the Chrome DevTools Protocol.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{BrowserError, BrowserResult};
use crate::traits::browser::{Anchor, BrowserPage, Locator};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

const POLL_INTERVAL: Duration = Duration::from_millis(200);

fn driver(e: impl std::error::Error + Send + Sync + 'static) -> BrowserError {
    BrowserError::Driver(Box::new(e))
}

/// JS string literal for `s`.
fn js_str(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

/// JS expression: the first visible element matching `locator`, or null.
fn find_visible_js(locator: &Locator) -> String {
    let text = locator
        .has_text
        .as_deref()
        .map_or_else(|| "null".to_string(), js_str);
    format!(
        r#"(() => {{
            const text = {text};
            return Array.from(document.querySelectorAll({selector})).find(el => {{
                const rect = el.getBoundingClientRect();
                const style = window.getComputedStyle(el);
                const visible = rect.width > 0 && rect.height > 0 && style.visibility !== 'hidden';
                const content = el.innerText || el.textContent || '';
                return visible && (text === null || content.includes(text));
            }}) || null;
        }})()"#,
        selector = js_str(&locator.selector),
    )
}

#[derive(Deserialize)]
struct RawAnchor {
    text: Option<String>,
    href: Option<String>,
}

/// One Chromium tab.
pub struct ChromiumPage {
    page: Page,
}

impl ChromiumPage {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    async fn eval<T: DeserializeOwned>(&self, js: String) -> BrowserResult<T> {
        self.page
            .evaluate(js)
            .await
            .map_err(driver)?
            .into_value()
            .map_err(driver)
    }

    /// Evaluate `js` until it yields `true`. Evaluation errors (for example
    /// during a navigation) count as `false`.
    async fn poll(&self, what: &str, js: &str, timeout: Duration) -> BrowserResult<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.eval::<bool>(js.to_string()).await.unwrap_or(false) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(BrowserError::timeout(what, timeout));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn url(&self) -> BrowserResult<String> {
        Ok(self.page.url().await.map_err(driver)?.unwrap_or_default())
    }
}

#[async_trait]
impl BrowserPage for ChromiumPage {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> BrowserResult<()> {
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(BrowserError::timeout(format!("navigation to {url}"), timeout)),
        }
    }

    async fn wait_until_ready(&mut self, timeout: Duration) -> BrowserResult<()> {
        self.poll("document ready", "document.readyState === 'complete'", timeout)
            .await
    }

    async fn current_url(&mut self) -> BrowserResult<String> {
        self.url().await
    }

    async fn anchors(&mut self, selector: &str, timeout: Duration) -> BrowserResult<Vec<Anchor>> {
        let selector_js = js_str(selector);
        self.poll(
            selector,
            &format!("document.querySelectorAll({selector_js}).length > 0"),
            timeout,
        )
        .await?;

        let raw: Vec<RawAnchor> = self
            .eval(format!(
                r#"Array.from(document.querySelectorAll({selector_js})).map(a => ({{
                    text: a.innerText || null,
                    href: a.getAttribute('href')
                }}))"#
            ))
            .await?;

        Ok(raw
            .into_iter()
            .map(|a| Anchor {
                text: a.text,
                href: a.href,
            })
            .collect())
    }

    async fn wait_for_visible(&mut self, locator: &Locator, timeout: Duration) -> BrowserResult<()> {
        let js = format!("{} !== null", find_visible_js(locator));
        self.poll(&locator.selector, &js, timeout).await
    }

    async fn click_and_wait(&mut self, locator: &Locator, timeout: Duration) -> BrowserResult<()> {
        let before = self.url().await?;

        let clicked: bool = self
            .eval(format!(
                "(() => {{ const el = {}; if (!el) return false; el.click(); return true; }})()",
                find_visible_js(locator)
            ))
            .await?;
        if !clicked {
            return Err(BrowserError::timeout(locator.selector.clone(), timeout));
        }

        // Wait for the URL to change, then for the new document to settle
        let deadline = Instant::now() + timeout;
        loop {
            let now = self.url().await.unwrap_or_else(|_| before.clone());
            if now != before {
                debug!(from = %before, to = %now, "Navigation after click");
                break;
            }
            if Instant::now() >= deadline {
                return Err(BrowserError::timeout(
                    format!("navigation after clicking {}", locator.selector),
                    timeout,
                ));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        self.wait_until_ready(remaining.max(POLL_INTERVAL)).await
    }

    async fn fill(&mut self, selector: &str, value: &str, timeout: Duration) -> BrowserResult<()> {
        self.wait_for_visible(&Locator::css(selector), timeout).await?;
        let element = self.page.find_element(selector).await.map_err(driver)?;
        element.click().await.map_err(driver)?;
        element.type_str(value).await.map_err(driver)?;
        Ok(())
    }

    async fn body_text(&mut self, timeout: Duration) -> BrowserResult<String> {
        self.poll("document body", "document.body !== null", timeout)
            .await?;
        self.eval("document.body.innerText || ''".to_string()).await
    }

    async fn screenshot(&mut self, path: &Path) -> BrowserResult<()> {
        self.page
            .save_screenshot(ScreenshotParams::builder().full_page(true).build(), path)
            .await
            .map_err(driver)?;
        Ok(())
    }
}

/// A launched browser with one open tab.
///
/// Call [`close`](Self::close) when done. Dropping an unclosed session
/// closes the browser from a background task.
pub struct BrowserSession {
    browser: Option<Browser>,
    handler: Option<JoinHandle<()>>,
    page: ChromiumPage,
}

impl BrowserSession {
    pub async fn launch(headless: bool) -> BrowserResult<Self> {
        let mut builder = BrowserConfig::builder().arg(format!("--user-agent={USER_AGENT}"));
        if !headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(BrowserError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "Browser handler stopped");
                    break;
                }
            }
        });

        let page = browser.new_page("about:blank").await.map_err(driver)?;
        debug!(headless, "Browser launched");

        Ok(Self {
            browser: Some(browser),
            handler: Some(handler),
            page: ChromiumPage::new(page),
        })
    }

    pub fn page(&mut self) -> &mut ChromiumPage {
        &mut self.page
    }

    pub async fn close(mut self) -> BrowserResult<()> {
        if let Some(mut browser) = self.browser.take() {
            browser.close().await.map_err(driver)?;
            if let Err(e) = browser.wait().await {
                warn!(error = %e, "Browser process did not exit cleanly");
            }
        }
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
        debug!("Browser closed");
        Ok(())
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        let Some(mut browser) = self.browser.take() else {
            return;
        };
        let handler = self.handler.take();

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if let Err(e) = browser.close().await {
                        warn!(error = %e, "Browser cleanup on drop failed");
                    }
                    if let Some(handler) = handler {
                        handler.abort();
                    }
                });
            }
            Err(_) => warn!("No runtime to close browser from drop"),
        }
    }
}
