use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, info};

use super::{capture_screenshot, BASE_URL};
use crate::credentials::SiteCredentials;
use crate::error::{ScrapeError, ScrapeResult};
use crate::traits::browser::{BrowserPage, Locator};

const EMAIL_SELECTOR: &str = r#"input[name="email"]"#;
const PASSWORD_SELECTOR: &str = r#"input[name="password"]"#;
const SUBMIT_SELECTOR: &str = r#"button[type="submit"]"#;
const LOGIN_TEXT: &str = "ログイン";

#[derive(Debug, Clone)]
pub struct LoginConfig {
    pub base_url: String,
    pub artifact_dir: PathBuf,
    pub page_load_timeout: Duration,
    pub control_timeout: Duration,
    pub submit_timeout: Duration,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            artifact_dir: PathBuf::from(".cache/artifacts"),
            page_load_timeout: Duration::from_secs(30),
            control_timeout: Duration::from_secs(10),
            submit_timeout: Duration::from_secs(60),
        }
    }
}

impl LoginConfig {
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = dir.into();
        self
    }
}

/// Sign in with email and password.
///
/// The home page may show a login control or the form itself; both are
/// handled. Failure to find the form or to leave it after submitting is
/// fatal and leaves a screenshot behind.
pub async fn login<P>(page: &mut P, credentials: &SiteCredentials, config: &LoginConfig) -> ScrapeResult<()>
where
    P: BrowserPage + ?Sized,
{
    let home = format!("{}/home", config.base_url.trim_end_matches('/'));
    info!(url = %home, "Opening login page");
    page.navigate(&home, config.page_load_timeout).await?;

    let login_control = Locator::css("a, button").with_text(LOGIN_TEXT);
    match page
        .wait_for_visible(&login_control, config.control_timeout)
        .await
    {
        Ok(()) => {
            debug!("Login control found, opening form");
            if let Err(e) = page
                .click_and_wait(&login_control, config.control_timeout)
                .await
            {
                debug!(error = %e, "Login control did not navigate, looking for the form in place");
            }
        }
        Err(e) => {
            debug!(error = %e, "No login control, expecting the form directly");
        }
    }

    if let Err(e) = page
        .wait_for_visible(&Locator::css(EMAIL_SELECTOR), config.control_timeout)
        .await
    {
        error!(error = %e, "Login form did not appear");
        capture_screenshot(page, &config.artifact_dir, "login_form_error.png").await;
        return Err(ScrapeError::Login(format!("login form not found: {e}")));
    }

    page.fill(EMAIL_SELECTOR, &credentials.email, config.control_timeout)
        .await?;
    page.fill(
        PASSWORD_SELECTOR,
        credentials.password.expose(),
        config.control_timeout,
    )
    .await?;

    if let Err(e) = page
        .click_and_wait(&Locator::css(SUBMIT_SELECTOR), config.submit_timeout)
        .await
    {
        error!(error = %e, "No navigation after submitting login form");
        capture_screenshot(page, &config.artifact_dir, "login_navigation_error.png").await;
        return Err(ScrapeError::Login(format!("login did not complete: {e}")));
    }

    info!(email = %credentials.email, "Logged in");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockBrowser, MockBrowserCall};
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> LoginConfig {
        LoginConfig::default()
            .with_base_url("https://jobs.test")
            .with_artifact_dir(dir.path())
    }

    #[tokio::test]
    async fn test_login_fills_form_and_submits() {
        let dir = TempDir::new().unwrap();
        let mut browser = MockBrowser::new()
            .with_visible(r#"input[name="email"]"#)
            .with_clickable(r#"button[type="submit"]"#);

        login(&mut browser, &SiteCredentials::new("me@example.com", "pw"), &config(&dir))
            .await
            .unwrap();

        let calls = browser.calls();
        assert!(calls.contains(&MockBrowserCall::Navigate("https://jobs.test/home".into())));
        assert!(calls.contains(&MockBrowserCall::Fill {
            selector: r#"input[name="email"]"#.into(),
            value: "me@example.com".into(),
        }));
        assert!(calls.contains(&MockBrowserCall::Click(r#"button[type="submit"]"#.into())));
    }

    #[tokio::test]
    async fn test_missing_form_is_fatal_and_captures_screenshot() {
        let dir = TempDir::new().unwrap();
        let mut browser = MockBrowser::new();

        let result = login(&mut browser, &SiteCredentials::new("me@example.com", "pw"), &config(&dir)).await;

        assert!(matches!(result, Err(ScrapeError::Login(_))));
        assert!(browser
            .calls()
            .contains(&MockBrowserCall::Screenshot(dir.path().join("login_form_error.png"))));
    }
}
