//! Job-board scraping: login, listing pagination and detail pages.
//!
//! Everything here drives a [`BrowserPage`](crate::traits::browser::BrowserPage)
//! sequentially. Timings live in plain config structs whose `Default` impls
//! carry the production values.

pub mod collector;
pub mod detail;
pub mod login;

use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::traits::browser::BrowserPage;

pub use collector::{collect_links, CollectorConfig};
pub use detail::{fetch_detail_text, DetailConfig};
pub use login::{login, LoginConfig};

/// Job board origin.
pub const BASE_URL: &str = "https://findy-code.io";

/// Anchors pointing at job postings on the listing pages.
pub const JOB_LINK_SELECTOR: &str = r#"a[href^="/companies/"][href*="/jobs/"]"#;

/// Enabled pagination links; narrowed by [`NEXT_PAGE_TEXT`].
pub const NEXT_PAGE_SELECTOR: &str =
    r#"ul[class*="pagination_component_pagination"] li:not(.disabled) a"#;

pub const NEXT_PAGE_TEXT: &str = "次へ";

/// Sleep unless the delay is zero.
pub(crate) async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Save a diagnostic screenshot under `dir`. Failures are logged only.
pub(crate) async fn capture_screenshot<P>(page: &mut P, dir: &Path, file_name: &str) -> Option<PathBuf>
where
    P: BrowserPage + ?Sized,
{
    if let Err(e) = std::fs::create_dir_all(dir) {
        warn!(dir = %dir.display(), error = %e, "Cannot create artifact directory");
        return None;
    }

    let path = dir.join(file_name);
    match page.screenshot(&path).await {
        Ok(()) => {
            debug!(path = %path.display(), "Saved screenshot");
            Some(path)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Screenshot failed");
            None
        }
    }
}

/// Make `s` usable as a file-name component.
pub(crate) fn sanitize_file_name(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_whitespace() || c.is_control() => '_',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("A/B: C?"), "A_B__C_");
        assert_eq!(sanitize_file_name("株式会社テスト"), "株式会社テスト");
    }
}
