//! Links collected from the listing pages.

use serde::{Deserialize, Serialize};

/// Placeholder link for anchors without a resolvable `href`.
pub const UNKNOWN_LINK: &str = "不明";

/// Placeholder title for anchors without text.
pub const UNKNOWN_TITLE: &str = "タイトル不明";

/// One job posting found on a listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkInfo {
    /// Displayed anchor text
    pub title: String,

    /// Absolute URL of the posting (dedup key)
    pub link: String,
}

impl LinkInfo {
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
        }
    }

    /// Build from raw anchor data, resolving relative hrefs against `base_url`.
    pub fn from_anchor(text: Option<&str>, href: Option<&str>, base_url: &str) -> Self {
        let title = text
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(UNKNOWN_TITLE);

        let link = match href.map(str::trim).filter(|h| !h.is_empty()) {
            Some(h) if h.starts_with('/') => format!("{}{}", base_url.trim_end_matches('/'), h),
            Some(h) => h.to_string(),
            None => UNKNOWN_LINK.to_string(),
        };

        Self::new(title, link)
    }

    /// Whether this link is the "no URL found" placeholder.
    pub fn is_sentinel(&self) -> bool {
        self.link.is_empty() || self.link == UNKNOWN_LINK
    }
}
