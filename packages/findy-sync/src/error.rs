//! Typed errors for the scrape and sync pipelines.
//!
//! Uses `thiserror` for library errors; the binaries wrap these in `anyhow`.

use std::time::Duration;
use thiserror::Error;

/// Errors raised by a [`BrowserPage`](crate::traits::browser::BrowserPage).
#[derive(Debug, Error)]
pub enum BrowserError {
    /// A wait did not complete in time
    #[error("timeout after {timeout:?} waiting for {operation}")]
    Timeout {
        operation: String,
        timeout: Duration,
    },

    /// Navigation failed for a reason other than a timeout
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    /// Browser could not be started
    #[error("browser launch failed: {0}")]
    Launch(String),

    /// Any other driver-level failure
    #[error("browser driver error: {0}")]
    Driver(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl BrowserError {
    pub fn timeout(operation: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Errors that abort a scrape run.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("login failed: {0}")]
    Login(String),

    #[error(transparent)]
    Browser(#[from] BrowserError),

    /// Analysis finished but the results could not be saved
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Failures of the field-extraction capability. These never abort a run;
/// they are recorded in the cache as error records.
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    #[error("API key not set")]
    MissingApiKey,

    #[error("LLM API call failed: {0}")]
    Api(String),

    #[error("LLM response could not be parsed: {message}")]
    Parse { message: String, raw: String },
}

impl ExtractError {
    /// Raw model output, when the failure happened after a response arrived.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Self::Parse { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

/// Cache file errors.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cache JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that abort a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The database has no title-typed property; titles cannot be created
    #[error("database has no title property")]
    MissingTitleProperty,

    #[error("invalid desired schema: {0}")]
    DesiredSchema(String),

    #[error("schema reconciliation failed: {0}")]
    Schema(#[source] notion_client::NotionError),

    #[error("existing page lookup failed: {0}")]
    ExistingIndex(#[source] notion_client::NotionError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Result type alias for browser operations.
pub type BrowserResult<T> = std::result::Result<T, BrowserError>;

/// Result type alias for scrape runs.
pub type ScrapeResult<T> = std::result::Result<T, ScrapeError>;

/// Result type alias for cache operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Result type alias for sync runs.
pub type SyncResult<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_is_distinguished_by_type() {
        let timeout = BrowserError::timeout("next page control", Duration::from_secs(5));
        let navigation = BrowserError::Navigation {
            url: "https://findy-code.io/likes".into(),
            reason: "Timeout in message text only".into(),
        };

        assert!(timeout.is_timeout());
        assert!(!navigation.is_timeout());
    }

    #[test]
    fn test_parse_error_keeps_raw_response() {
        let error = ExtractError::Parse {
            message: "expected value".into(),
            raw: "not json".into(),
        };
        assert_eq!(error.raw_response(), Some("not json"));
        assert_eq!(ExtractError::MissingApiKey.raw_response(), None);
    }
}
