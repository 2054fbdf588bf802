//! Error types for the Notion client.

use thiserror::Error;

/// Result type for Notion client operations.
pub type Result<T> = std::result::Result<T, NotionError>;

/// Notion client errors.
#[derive(Debug, Error)]
pub enum NotionError {
    /// Non-2xx response. `code` is Notion's machine-readable error code
    /// (`object_not_found`, `validation_error`, ...) when the body carried one.
    #[error("Notion API error ({status}, {code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl NotionError {
    /// Notion error code, if this is an API error.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => Some(code),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.code() == Some("object_not_found")
    }

    pub fn is_unauthorized(&self) -> bool {
        self.code() == Some("unauthorized")
    }

    pub fn is_rate_limited(&self) -> bool {
        self.code() == Some("rate_limited")
    }

    pub fn is_validation(&self) -> bool {
        self.code() == Some("validation_error")
    }
}
