use async_trait::async_trait;

use crate::error::ExtractError;
use crate::types::record::FieldMap;

/// Turns the rendered text of a job posting into named fields.
#[async_trait]
pub trait FieldExtractor: Send + Sync {
    /// Extract fields from `text`. `title` and `link` identify the posting
    /// and may be used in the prompt.
    async fn extract(&self, text: &str, title: &str, link: &str) -> Result<FieldMap, ExtractError>;
}
