//! Target database capability.

use async_trait::async_trait;
use notion_client::Result;
use serde_json::{Map, Value};

use crate::types::schema::{LiveSchema, PropertyDiff};

/// Page properties in Notion's request shape: property name → typed value.
pub type PageProperties = Map<String, Value>;

/// One page of an existing-rows query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageBatch {
    /// (URL, page id) pairs
    pub entries: Vec<(String, String)>,

    /// Cursor for the next batch; `None` when this was the last one
    pub next_cursor: Option<String>,
}

/// The one database the sync maintains.
#[async_trait]
pub trait NotionDatabase: Send + Sync {
    async fn retrieve_schema(&self) -> Result<LiveSchema>;

    /// Apply all changes in one call.
    async fn update_schema(&self, diff: &PropertyDiff) -> Result<()>;

    /// Rows whose `url_property` is not empty.
    async fn query_pages(&self, url_property: &str, cursor: Option<String>) -> Result<PageBatch>;

    /// Create a row; returns the new page id.
    async fn create_page(&self, properties: &PageProperties) -> Result<String>;

    async fn update_page(&self, page_id: &str, properties: &PageProperties) -> Result<()>;
}
