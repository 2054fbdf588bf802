//! Findy liked-jobs → Notion pipeline
//!
//! Two batch runs share one cache file:
//!
//! - **scrape**: log in to the job board, collect every liked posting across
//!   the paginated listing, fetch each pending posting's text and extract
//!   structured fields with an LLM. Results (including failures, which are
//!   retried next run) are merged into the cache.
//! - **sync**: reconcile the Notion database schema, index the rows already
//!   present by URL, then create or update one row per successful record
//!   without touching operator-edited columns.
//!
//! # Usage
//!
//! ```rust,ignore
//! use findy_sync::{cache::CacheStore, notion::NotionDatabaseClient, pipeline};
//! use notion_client::NotionClient;
//!
//! let cache = CacheStore::read(".cache/analyzed_findy_jobs.json")?;
//! let db = NotionDatabaseClient::new(NotionClient::new(token)?, database_id);
//! let report = pipeline::sync_to_notion(&db, &cache, &Default::default()).await?;
//! ```
//!
//! # Modules
//!
//! - [`scrape`] - Login, listing pagination, detail pages
//! - [`analysis`] - Pending-link selection and concurrent analysis
//! - [`cache`] - File-backed result store
//! - [`notion`] - Schema reconciliation, value formatting, record sync
//! - [`traits`] - Browser, extractor and database capabilities
//! - [`testing`] - Mock implementations for testing

pub mod ai;
pub mod analysis;
pub mod browser;
pub mod cache;
pub mod config;
pub mod credentials;
pub mod error;
pub mod notion;
pub mod pipeline;
pub mod scrape;
pub mod testing;
pub mod traits;
pub mod types;

pub use cache::CacheStore;
pub use error::{BrowserError, CacheError, ExtractError, ScrapeError, SyncError};
pub use traits::{
    browser::{Anchor, BrowserPage, Locator},
    extractor::FieldExtractor,
    notion::{NotionDatabase, PageBatch, PageProperties},
};
pub use types::{
    link::LinkInfo,
    record::{CacheRecord, FieldMap},
    schema::{DesiredSchema, LiveSchema, PropertyDiff, PropertyType},
};
