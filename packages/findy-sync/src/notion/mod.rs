//! Notion side of the pipeline: schema reconciliation, existing-row index
//! and record sync.

pub mod api;
pub mod format;
pub mod index;
pub mod properties;
pub mod schema;
pub mod sync;

pub use api::NotionDatabaseClient;
pub use index::{fetch_existing_index, ExistingIndex};
pub use schema::reconcile_schema;
pub use sync::{RecordSyncer, SyncConfig, SyncReport};
