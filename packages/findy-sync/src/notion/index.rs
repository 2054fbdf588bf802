//! URL → page id index of rows already in the database.

use std::collections::HashMap;
use std::time::Duration;
use tracing::{error, info};

use crate::error::{SyncError, SyncResult};
use crate::traits::notion::NotionDatabase;

/// Rows already present, keyed by their URL. Rebuilt on every run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExistingIndex {
    pages: HashMap<String, String>,
}

impl ExistingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: impl Into<String>, page_id: impl Into<String>) {
        self.pages.insert(url.into(), page_id.into());
    }

    pub fn page_id(&self, url: &str) -> Option<&str> {
        self.pages.get(url).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl FromIterator<(String, String)> for ExistingIndex {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            pages: iter.into_iter().collect(),
        }
    }
}

/// Query every row with a non-empty `url_property`, following cursors and
/// pausing `page_pause` between batches.
pub async fn fetch_existing_index<D>(db: &D, url_property: &str, page_pause: Duration) -> SyncResult<ExistingIndex>
where
    D: NotionDatabase + ?Sized,
{
    info!(property = %url_property, "Fetching existing pages");
    let mut index = ExistingIndex::new();
    let mut cursor = None;
    let mut rows = 0usize;

    loop {
        let batch = db.query_pages(url_property, cursor).await.map_err(|e| {
            if e.is_validation() && e.to_string().contains(url_property) {
                error!(property = %url_property, error = %e, "Database has no such URL property");
            } else {
                error!(error = %e, "Failed to query existing pages");
            }
            SyncError::ExistingIndex(e)
        })?;

        rows += batch.entries.len();
        for (url, page_id) in batch.entries {
            index.insert(url, page_id);
        }

        match batch.next_cursor {
            Some(next) => {
                info!(pages = index.len(), rows, "Fetching next batch of existing pages");
                cursor = Some(next);
                if !page_pause.is_zero() {
                    tokio::time::sleep(page_pause).await;
                }
            }
            None => break,
        }
    }

    info!(pages = index.len(), "Existing pages indexed");
    Ok(index)
}
