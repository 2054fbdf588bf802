//! Cache records → database rows.

use chrono::{Local, NaiveDate};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

use super::format::format_value;
use super::index::ExistingIndex;
use super::properties::{source_field, LAST_MODIFIED_PROPERTY, URL_PROPERTY};
use crate::traits::notion::{NotionDatabase, PageProperties};
use crate::types::record::CacheRecord;
use crate::types::schema::{DesiredSchema, LiveSchema};

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Sleep after each successful create/update
    pub write_pause: Duration,

    /// Sleep between existing-page query batches
    pub query_pause: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            write_pause: Duration::from_millis(550),
            query_pause: Duration::from_millis(350),
        }
    }
}

impl SyncConfig {
    pub fn without_delays() -> Self {
        Self {
            write_pause: Duration::ZERO,
            query_pause: Duration::ZERO,
        }
    }
}

/// Outcome counts of one sync run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub created: usize,
    pub updated: usize,
    pub failed: usize,

    /// Records carrying an analysis error
    pub skipped_error: usize,

    /// Records without a usable http(s) URL
    pub skipped_invalid: usize,

    /// Known rows with nothing left to write
    pub skipped_empty: usize,
}

impl SyncReport {
    pub fn total(&self) -> usize {
        self.created
            + self.updated
            + self.failed
            + self.skipped_error
            + self.skipped_invalid
            + self.skipped_empty
    }
}

/// Writes records into one database whose schema has been reconciled.
pub struct RecordSyncer<'a, D: ?Sized> {
    db: &'a D,
    schema: &'a LiveSchema,
    manual_only: HashSet<&'a str>,
    desired: &'a DesiredSchema,
    index: &'a ExistingIndex,

    /// Natural key → page id for rows created during this run
    created: HashMap<String, String>,
    config: SyncConfig,
    today: NaiveDate,
}

impl<'a, D> RecordSyncer<'a, D>
where
    D: NotionDatabase + ?Sized,
{
    pub fn new(db: &'a D, desired: &'a DesiredSchema, schema: &'a LiveSchema, index: &'a ExistingIndex) -> Self {
        Self {
            db,
            schema,
            manual_only: desired.manual_only_names().collect(),
            desired,
            index,
            created: HashMap::new(),
            config: SyncConfig::default(),
            today: Local::now().date_naive(),
        }
    }

    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Date written into date columns.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Properties for `record`, in desired-schema order. The last-modified
    /// column is always present; omitted values and columns missing from
    /// the live schema are left out.
    pub fn map_properties(&self, record: &CacheRecord) -> PageProperties {
        let today_value = Value::String(self.today.format("%Y-%m-%d").to_string());
        let mut properties = PageProperties::new();

        for desired in self.desired.iter() {
            let name = desired.name.as_str();
            let value = if name == LAST_MODIFIED_PROPERTY {
                &today_value
            } else {
                match record.get(source_field(name)) {
                    Some(value) => value,
                    None => continue,
                }
            };

            let Some(kind) = self.schema.kind_of(name) else {
                warn!(property = %name, "Property missing from database schema, skipping");
                continue;
            };

            if let Some(formatted) = format_value(kind, value, self.today) {
                properties.insert(name.to_string(), formatted.to_notion());
            }
        }

        properties
    }

    /// Page id for `key`, whether indexed before the run or created in it.
    fn page_id(&self, key: &str) -> Option<String> {
        self.index
            .page_id(key)
            .or_else(|| self.created.get(key).map(String::as_str))
            .map(str::to_owned)
    }

    /// Create or update the row for one record.
    pub async fn sync_record(&mut self, record: &CacheRecord, report: &mut SyncReport) {
        if let Some(reason) = record.error.as_deref().filter(|_| record.has_error()) {
            info!(link = %record.origin_link, error = %reason, "Skipping record with analysis error");
            report.skipped_error += 1;
            return;
        }

        let Some(key) = record.natural_key().filter(|k| is_web_url(k)) else {
            warn!(
                title = %record.origin_title,
                url = ?record.natural_key(),
                "Skipping record without a valid URL"
            );
            report.skipped_invalid += 1;
            return;
        };

        let mut properties = self.map_properties(record);

        match self.page_id(key) {
            Some(page_id) => {
                properties.retain(|name, _| {
                    name == LAST_MODIFIED_PROPERTY || !self.manual_only.contains(name.as_str())
                });
                if properties.is_empty() {
                    warn!(url = %key, page_id = %page_id, "Nothing to update, skipping");
                    report.skipped_empty += 1;
                    return;
                }

                debug!(url = %key, page_id = %page_id, properties = properties.len(), "Updating page");
                match self.db.update_page(&page_id, &properties).await {
                    Ok(()) => {
                        report.updated += 1;
                        self.pause().await;
                    }
                    Err(e) => {
                        warn!(url = %key, page_id = %page_id, error = %e, "Page update failed");
                        report.failed += 1;
                    }
                }
            }
            None => {
                let title = self.schema.title_property().map(|(name, _)| name);
                let missing = match title {
                    Some(title) if !properties.contains_key(title) => Some(title),
                    None => Some("<title>"),
                    _ if !properties.contains_key(URL_PROPERTY) => Some(URL_PROPERTY),
                    _ => None,
                };
                if let Some(missing) = missing {
                    error!(url = %key, property = %missing, "Required property missing, not creating page");
                    report.failed += 1;
                    return;
                }

                debug!(url = %key, properties = properties.len(), "Creating page");
                match self.db.create_page(&properties).await {
                    Ok(page_id) => {
                        info!(url = %key, page_id = %page_id, "Page created");
                        self.created.insert(key.to_string(), page_id);
                        report.created += 1;
                        self.pause().await;
                    }
                    Err(e) => {
                        warn!(url = %key, error = %e, "Page creation failed");
                        report.failed += 1;
                    }
                }
            }
        }
    }

    /// Sync every record. Individual failures are counted, never fatal.
    pub async fn sync_all<'r, I>(&mut self, records: I) -> SyncReport
    where
        I: IntoIterator<Item = &'r CacheRecord>,
    {
        let mut report = SyncReport::default();
        for record in records {
            self.sync_record(record, &mut report).await;
        }

        info!(
            created = report.created,
            updated = report.updated,
            skipped_error = report.skipped_error,
            skipped_invalid = report.skipped_invalid,
            skipped_empty = report.skipped_empty,
            "Sync finished"
        );
        if report.failed > 0 {
            warn!(failed = report.failed, "Some records failed to sync");
        }
        report
    }

    async fn pause(&self) {
        if !self.config.write_pause.is_zero() {
            tokio::time::sleep(self.config.write_pause).await;
        }
    }
}

/// Absolute http(s) URL with a host.
fn is_web_url(s: &str) -> bool {
    Url::parse(s)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
        .unwrap_or(false)
}
