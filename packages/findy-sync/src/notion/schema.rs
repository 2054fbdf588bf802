//! Schema reconciliation.
//!
//! Desired properties missing from the database are created, mismatched ones
//! retyped, and the title column renamed. Extra columns are never touched.
//! All changes go out in one update call; any failure aborts the sync.

use notion_client::NotionError;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::error::{SyncError, SyncResult};
use crate::traits::notion::NotionDatabase;
use crate::types::schema::{DesiredSchema, LiveSchema, PropertyDiff, PropertyType, Rename};

/// Changes needed to make `live` a compatible superset of `desired`.
pub fn plan_schema_changes(desired: &DesiredSchema, live: &LiveSchema) -> SyncResult<PropertyDiff> {
    let title = desired.title().map_err(SyncError::DesiredSchema)?;
    let (live_title_name, live_title) = live.title_property().ok_or(SyncError::MissingTitleProperty)?;

    let mut diff = PropertyDiff::new();

    if live_title_name != title.name {
        info!(from = %live_title_name, to = %title.name, "Renaming title property");
        diff.rename(
            Rename {
                name: live_title_name.to_string(),
                id: live_title.id.clone(),
            },
            &title.name,
            PropertyType::Title,
        );
    }

    for property in desired.iter().filter(|p| !p.is_title) {
        match live.get(&property.name) {
            None => {
                info!(property = %property.name, kind = %property.kind, "Creating property");
                diff.create_or_retype(&property.name, property.kind.clone(), property.config.clone());
            }
            Some(existing) if existing.kind != property.kind => {
                warn!(
                    property = %property.name,
                    expected = %property.kind,
                    actual = %existing.kind,
                    "Property type differs, requesting type change"
                );
                diff.create_or_retype(&property.name, property.kind.clone(), property.config.clone());
            }
            Some(_) => {}
        }
    }

    Ok(diff)
}

/// Bring the database schema in line with `desired` and return the schema
/// as it is afterwards.
pub async fn reconcile_schema<D>(db: &D, desired: &DesiredSchema) -> SyncResult<LiveSchema>
where
    D: NotionDatabase + ?Sized,
{
    let live = db.retrieve_schema().await.map_err(|e| {
        error!(error = %e, "{}", describe_retrieve_error(&e));
        SyncError::Schema(e)
    })?;
    info!(properties = live.len(), "Retrieved database schema");

    let diff = plan_schema_changes(desired, &live)?;
    if diff.is_empty() {
        info!("Database schema already up to date");
        return Ok(live);
    }

    info!(changes = diff.len(), "Updating database schema");
    if let Err(e) = db.update_schema(&diff).await {
        let body = Value::Object(diff.to_notion());
        error!(
            error = %e,
            request = %body,
            "Database schema update rejected"
        );
        return Err(SyncError::Schema(e));
    }

    let live = db.retrieve_schema().await.map_err(|e| {
        error!(error = %e, "Failed to re-read schema after update");
        SyncError::Schema(e)
    })?;
    debug!(properties = live.len(), "Schema updated");
    Ok(live)
}

fn describe_retrieve_error(e: &NotionError) -> &'static str {
    if e.is_not_found() {
        "Database not found, check NOTION_DATABASE_ID"
    } else if e.is_unauthorized() {
        "Notion API key invalid or integration lacks access to the database"
    } else if e.is_rate_limited() {
        "Notion API rate limit reached, retry later"
    } else {
        "Failed to retrieve database schema"
    }
}
