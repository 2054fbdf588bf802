//! [`NotionDatabase`] over the Notion REST API.

use async_trait::async_trait;
use notion_client::{Database, NotionClient, QueryRequest, Result};

use crate::traits::notion::{NotionDatabase, PageBatch, PageProperties};
use crate::types::schema::{LiveProperty, LiveSchema, PropertyDiff, PropertyType};

/// Rows per query request (the API maximum).
const QUERY_PAGE_SIZE: u32 = 100;

/// One database, addressed through a shared client.
#[derive(Clone)]
pub struct NotionDatabaseClient {
    client: NotionClient,
    database_id: String,
}

impl NotionDatabaseClient {
    pub fn new(client: NotionClient, database_id: impl Into<String>) -> Self {
        Self {
            client,
            database_id: database_id.into(),
        }
    }
}

/// Convert the API's property map, sorted by name for stable logs.
pub fn live_schema_from(database: &Database) -> LiveSchema {
    let mut names: Vec<&String> = database.properties.keys().collect();
    names.sort();

    let mut schema = LiveSchema::new();
    for name in names {
        let property = &database.properties[name];
        schema.insert(
            name.clone(),
            LiveProperty {
                id: property.id.clone(),
                kind: PropertyType::from(property.kind.as_str()),
                config: property.type_config(),
            },
        );
    }
    schema
}

#[async_trait]
impl NotionDatabase for NotionDatabaseClient {
    async fn retrieve_schema(&self) -> Result<LiveSchema> {
        let database = self.client.retrieve_database(&self.database_id).await?;
        Ok(live_schema_from(&database))
    }

    async fn update_schema(&self, diff: &PropertyDiff) -> Result<()> {
        self.client
            .update_database(&self.database_id, &diff.to_notion())
            .await?;
        Ok(())
    }

    async fn query_pages(&self, url_property: &str, cursor: Option<String>) -> Result<PageBatch> {
        let query = QueryRequest::new()
            .url_is_not_empty(url_property)
            .start_cursor(cursor)
            .page_size(QUERY_PAGE_SIZE);
        let response = self.client.query_database(&self.database_id, &query).await?;

        let entries = response
            .results
            .iter()
            .filter_map(|page| {
                page.url_property(url_property)
                    .map(|url| (url.to_string(), page.id.clone()))
            })
            .collect();

        Ok(PageBatch {
            entries,
            next_cursor: response.next_cursor.filter(|_| response.has_more),
        })
    }

    async fn create_page(&self, properties: &PageProperties) -> Result<String> {
        let page = self
            .client
            .create_page(&self.database_id, properties)
            .await?;
        Ok(page.id)
    }

    async fn update_page(&self, page_id: &str, properties: &PageProperties) -> Result<()> {
        self.client.update_page(page_id, properties).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_live_schema_from_database() {
        let database: Database = serde_json::from_value(json!({
            "id": "db",
            "properties": {
                "Name": {"id": "title", "name": "Name", "type": "title", "title": {}},
                "給与下限(万)": {"id": "a1", "name": "給与下限(万)", "type": "number", "number": {"format": "number"}},
                "担当": {"id": "b2", "name": "担当", "type": "people", "people": {}}
            }
        }))
        .unwrap();

        let schema = live_schema_from(&database);

        assert_eq!(schema.title_property().map(|(name, _)| name), Some("Name"));
        let number = schema.get("給与下限(万)").unwrap();
        assert_eq!(number.kind, PropertyType::Number);
        assert_eq!(number.config, json!({"format": "number"}));
        assert_eq!(schema.kind_of("担当"), Some(&PropertyType::Other("people".into())));
    }
}
