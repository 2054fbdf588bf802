//! Notion API request and response types.
//!
//! Property payloads are kept as raw JSON: their shape depends on the
//! property type and callers already know which shape they need.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// A database object as returned by `GET /databases/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct Database {
    pub id: String,
    #[serde(default)]
    pub properties: HashMap<String, PropertySchema>,
}

/// One column definition of a database.
#[derive(Debug, Clone, Deserialize)]
pub struct PropertySchema {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Type-specific configuration (`{"number": {"format": "number"}}`, ...).
    #[serde(flatten)]
    pub config: Map<String, Value>,
}

impl PropertySchema {
    /// Configuration object stored under the property's type key.
    pub fn type_config(&self) -> Value {
        self.config
            .get(&self.kind)
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()))
    }
}

/// Body of `POST /databases/{id}/query`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_cursor: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

impl QueryRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only pages whose `url`-typed property `property` is set.
    pub fn url_is_not_empty(mut self, property: impl Into<String>) -> Self {
        self.filter = Some(serde_json::json!({
            "property": property.into(),
            "url": { "is_not_empty": true }
        }));
        self
    }

    pub fn start_cursor(mut self, cursor: Option<String>) -> Self {
        self.start_cursor = cursor;
        self
    }

    pub fn page_size(mut self, size: u32) -> Self {
        self.page_size = Some(size);
        self
    }
}

/// A paginated list response.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub results: Vec<Page>,
    #[serde(default)]
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

/// A page (database row).
#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    pub id: String,
    #[serde(default)]
    pub properties: HashMap<String, Value>,
}

impl Page {
    /// Value of a `url`-typed property, if set.
    pub fn url_property(&self, name: &str) -> Option<&str> {
        self.properties.get(name)?.get("url")?.as_str()
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CreatePageRequest<'a> {
    pub parent: Parent<'a>,
    pub properties: &'a Map<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct Parent<'a> {
    pub database_id: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct PropertiesBody<'a> {
    pub properties: &'a Map<String, Value>,
}

/// Error body returned by the API on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_schema_keeps_type_config() {
        let prop: PropertySchema = serde_json::from_value(serde_json::json!({
            "id": "abc",
            "name": "給与下限(万)",
            "type": "number",
            "number": { "format": "number" }
        }))
        .unwrap();

        assert_eq!(prop.kind, "number");
        assert_eq!(prop.type_config()["format"], "number");
    }

    #[test]
    fn test_query_request_serialization() {
        let request = QueryRequest::new()
            .url_is_not_empty("URL")
            .page_size(100)
            .start_cursor(None);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["filter"]["url"]["is_not_empty"], true);
        assert_eq!(json["page_size"], 100);
        assert!(json.get("start_cursor").is_none());
    }

    #[test]
    fn test_page_url_property() {
        let page: Page = serde_json::from_value(serde_json::json!({
            "id": "page-1",
            "properties": {
                "URL": { "id": "x", "type": "url", "url": "https://example.com/1" },
                "メモ": { "id": "y", "type": "rich_text", "rich_text": [] }
            }
        }))
        .unwrap();

        assert_eq!(page.url_property("URL"), Some("https://example.com/1"));
        assert_eq!(page.url_property("メモ"), None);
    }
}
