//! Pure Notion REST API client.
//!
//! A minimal client for the parts of the Notion API used to maintain a
//! database: reading and patching its schema, querying its rows, and creating
//! or updating pages.
//!
//! # Example
//!
//! ```rust,ignore
//! use notion_client::{NotionClient, QueryRequest};
//!
//! let client = NotionClient::new("secret_...")?;
//!
//! let db = client.retrieve_database("database-id").await?;
//! let rows = client
//!     .query_database("database-id", &QueryRequest::new().page_size(100))
//!     .await?;
//! ```

pub mod error;
pub mod types;

pub use error::{NotionError, Result};
pub use types::{Database, Page, PropertySchema, QueryRequest, QueryResponse};

use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, warn};
use types::{CreatePageRequest, ErrorBody, Parent, PropertiesBody};

const BASE_URL: &str = "https://api.notion.com/v1";

/// API version sent in the `Notion-Version` header.
pub const NOTION_VERSION: &str = "2022-06-28";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct NotionClient {
    client: reqwest::Client,
    token: String,
    base_url: String,
}

impl NotionClient {
    /// Create a client with the default 60 second request timeout.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        Self::with_timeout(token, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            token: token.into(),
            base_url: BASE_URL.to_string(),
        })
    }

    /// Set a custom base URL (for proxies or test servers).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Retrieve a database including its property schema.
    pub async fn retrieve_database(&self, database_id: &str) -> Result<Database> {
        let url = format!("{}/databases/{}", self.base_url, database_id);
        self.send(self.request(Method::GET, &url)).await
    }

    /// Create, rename or retype database properties in one batch.
    ///
    /// Keys of `properties` are existing property names or ids; a key that
    /// matches nothing creates a new property.
    pub async fn update_database(
        &self,
        database_id: &str,
        properties: &Map<String, Value>,
    ) -> Result<Database> {
        let url = format!("{}/databases/{}", self.base_url, database_id);
        let body = PropertiesBody { properties };
        self.send(self.request(Method::PATCH, &url).json(&body)).await
    }

    /// Query one page of database rows.
    pub async fn query_database(
        &self,
        database_id: &str,
        query: &QueryRequest,
    ) -> Result<QueryResponse> {
        let url = format!("{}/databases/{}/query", self.base_url, database_id);
        self.send(self.request(Method::POST, &url).json(query)).await
    }

    /// Create a row in a database.
    pub async fn create_page(
        &self,
        database_id: &str,
        properties: &Map<String, Value>,
    ) -> Result<Page> {
        let url = format!("{}/pages", self.base_url);
        let body = CreatePageRequest {
            parent: Parent { database_id },
            properties,
        };
        self.send(self.request(Method::POST, &url).json(&body)).await
    }

    /// Update the given properties of a page. Properties not mentioned are
    /// left untouched.
    pub async fn update_page(
        &self,
        page_id: &str,
        properties: &Map<String, Value>,
    ) -> Result<Page> {
        let url = format!("{}/pages/{}", self.base_url, page_id);
        let body = PropertiesBody { properties };
        self.send(self.request(Method::PATCH, &url).json(&body)).await
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let resp = request.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let error = api_error(status.as_u16(), &body);
            warn!(status = status.as_u16(), error = %error, "Notion API request failed");
            return Err(error);
        }

        let body = resp.text().await?;
        debug!(bytes = body.len(), "Notion API response received");
        serde_json::from_str(&body).map_err(|e| NotionError::Parse(e.to_string()))
    }
}

/// Build an API error from a non-2xx body, keeping the raw body when it is
/// not Notion's JSON error shape.
fn api_error(status: u16, body: &str) -> NotionError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) if !parsed.code.is_empty() => NotionError::Api {
            status,
            code: parsed.code,
            message: parsed.message,
        },
        _ => NotionError::Api {
            status,
            code: String::new(),
            message: body.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builder() {
        let client = NotionClient::new("secret_test")
            .unwrap()
            .with_base_url("http://localhost:9999/v1");

        assert_eq!(client.token, "secret_test");
        assert_eq!(client.base_url(), "http://localhost:9999/v1");
    }

    #[test]
    fn test_api_error_parses_notion_body() {
        let body = r#"{"object":"error","status":404,"code":"object_not_found","message":"Could not find database"}"#;
        let error = api_error(404, body);

        assert!(error.is_not_found());
        assert!(error.to_string().contains("Could not find database"));
    }

    #[test]
    fn test_api_error_keeps_raw_body() {
        let error = api_error(502, "<html>Bad gateway</html>");

        assert_eq!(error.code(), Some(""));
        assert!(error.to_string().contains("Bad gateway"));
    }
}
