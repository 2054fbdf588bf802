//! Test doubles for the browser, extraction and Notion capabilities.
//!
//! Each mock is scripted up front and records every call for assertions.

use async_trait::async_trait;
use notion_client::NotionError;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::{BrowserError, BrowserResult, ExtractError};
use crate::scrape::NEXT_PAGE_SELECTOR;
use crate::traits::{
    browser::{Anchor, BrowserPage, Locator},
    extractor::FieldExtractor,
    notion::{NotionDatabase, PageBatch, PageProperties},
};
use crate::types::record::FieldMap;
use crate::types::schema::{DesiredSchema, LiveProperty, LiveSchema, PropertyDiff};

// ============================================================================
// Browser
// ============================================================================

/// One scripted page of a [`MockBrowser`].
#[derive(Debug, Clone, Default)]
pub struct MockPage {
    anchors: Vec<Anchor>,
    body: Option<String>,
    /// Selector → URL the click navigates to
    controls: HashMap<String, String>,
}

impl MockPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_anchor(mut self, anchor: Anchor) -> Self {
        self.anchors.push(anchor);
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// A visible "next page" control leading to `url`.
    pub fn with_next(self, url: impl Into<String>) -> Self {
        self.with_control(NEXT_PAGE_SELECTOR, url)
    }

    pub fn with_control(mut self, selector: impl Into<String>, url: impl Into<String>) -> Self {
        self.controls.insert(selector.into(), url.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MockBrowserCall {
    Navigate(String),
    Anchors(String),
    WaitVisible(String),
    Click(String),
    Fill { selector: String, value: String },
    BodyText(String),
    Screenshot(PathBuf),
}

/// Scripted [`BrowserPage`]. Unknown URLs load as blank pages.
#[derive(Default)]
pub struct MockBrowser {
    pages: HashMap<String, MockPage>,
    current: String,

    /// Selectors visible on every page
    visible: HashSet<String>,

    /// Selectors clickable on every page (clicking stays on the page)
    clickable: HashSet<String>,

    navigation_timeouts: HashSet<String>,
    navigation_failures: HashSet<String>,

    calls: Arc<RwLock<Vec<MockBrowserCall>>>,
}

impl MockBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, page: MockPage) -> Self {
        self.pages.insert(url.into(), page);
        self
    }

    pub fn with_visible(mut self, selector: impl Into<String>) -> Self {
        self.visible.insert(selector.into());
        self
    }

    /// Clickable and therefore also visible.
    pub fn with_clickable(mut self, selector: impl Into<String>) -> Self {
        let selector = selector.into();
        self.visible.insert(selector.clone());
        self.clickable.insert(selector);
        self
    }

    pub fn with_navigation_timeout(mut self, url: impl Into<String>) -> Self {
        self.navigation_timeouts.insert(url.into());
        self
    }

    pub fn with_navigation_failure(mut self, url: impl Into<String>) -> Self {
        self.navigation_failures.insert(url.into());
        self
    }

    pub fn calls(&self) -> Vec<MockBrowserCall> {
        self.calls.read().unwrap().clone()
    }

    /// URLs passed to `navigate`, in order.
    pub fn navigations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                MockBrowserCall::Navigate(url) => Some(url),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: MockBrowserCall) {
        self.calls.write().unwrap().push(call);
    }

    fn page(&self) -> Option<&MockPage> {
        self.pages.get(&self.current)
    }

    fn control_target(&self, locator: &Locator) -> Option<String> {
        self.page()?.controls.get(&locator.selector).cloned()
    }

    fn is_visible(&self, locator: &Locator) -> bool {
        self.visible.contains(&locator.selector) || self.control_target(locator).is_some()
    }
}

#[async_trait]
impl BrowserPage for MockBrowser {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> BrowserResult<()> {
        self.record(MockBrowserCall::Navigate(url.to_string()));
        if self.navigation_timeouts.contains(url) {
            return Err(BrowserError::timeout(format!("navigation to {url}"), timeout));
        }
        if self.navigation_failures.contains(url) {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: "net::ERR_CONNECTION_REFUSED".into(),
            });
        }
        self.current = url.to_string();
        Ok(())
    }

    async fn wait_until_ready(&mut self, _timeout: Duration) -> BrowserResult<()> {
        Ok(())
    }

    async fn current_url(&mut self) -> BrowserResult<String> {
        Ok(self.current.clone())
    }

    async fn anchors(&mut self, selector: &str, timeout: Duration) -> BrowserResult<Vec<Anchor>> {
        self.record(MockBrowserCall::Anchors(selector.to_string()));
        match self.page().map(|p| p.anchors.clone()) {
            Some(anchors) if !anchors.is_empty() => Ok(anchors),
            _ => Err(BrowserError::timeout(selector, timeout)),
        }
    }

    async fn wait_for_visible(&mut self, locator: &Locator, timeout: Duration) -> BrowserResult<()> {
        self.record(MockBrowserCall::WaitVisible(locator.selector.clone()));
        if self.is_visible(locator) {
            Ok(())
        } else {
            Err(BrowserError::timeout(locator.selector.clone(), timeout))
        }
    }

    async fn click_and_wait(&mut self, locator: &Locator, timeout: Duration) -> BrowserResult<()> {
        self.record(MockBrowserCall::Click(locator.selector.clone()));
        if let Some(target) = self.control_target(locator) {
            self.current = target;
            return Ok(());
        }
        if self.clickable.contains(&locator.selector) {
            return Ok(());
        }
        Err(BrowserError::timeout(locator.selector.clone(), timeout))
    }

    async fn fill(&mut self, selector: &str, value: &str, _timeout: Duration) -> BrowserResult<()> {
        self.record(MockBrowserCall::Fill {
            selector: selector.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    async fn body_text(&mut self, timeout: Duration) -> BrowserResult<String> {
        self.record(MockBrowserCall::BodyText(self.current.clone()));
        self.page()
            .and_then(|p| p.body.clone())
            .ok_or_else(|| BrowserError::timeout("body text", timeout))
    }

    async fn screenshot(&mut self, path: &Path) -> BrowserResult<()> {
        self.record(MockBrowserCall::Screenshot(path.to_path_buf()));
        Ok(())
    }
}

// ============================================================================
// Field extraction
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct MockExtractCall {
    pub text: String,
    pub title: String,
    pub link: String,
}

/// Scripted [`FieldExtractor`] keyed by link. Unscripted links fail with an
/// API error.
#[derive(Default)]
pub struct MockFieldExtractor {
    responses: Arc<RwLock<HashMap<String, Result<FieldMap, ExtractError>>>>,
    calls: Arc<RwLock<Vec<MockExtractCall>>>,
}

impl MockFieldExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond to `link` with the members of a JSON object.
    pub fn with_fields(self, link: impl Into<String>, fields: Value) -> Self {
        let fields: FieldMap = match fields {
            Value::Object(map) => map.into_iter().collect(),
            _ => FieldMap::new(),
        };
        self.responses.write().unwrap().insert(link.into(), Ok(fields));
        self
    }

    pub fn with_error(self, link: impl Into<String>, error: ExtractError) -> Self {
        self.responses.write().unwrap().insert(link.into(), Err(error));
        self
    }

    pub fn calls(&self) -> Vec<MockExtractCall> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl FieldExtractor for MockFieldExtractor {
    async fn extract(&self, text: &str, title: &str, link: &str) -> Result<FieldMap, ExtractError> {
        self.calls.write().unwrap().push(MockExtractCall {
            text: text.to_string(),
            title: title.to_string(),
            link: link.to_string(),
        });
        self.responses
            .read()
            .unwrap()
            .get(link)
            .cloned()
            .unwrap_or_else(|| Err(ExtractError::Api(format!("no scripted response for {link}"))))
    }
}

// ============================================================================
// Notion
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum MockNotionCall {
    RetrieveSchema,
    UpdateSchema(PropertyDiff),
    QueryPages { cursor: Option<String> },
    CreatePage(PageProperties),
    UpdatePage { page_id: String, properties: PageProperties },
}

/// In-memory [`NotionDatabase`]. Schema updates are applied to the stored
/// schema and created pages become visible to later queries.
pub struct MockNotion {
    schema: Arc<RwLock<LiveSchema>>,
    pages: Arc<RwLock<Vec<(String, String)>>>,
    batch_size: usize,
    fail_schema_update: bool,
    fail_queries: bool,
    failing_urls: HashSet<String>,
    calls: Arc<RwLock<Vec<MockNotionCall>>>,
}

impl Default for MockNotion {
    fn default() -> Self {
        Self {
            schema: Arc::default(),
            pages: Arc::default(),
            batch_size: 100,
            fail_schema_update: false,
            fail_queries: false,
            failing_urls: HashSet::new(),
            calls: Arc::default(),
        }
    }
}

impl MockNotion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(self, schema: LiveSchema) -> Self {
        *self.schema.write().unwrap() = schema;
        self
    }

    pub fn with_existing_page(self, url: impl Into<String>, page_id: impl Into<String>) -> Self {
        self.pages.write().unwrap().push((url.into(), page_id.into()));
        self
    }

    pub fn with_query_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    pub fn failing_schema_update(mut self) -> Self {
        self.fail_schema_update = true;
        self
    }

    pub fn failing_queries(mut self) -> Self {
        self.fail_queries = true;
        self
    }

    /// Reject create/update requests whose `URL` property is `url`.
    pub fn failing_writes_for(mut self, url: impl Into<String>) -> Self {
        self.failing_urls.insert(url.into());
        self
    }

    pub fn calls(&self) -> Vec<MockNotionCall> {
        self.calls.read().unwrap().clone()
    }

    pub fn query_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, MockNotionCall::QueryPages { .. }))
            .count()
    }

    pub fn created_pages(&self) -> Vec<PageProperties> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                MockNotionCall::CreatePage(properties) => Some(properties),
                _ => None,
            })
            .collect()
    }

    pub fn updated_pages(&self) -> Vec<(String, PageProperties)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                MockNotionCall::UpdatePage { page_id, properties } => Some((page_id, properties)),
                _ => None,
            })
            .collect()
    }

    pub fn schema(&self) -> LiveSchema {
        self.schema.read().unwrap().clone()
    }

    fn record(&self, call: MockNotionCall) {
        self.calls.write().unwrap().push(call);
    }

    fn rejects(&self, properties: &PageProperties) -> bool {
        properties
            .get("URL")
            .and_then(|p| p.get("url"))
            .and_then(Value::as_str)
            .is_some_and(|url| self.failing_urls.contains(url))
    }
}

fn api_error(code: &str, message: impl Into<String>) -> NotionError {
    NotionError::Api {
        status: 400,
        code: code.to_string(),
        message: message.into(),
    }
}

#[async_trait]
impl NotionDatabase for MockNotion {
    async fn retrieve_schema(&self) -> notion_client::Result<LiveSchema> {
        self.record(MockNotionCall::RetrieveSchema);
        Ok(self.schema())
    }

    async fn update_schema(&self, diff: &PropertyDiff) -> notion_client::Result<()> {
        self.record(MockNotionCall::UpdateSchema(diff.clone()));
        if self.fail_schema_update {
            return Err(api_error("validation_error", "Cannot update property type"));
        }

        let mut schema = self.schema.write().unwrap();
        for (name, change) in diff.iter() {
            let id = match &change.rename_from {
                Some(rename) => {
                    schema.remove(&rename.name);
                    rename.id.clone()
                }
                None => schema
                    .get(name)
                    .map(|p| p.id.clone())
                    .unwrap_or_else(|| format!("prop-{}", schema.len())),
            };
            schema.insert(
                name,
                LiveProperty {
                    id,
                    kind: change.kind.clone(),
                    config: change.config.clone(),
                },
            );
        }
        Ok(())
    }

    async fn query_pages(&self, url_property: &str, cursor: Option<String>) -> notion_client::Result<PageBatch> {
        self.record(MockNotionCall::QueryPages {
            cursor: cursor.clone(),
        });
        if self.fail_queries {
            return Err(api_error(
                "validation_error",
                format!("Could not find property with name or id: {url_property}"),
            ));
        }

        let pages = self.pages.read().unwrap();
        let start = cursor.and_then(|c| c.parse::<usize>().ok()).unwrap_or(0).min(pages.len());
        let end = (start + self.batch_size).min(pages.len());

        Ok(PageBatch {
            entries: pages[start..end].to_vec(),
            next_cursor: (end < pages.len()).then(|| end.to_string()),
        })
    }

    async fn create_page(&self, properties: &PageProperties) -> notion_client::Result<String> {
        self.record(MockNotionCall::CreatePage(properties.clone()));
        if self.rejects(properties) {
            return Err(api_error("validation_error", "body failed validation"));
        }

        let mut pages = self.pages.write().unwrap();
        let page_id = format!("page-{}", pages.len() + 1);
        if let Some(url) = properties
            .get("URL")
            .and_then(|p| p.get("url"))
            .and_then(Value::as_str)
        {
            pages.push((url.to_string(), page_id.clone()));
        }
        Ok(page_id)
    }

    async fn update_page(&self, page_id: &str, properties: &PageProperties) -> notion_client::Result<()> {
        self.record(MockNotionCall::UpdatePage {
            page_id: page_id.to_string(),
            properties: properties.clone(),
        });
        if self.rejects(properties) {
            return Err(api_error("validation_error", "body failed validation"));
        }
        Ok(())
    }
}

/// A live schema with exactly the desired names and types.
pub fn live_schema_matching(desired: &DesiredSchema) -> LiveSchema {
    desired
        .iter()
        .enumerate()
        .fold(LiveSchema::new(), |schema, (i, property)| {
            let id = if property.is_title {
                "title".to_string()
            } else {
                format!("prop-{i}")
            };
            schema.with_property(
                property.name.clone(),
                LiveProperty {
                    id,
                    kind: property.kind.clone(),
                    config: property.config.clone(),
                },
            )
        })
}
