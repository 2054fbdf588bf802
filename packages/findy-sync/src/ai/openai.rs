use async_trait::async_trait;
use openai_client::{strip_code_blocks, ChatRequest, Message, OpenAIClient};
use std::time::Duration;
use tracing::{debug, info};

use super::prompt::{build_user_prompt, default_target_fields};
use crate::credentials::SecretString;
use crate::error::ExtractError;
use crate::traits::extractor::FieldExtractor;
use crate::types::record::FieldMap;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

const TEMPERATURE: f32 = 0.2;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

/// [`FieldExtractor`] that asks an OpenAI model for a JSON object.
///
/// Without an API key every call fails with [`ExtractError::MissingApiKey`]
/// and no request is made.
pub struct OpenAIFieldExtractor {
    client: Option<OpenAIClient>,
    model: String,
    target_fields: Vec<String>,
}

impl OpenAIFieldExtractor {
    pub fn new(api_key: Option<&SecretString>, model: impl Into<String>) -> Self {
        let client = api_key
            .filter(|k| !k.is_empty())
            .map(|k| OpenAIClient::new(k.expose()).with_timeout(REQUEST_TIMEOUT));
        Self {
            client,
            model: model.into(),
            target_fields: default_target_fields(),
        }
    }

    /// Replace the requested fields. An empty list keeps the defaults.
    pub fn with_target_fields(mut self, fields: Vec<String>) -> Self {
        if !fields.is_empty() {
            self.target_fields = fields;
        }
        self
    }

    pub fn target_fields(&self) -> &[String] {
        &self.target_fields
    }
}

#[async_trait]
impl FieldExtractor for OpenAIFieldExtractor {
    async fn extract(&self, text: &str, title: &str, link: &str) -> Result<FieldMap, ExtractError> {
        let client = self.client.as_ref().ok_or(ExtractError::MissingApiKey)?;

        info!(title = %title, model = %self.model, "Requesting field extraction");
        let request = ChatRequest::new(&self.model)
            .message(Message::user(build_user_prompt(
                text,
                title,
                link,
                &self.target_fields,
            )))
            .temperature(TEMPERATURE)
            .json_object();

        let response = client
            .chat_completion(request)
            .await
            .map_err(|e| ExtractError::Api(e.to_string()))?;

        parse_fields(&response.content)
    }
}

/// Parse model output into a field map. Anything but a JSON object fails.
pub(crate) fn parse_fields(content: &str) -> Result<FieldMap, ExtractError> {
    serde_json::from_str(strip_code_blocks(content)).map_err(|e| {
        let preview: String = content.chars().take(500).collect();
        debug!(response = %preview, "Unparseable extraction response");
        ExtractError::Parse {
            message: e.to_string(),
            raw: content.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_missing_key_fails_without_request() {
        let extractor = OpenAIFieldExtractor::new(None, DEFAULT_MODEL);
        let result = extractor.extract("T", "A", "https://x/1").await;
        assert!(matches!(result, Err(ExtractError::MissingApiKey)));
    }

    #[test]
    fn test_empty_field_override_keeps_defaults() {
        let extractor = OpenAIFieldExtractor::new(None, DEFAULT_MODEL).with_target_fields(vec![]);
        assert_eq!(extractor.target_fields().len(), 21);
    }

    #[test]
    fn test_parse_fields_accepts_fenced_object_in_order() {
        let fields = parse_fields("```json\n{\"会社名\": \"ACME\", \"給与下限(万)\": 600}\n```").unwrap();
        let keys: Vec<_> = fields.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["会社名", "給与下限(万)"]);
        assert_eq!(fields["給与下限(万)"], json!(600));
    }

    #[test]
    fn test_parse_fields_rejects_non_objects_and_keeps_raw() {
        let err = parse_fields("[1, 2]").unwrap_err();
        assert_eq!(err.raw_response(), Some("[1, 2]"));
    }
}
