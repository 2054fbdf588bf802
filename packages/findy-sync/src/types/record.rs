//! Analysis results as stored in the cache file.
//!
//! A record is a typed envelope (origin title, origin link, error marker)
//! around an ordered map of extracted fields. Field names are the Japanese
//! labels the extraction prompt asks for; the envelope keys are fixed.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

/// Extracted field name → value (string, number, list or null).
pub type FieldMap = IndexMap<String, Value>;

pub const ORIGIN_TITLE_KEY: &str = "元タイトル";
pub const ORIGIN_LINK_KEY: &str = "元リンク";
pub const ERROR_KEY: &str = "エラー";
pub const RAW_RESPONSE_KEY: &str = "LLM応答";

/// Field holding the posting URL reported by the extraction.
pub const URL_FIELD: &str = "URL";

/// Field holding the company name.
pub const COMPANY_FIELD: &str = "会社名";

/// Value the extraction uses for "not applicable".
pub const NOT_APPLICABLE: &str = "該当なし";

const RESERVED_KEYS: [&str; 4] = [ORIGIN_TITLE_KEY, ORIGIN_LINK_KEY, ERROR_KEY, RAW_RESPONSE_KEY];

/// One analyzed (or failed) job posting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    #[serde(flatten)]
    pub fields: FieldMap,

    #[serde(rename = "元タイトル", default)]
    pub origin_title: String,

    /// Stable identity of the record
    #[serde(rename = "元リンク", default)]
    pub origin_link: String,

    /// Present when analysis failed; such records are retried on the next run
    #[serde(
        rename = "エラー",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_error_marker"
    )]
    pub error: Option<String>,

    #[serde(rename = "LLM応答", default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

impl CacheRecord {
    pub fn new(origin_title: impl Into<String>, origin_link: impl Into<String>) -> Self {
        Self {
            fields: FieldMap::new(),
            origin_title: origin_title.into(),
            origin_link: origin_link.into(),
            error: None,
            raw_response: None,
        }
    }

    /// A record marking a failed analysis.
    pub fn failed(
        origin_title: impl Into<String>,
        origin_link: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(origin_title, origin_link)
        }
    }

    /// Merge extracted fields with the origin data.
    ///
    /// Blank `URL` falls back to the origin link and blank `会社名` to the
    /// origin title.
    pub fn from_extraction(
        origin_title: impl Into<String>,
        origin_link: impl Into<String>,
        mut fields: FieldMap,
    ) -> Self {
        for key in RESERVED_KEYS {
            fields.shift_remove(key);
        }

        let mut record = Self {
            fields,
            ..Self::new(origin_title, origin_link)
        };

        if record.fields.get(URL_FIELD).map_or(true, is_blank) {
            warn!(title = %record.origin_title, "Extraction returned no URL, using origin link");
            record
                .fields
                .insert(URL_FIELD.to_string(), Value::String(record.origin_link.clone()));
        }
        if record.fields.get(COMPANY_FIELD).map_or(true, is_blank) {
            warn!(title = %record.origin_title, "Extraction returned no company name, using origin title");
            record
                .fields
                .insert(COMPANY_FIELD.to_string(), Value::String(record.origin_title.clone()));
        }

        record
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn with_raw_response(mut self, raw: impl Into<String>) -> Self {
        self.raw_response = Some(raw.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn has_error(&self) -> bool {
        self.error.as_deref().is_some_and(|e| !e.is_empty())
    }

    /// The extracted `URL` field, if it is a non-empty string.
    pub fn url(&self) -> Option<&str> {
        self.fields
            .get(URL_FIELD)
            .and_then(Value::as_str)
            .filter(|u| !u.is_empty())
    }

    /// Key of this record in the cache store: origin link, or the URL field
    /// for records written without one.
    pub fn cache_key(&self) -> Option<&str> {
        Some(self.origin_link.as_str())
            .filter(|l| !l.is_empty())
            .or_else(|| self.url())
    }

    /// Identity of this record in the Notion database: URL field, else
    /// origin link.
    pub fn natural_key(&self) -> Option<&str> {
        self.url()
            .or_else(|| Some(self.origin_link.as_str()).filter(|l| !l.is_empty()))
    }
}

/// Null, empty strings and empty collections count as "not provided".
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

/// Accept any JSON value as an error marker: blank values mean "no error",
/// non-string values are kept as their JSON text.
fn deserialize_error_marker<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Bool(false)) => None,
        Some(v) if is_blank(&v) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}
