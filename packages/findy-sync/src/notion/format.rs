//! Cache values → Notion property values.

use chrono::NaiveDate;
use serde_json::{json, Value};
use tracing::warn;

use crate::analysis::truncate_chars;
use crate::types::record::NOT_APPLICABLE;
use crate::types::schema::PropertyType;

/// Notion's limit for one rich text / title content block.
pub const MAX_TEXT_CHARS: usize = 2000;

pub const MAX_OPTION_CHARS: usize = 100;

/// URLs must be shorter than this.
pub const MAX_URL_CHARS: usize = 2001;

/// A value ready to send as one page property.
#[derive(Debug, Clone, PartialEq)]
pub enum FormattedValue {
    Title(String),
    RichText(String),
    Number(f64),
    Url(String),
    Select(String),
    MultiSelect(Vec<String>),
    Date(NaiveDate),
    Checkbox(bool),
}

impl FormattedValue {
    /// Property value in Notion's request shape.
    pub fn to_notion(&self) -> Value {
        match self {
            Self::Title(text) => json!({ "title": [text_block(text)] }),
            Self::RichText(text) => json!({ "rich_text": [text_block(text)] }),
            Self::Number(n) => json!({ "number": n }),
            Self::Url(url) => json!({ "url": url }),
            Self::Select(name) => json!({ "select": { "name": name } }),
            Self::MultiSelect(names) => {
                let options: Vec<Value> = names.iter().map(|n| json!({ "name": n })).collect();
                json!({ "multi_select": options })
            }
            Self::Date(date) => json!({ "date": { "start": date.format("%Y-%m-%d").to_string() } }),
            Self::Checkbox(b) => json!({ "checkbox": b }),
        }
    }
}

fn text_block(content: &str) -> Value {
    json!({ "type": "text", "text": { "content": content } })
}

/// Format `value` for a property of type `kind`.
///
/// `None` means "leave the property out of the request": null, the
/// not-applicable sentinel and values that cannot be represented.
pub fn format_value(kind: &PropertyType, value: &Value, today: NaiveDate) -> Option<FormattedValue> {
    if value.is_null() || value.as_str() == Some(NOT_APPLICABLE) {
        return None;
    }

    match kind {
        PropertyType::Title => Some(FormattedValue::Title(capped_text(value, MAX_TEXT_CHARS))),
        PropertyType::RichText => Some(FormattedValue::RichText(capped_text(value, MAX_TEXT_CHARS))),
        PropertyType::Number => format_number(value).map(FormattedValue::Number),
        PropertyType::Url => value
            .as_str()
            .filter(|u| u.starts_with("http") && u.chars().count() < MAX_URL_CHARS)
            .map(|u| FormattedValue::Url(u.to_string())),
        PropertyType::Select => {
            let name = capped_text(value, MAX_OPTION_CHARS);
            (!name.trim().is_empty()).then_some(FormattedValue::Select(name))
        }
        PropertyType::MultiSelect => Some(FormattedValue::MultiSelect(option_names(value))),
        PropertyType::Date => Some(FormattedValue::Date(today)),
        PropertyType::Checkbox => Some(FormattedValue::Checkbox(truthy(value))),
        PropertyType::Other(other) => {
            warn!(kind = %other, "Unsupported property type, formatting as rich text");
            Some(FormattedValue::RichText(capped_text(value, MAX_TEXT_CHARS)))
        }
    }
}

/// Number from a JSON number, or from a string with everything but digits,
/// the first decimal point and a leading minus removed.
pub fn format_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let negative = s.trim_start().starts_with('-');
            let mut cleaned = String::with_capacity(s.len());
            if negative {
                cleaned.push('-');
            }
            let mut seen_point = false;
            for c in s.chars().map(normalize_width) {
                if c.is_ascii_digit() {
                    cleaned.push(c);
                } else if c == '.' && !seen_point {
                    seen_point = true;
                    cleaned.push(c);
                }
            }
            cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
        }
        other => {
            warn!(value = %other, "Value is not numeric");
            None
        }
    }
}

/// Full-width digits and point to ASCII.
fn normalize_width(c: char) -> char {
    match c {
        '０'..='９' => char::from_u32(c as u32 - '０' as u32 + '0' as u32).unwrap_or(c),
        '．' => '.',
        c => c,
    }
}

fn option_names(value: &Value) -> Vec<String> {
    let names: Vec<String> = match value {
        Value::Array(items) => items
            .iter()
            .filter(|v| !v.is_null())
            .map(|v| as_text(v).trim().to_string())
            .collect(),
        Value::String(s) => s.split(',').map(|v| v.trim().to_string()).collect(),
        other => vec![as_text(other)],
    };

    names
        .into_iter()
        .filter(|n| !n.is_empty())
        .map(|n| truncate_chars(&n, MAX_OPTION_CHARS).to_string())
        .collect()
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => {
            let s = s.trim().to_lowercase();
            !(s.is_empty() || s == "false" || s == "no" || s == "0")
        }
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Null => false,
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .filter(|v| !v.is_null())
            .map(as_text)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

fn capped_text(value: &Value, max: usize) -> String {
    truncate_chars(&as_text(value), max).to_string()
}
