//! Database schema types: the schema we want, the schema Notion has, and
//! the diff between them.

use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use std::fmt;

/// Notion property type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyType {
    Title,
    RichText,
    Number,
    Url,
    Select,
    MultiSelect,
    Date,
    Checkbox,
    /// Any type this crate does not format natively (formula, people, ...)
    Other(String),
}

impl PropertyType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Title => "title",
            Self::RichText => "rich_text",
            Self::Number => "number",
            Self::Url => "url",
            Self::Select => "select",
            Self::MultiSelect => "multi_select",
            Self::Date => "date",
            Self::Checkbox => "checkbox",
            Self::Other(name) => name,
        }
    }
}

impl From<&str> for PropertyType {
    fn from(s: &str) -> Self {
        match s {
            "title" => Self::Title,
            "rich_text" => Self::RichText,
            "number" => Self::Number,
            "url" => Self::Url,
            "select" => Self::Select,
            "multi_select" => Self::MultiSelect,
            "date" => Self::Date,
            "checkbox" => Self::Checkbox,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One column we want the database to have.
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredProperty {
    pub name: String,
    pub kind: PropertyType,

    /// Type-specific configuration sent on create/retype
    pub config: Value,

    /// This entry names the database's title column
    pub is_title: bool,

    /// Operator-edited column: created, but never overwritten on update
    pub manual_only: bool,
}

impl DesiredProperty {
    pub fn new(name: impl Into<String>, kind: PropertyType) -> Self {
        Self {
            name: name.into(),
            kind,
            config: json!({}),
            is_title: false,
            manual_only: false,
        }
    }

    pub fn title(name: impl Into<String>) -> Self {
        Self {
            is_title: true,
            ..Self::new(name, PropertyType::Title)
        }
    }

    pub fn with_config(mut self, config: Value) -> Self {
        self.config = config;
        self
    }

    pub fn manual_only(mut self) -> Self {
        self.manual_only = true;
        self
    }
}

/// The fixed set of columns the sync maintains, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DesiredSchema {
    properties: IndexMap<String, DesiredProperty>,
}

impl DesiredSchema {
    pub fn new(properties: impl IntoIterator<Item = DesiredProperty>) -> Self {
        Self {
            properties: properties
                .into_iter()
                .map(|p| (p.name.clone(), p))
                .collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &DesiredProperty> {
        self.properties.values()
    }

    pub fn get(&self, name: &str) -> Option<&DesiredProperty> {
        self.properties.get(name)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// The single entry flagged as title. Errors when zero or several are.
    pub fn title(&self) -> Result<&DesiredProperty, String> {
        let mut titles = self.iter().filter(|p| p.is_title);
        match (titles.next(), titles.next()) {
            (Some(title), None) => Ok(title),
            (None, _) => Err("no property is flagged as the title column".into()),
            (Some(a), Some(b)) => Err(format!(
                "more than one title column: '{}' and '{}'",
                a.name, b.name
            )),
        }
    }

    /// Names of the operator-edited columns.
    pub fn manual_only_names(&self) -> impl Iterator<Item = &str> {
        self.iter().filter(|p| p.manual_only).map(|p| p.name.as_str())
    }
}

/// One column as it exists in the live database.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveProperty {
    pub id: String,
    pub kind: PropertyType,
    pub config: Value,
}

impl LiveProperty {
    pub fn new(id: impl Into<String>, kind: PropertyType) -> Self {
        Self {
            id: id.into(),
            kind,
            config: json!({}),
        }
    }
}

/// The live database's property set, keyed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveSchema {
    properties: IndexMap<String, LiveProperty>,
}

impl LiveSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_property(mut self, name: impl Into<String>, property: LiveProperty) -> Self {
        self.insert(name, property);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, property: LiveProperty) {
        self.properties.insert(name.into(), property);
    }

    pub fn get(&self, name: &str) -> Option<&LiveProperty> {
        self.properties.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<LiveProperty> {
        self.properties.shift_remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    pub fn kind_of(&self, name: &str) -> Option<&PropertyType> {
        self.get(name).map(|p| &p.kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &LiveProperty)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Name and definition of the title-typed column.
    pub fn title_property(&self) -> Option<(&str, &LiveProperty)> {
        self.iter().find(|(_, p)| p.kind == PropertyType::Title)
    }
}

/// A queued change to one property.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyChange {
    pub kind: PropertyType,
    pub config: Value,

    /// Set when an existing property (identified by id) is renamed
    pub rename_from: Option<Rename>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rename {
    pub name: String,
    pub id: String,
}

/// Target property name → change. Applied as one batch, then discarded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyDiff {
    changes: IndexMap<String, PropertyChange>,
}

impl PropertyDiff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_or_retype(&mut self, name: impl Into<String>, kind: PropertyType, config: Value) {
        self.changes.insert(
            name.into(),
            PropertyChange {
                kind,
                config,
                rename_from: None,
            },
        );
    }

    pub fn rename(&mut self, from: Rename, to: impl Into<String>, kind: PropertyType) {
        self.changes.insert(
            to.into(),
            PropertyChange {
                kind,
                config: json!({}),
                rename_from: Some(from),
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&PropertyChange> {
        self.changes.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyChange)> {
        self.changes.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Body of the database update call. Renames are keyed by property id,
    /// everything else by name.
    pub fn to_notion(&self) -> Map<String, Value> {
        self.changes
            .iter()
            .map(|(name, change)| {
                let key = change
                    .rename_from
                    .as_ref()
                    .map_or_else(|| name.clone(), |r| r.id.clone());
                let mut body = Map::new();
                body.insert("name".into(), Value::String(name.clone()));
                body.insert(change.kind.as_str().to_string(), change.config.clone());
                (key, Value::Object(body))
            })
            .collect()
    }
}
