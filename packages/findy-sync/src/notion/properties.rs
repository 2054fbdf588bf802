//! The database layout the sync maintains.

use serde_json::json;

use crate::types::record::{COMPANY_FIELD, URL_FIELD};
use crate::types::schema::{DesiredProperty, DesiredSchema, PropertyType};

/// Name of the URL column; the natural key of every row.
pub const URL_PROPERTY: &str = URL_FIELD;

/// Name of the title column.
pub const TITLE_PROPERTY: &str = COMPANY_FIELD;

/// Date column refreshed with today's date on every write.
pub const LAST_MODIFIED_PROPERTY: &str = "最終更新日時";

/// Notion property name → cache field name, where they differ.
const RENAMED_FIELDS: [(&str, &str); 8] = [
    ("選考プロセス", "選考プロセス (ステップ概要)"),
    ("必須スキル/経験", "必須スキル/経験 (要約)"),
    ("歓迎スキル/経験", "歓迎スキル/経験 (要約)"),
    ("使用技術", "使用技術 (主要)"),
    ("フレックス", "フレックス (コアタイム)"),
    ("福利厚生", "福利厚生 (特筆事項)"),
    ("仕事の魅力", "仕事の魅力/アピール内容 (要約)"),
    ("求める人物像", "求める人物像 (要約)"),
];

const RICH_TEXT_PROPERTIES: [&str; 16] = [
    "状況",
    "選考プロセス",
    "職種",
    "事業ドメイン/業界",
    "社員数",
    "生成AI",
    "主な職務内容",
    "必須スキル/経験",
    "歓迎スキル/経験",
    "勤務地",
    "リモートワーク",
    "フレックス",
    "福利厚生",
    "仕事の魅力",
    "求める人物像",
    "特記事項",
];

const MANUAL_PROPERTIES: [&str; 2] = ["メモ", "技術力"];

/// The desired schema, in column order.
pub fn desired_schema() -> DesiredSchema {
    let mut properties = vec![
        DesiredProperty::title(TITLE_PROPERTY),
        DesiredProperty::new(URL_PROPERTY, PropertyType::Url),
    ];
    properties.extend(
        RICH_TEXT_PROPERTIES
            .iter()
            .map(|name| DesiredProperty::new(*name, PropertyType::RichText)),
    );
    for name in ["給与下限(万)", "給与上限(万)"] {
        properties.push(
            DesiredProperty::new(name, PropertyType::Number).with_config(json!({"format": "number"})),
        );
    }
    properties.push(
        DesiredProperty::new("使用技術", PropertyType::MultiSelect).with_config(json!({"options": []})),
    );
    properties.push(DesiredProperty::new(LAST_MODIFIED_PROPERTY, PropertyType::Date));
    properties.extend(
        MANUAL_PROPERTIES
            .iter()
            .map(|name| DesiredProperty::new(*name, PropertyType::RichText).manual_only()),
    );

    DesiredSchema::new(properties)
}

/// Cache field feeding a Notion property.
pub fn source_field(property: &str) -> &str {
    RENAMED_FIELDS
        .iter()
        .find(|(notion, _)| *notion == property)
        .map_or(property, |(_, field)| *field)
}
