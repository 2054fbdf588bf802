//! Extraction prompt.

use crate::types::record::NOT_APPLICABLE;

/// Fields requested when `OPENAI_TARGET_FIELDS` is not set.
pub const DEFAULT_TARGET_FIELDS: [&str; 21] = [
    "会社名",
    "URL",
    "状況",
    "選考プロセス (ステップ概要)",
    "職種",
    "事業ドメイン/業界",
    "社員数",
    "生成AI",
    "給与下限(万)",
    "給与上限(万)",
    "主な職務内容",
    "必須スキル/経験 (要約)",
    "歓迎スキル/経験 (要約)",
    "使用技術 (主要)",
    "勤務地",
    "リモートワーク",
    "フレックス (コアタイム)",
    "福利厚生 (特筆事項)",
    "仕事の魅力/アピール内容 (要約)",
    "求める人物像 (要約)",
    "特記事項",
];

pub fn default_target_fields() -> Vec<String> {
    DEFAULT_TARGET_FIELDS.iter().map(|f| f.to_string()).collect()
}

/// Parse a comma-separated field list. Blank entries are dropped; an
/// empty result means "use the defaults".
pub fn parse_target_fields(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(String::from)
        .collect()
}

pub fn build_user_prompt(text: &str, title: &str, link: &str, fields: &[String]) -> String {
    let field_list = serde_json::to_string_pretty(fields).unwrap_or_else(|_| fields.join(", "));

    format!(
        r#"以下の求人ページのテキストコンテンツから、指定された項目を抽出し、JSON形式で回答してください。
項目が存在しない場合は、null または "{NOT_APPLICABLE}" としてください。
URLは必ず抽出してください。存在しない場合は元のURL `{link}` を使用してください。
会社名は必ず抽出してください。存在しない場合はタイトル `{title}` から推測してください。
回答はJSONオブジェクトのみを出力してください。

求人タイトル: 「{title}」
求人URL: 「{link}」

抽出項目:
{field_list}

解析対象テキスト:
---
{text}
---

JSON出力:
"#
    )
}
