use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;

use crate::ai::openai::DEFAULT_MODEL;
use crate::ai::prompt::{default_target_fields, parse_target_fields};
use crate::cache::DEFAULT_CACHE_PATH;
use crate::credentials::{SecretString, SiteCredentials};

pub const DEFAULT_ARTIFACT_DIR: &str = ".cache/artifacts";

/// `findy-scraper` configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub credentials: SiteCredentials,

    /// Absent key: every analysis is recorded as an error
    pub openai_api_key: Option<SecretString>,
    pub openai_model: String,
    pub target_fields: Vec<String>,
    pub cache_path: PathBuf,
    pub artifact_dir: PathBuf,
}

impl ScraperConfig {
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        let _ = dotenv();
        Self::from_vars(|key| env::var(key).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let email = required(&var, "FINDY_EMAIL")?;
        let password = required(&var, "FINDY_PASSWORD")?;

        let target_fields = var("OPENAI_TARGET_FIELDS")
            .map(|raw| parse_target_fields(&raw))
            .filter(|fields| !fields.is_empty())
            .unwrap_or_else(default_target_fields);

        Ok(Self {
            credentials: SiteCredentials::new(email, password),
            openai_api_key: non_empty(&var, "OPENAI_API_KEY").map(SecretString::from),
            openai_model: non_empty(&var, "OPENAI_MODEL_NAME").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            target_fields,
            cache_path: cache_path(&var),
            artifact_dir: non_empty(&var, "FINDY_ARTIFACT_DIR")
                .unwrap_or_else(|| DEFAULT_ARTIFACT_DIR.to_string())
                .into(),
        })
    }
}

/// `notion-updater` configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct UpdaterConfig {
    pub notion_api_key: SecretString,
    pub database_id: String,
    pub cache_path: PathBuf,
}

impl UpdaterConfig {
    pub fn from_env() -> Result<Self> {
        let _ = dotenv();
        Self::from_vars(|key| env::var(key).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            notion_api_key: required(&var, "NOTION_API_KEY")?.into(),
            database_id: required(&var, "NOTION_DATABASE_ID")?,
            cache_path: cache_path(&var),
        })
    }
}

fn non_empty(var: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    var(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn required(var: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    non_empty(var, key).with_context(|| format!("{key} must be set"))
}

fn cache_path(var: &impl Fn(&str) -> Option<String>) -> PathBuf {
    non_empty(var, "FINDY_CACHE_PATH")
        .unwrap_or_else(|| DEFAULT_CACHE_PATH.to_string())
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_scraper_defaults() {
        let config = ScraperConfig::from_vars(vars(&[
            ("FINDY_EMAIL", "me@example.com"),
            ("FINDY_PASSWORD", "pw"),
        ]))
        .unwrap();

        assert!(config.openai_api_key.is_none());
        assert_eq!(config.openai_model, "gpt-4o-mini");
        assert_eq!(config.target_fields.len(), 21);
        assert_eq!(config.cache_path, PathBuf::from(".cache/analyzed_findy_jobs.json"));
    }

    #[test]
    fn test_scraper_requires_credentials() {
        let err = ScraperConfig::from_vars(vars(&[("FINDY_EMAIL", "me@example.com")])).unwrap_err();
        assert!(err.to_string().contains("FINDY_PASSWORD"));
    }

    #[test]
    fn test_target_field_override() {
        let config = ScraperConfig::from_vars(vars(&[
            ("FINDY_EMAIL", "me@example.com"),
            ("FINDY_PASSWORD", "pw"),
            ("OPENAI_TARGET_FIELDS", "会社名, URL"),
            ("OPENAI_API_KEY", "sk-test"),
        ]))
        .unwrap();

        assert_eq!(config.target_fields, vec!["会社名", "URL"]);
        assert_eq!(config.openai_api_key.unwrap().expose(), "sk-test");
    }

    #[test]
    fn test_updater_requires_key_and_database() {
        assert!(UpdaterConfig::from_vars(vars(&[("NOTION_API_KEY", "secret")])).is_err());

        let config = UpdaterConfig::from_vars(vars(&[
            ("NOTION_API_KEY", "secret"),
            ("NOTION_DATABASE_ID", "db"),
            ("FINDY_CACHE_PATH", "/tmp/jobs.json"),
        ]))
        .unwrap();
        assert_eq!(config.cache_path, PathBuf::from("/tmp/jobs.json"));
        assert!(!format!("{config:?}").contains("secret"));
    }
}
