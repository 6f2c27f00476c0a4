//! Configuration loader and validator for the Markdown → WordPress mirror.
use crate::model::Language;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub wordpress: WordPress,
    pub languages: Languages,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    /// Optional log file; when set, log lines go there in addition to stderr.
    #[serde(default)]
    pub log_file: Option<String>,
    /// Directory names pruned from discovery (templates, drafts, vault tooling).
    #[serde(default = "default_excluded_folders")]
    pub excluded_folders: Vec<String>,
}

/// WordPress REST API endpoint and credentials (application password).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WordPress {
    pub url: String,
    pub username: String,
    pub app_password: String,
}

/// Two-language model: the default language and its translation counterpart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Languages {
    pub primary: LanguageSpec,
    pub secondary: SecondaryLanguageSpec,
}

/// Language code (front-matter/category key prefix) and Polylang locale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LanguageSpec {
    pub code: String,
    pub locale: String,
}

/// Secondary language additionally names the folders that hold translations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecondaryLanguageSpec {
    pub code: String,
    pub locale: String,
    #[serde(default = "default_secondary_folders")]
    pub folders: Vec<String>,
}

fn default_excluded_folders() -> Vec<String> {
    vec![
        "templates".to_string(),
        "drafts".to_string(),
        ".obsidian".to_string(),
    ]
}

fn default_secondary_folders() -> Vec<String> {
    vec!["english".to_string(), "en".to_string()]
}

impl Languages {
    pub fn code(&self, language: Language) -> &str {
        match language {
            Language::Primary => &self.primary.code,
            Language::Secondary => &self.secondary.code,
        }
    }

    pub fn locale(&self, language: Language) -> &str {
        match language {
            Language::Primary => &self.primary.locale,
            Language::Secondary => &self.secondary.locale,
        }
    }

    /// Front-matter key holding the category for the given language,
    /// e.g. `ko-category`.
    pub fn category_key(&self, language: Language) -> String {
        format!("{}-category", self.code(language))
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.wordpress.url.trim().is_empty() {
        return Err(ConfigError::Invalid("wordpress.url must be non-empty"));
    }
    if !cfg.wordpress.url.starts_with("http://") && !cfg.wordpress.url.starts_with("https://") {
        return Err(ConfigError::Invalid("wordpress.url must start with http(s)://"));
    }
    if cfg.wordpress.username.trim().is_empty() {
        return Err(ConfigError::Invalid("wordpress.username must be non-empty"));
    }
    if cfg.wordpress.app_password.trim().is_empty() {
        return Err(ConfigError::Invalid("wordpress.app_password must be non-empty"));
    }

    if cfg.languages.primary.code.trim().is_empty() {
        return Err(ConfigError::Invalid("languages.primary.code must be non-empty"));
    }
    if cfg.languages.primary.locale.trim().is_empty() {
        return Err(ConfigError::Invalid("languages.primary.locale must be non-empty"));
    }
    if cfg.languages.secondary.code.trim().is_empty() {
        return Err(ConfigError::Invalid("languages.secondary.code must be non-empty"));
    }
    if cfg.languages.secondary.locale.trim().is_empty() {
        return Err(ConfigError::Invalid("languages.secondary.locale must be non-empty"));
    }
    if cfg.languages.primary.code == cfg.languages.secondary.code {
        return Err(ConfigError::Invalid("primary and secondary language codes must differ"));
    }
    if cfg.languages.secondary.folders.is_empty() {
        return Err(ConfigError::Invalid("languages.secondary.folders must not be empty"));
    }

    Ok(())
}

/// Example configuration shipped with the tool.
pub fn example() -> &'static str {
    r#"app:
  log_file: "logs/wp-mirror.log"
  excluded_folders:
    - templates
    - drafts
    - .obsidian

wordpress:
  url: "https://blog.example.com"
  username: "editor"
  app_password: "YOUR_APPLICATION_PASSWORD"

languages:
  primary:
    code: "ko"
    locale: "ko_KR"
  secondary:
    code: "en"
    locale: "en_US"
    folders:
      - english
      - en
"#
}
