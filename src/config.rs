use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::bank::GENERAL_KNOWLEDGE;
use crate::generator::llm::{ProviderKind, ProviderSettings};
use crate::quiz::Difficulty;

pub const API_TOKEN_ENV: &str = "EXAMACE_API_TOKEN";

pub const MIN_QUESTIONS: usize = 3;
pub const MAX_QUESTIONS: usize = 30;
pub const MIN_TIME_LIMIT: u32 = 1;
pub const MAX_TIME_LIMIT: u32 = 120;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_subject")]
    pub subject: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default = "default_question_count")]
    pub question_count: usize,
    /// Minutes; no limit when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<u32>,
    #[serde(default)]
    pub auto_submit: bool,
    #[serde(default = "default_show_explanations")]
    pub show_explanations: bool,

    /// Backend base URL. Empty means quizzes are built locally.
    #[serde(default)]
    pub api_base: String,

    /// Direct LLM provider used when no backend is configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_provider: Option<ProviderKind>,
    #[serde(default)]
    pub llm_base_url: String,
    #[serde(default)]
    pub llm_model: String,
    #[serde(default)]
    pub llm_api_key: String,
    #[serde(default = "default_llm_health_timeout_secs")]
    pub llm_health_timeout_secs: u64,

    /// Extra question bank files (`*.json`) merged over the built-in bank.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_dir: Option<PathBuf>,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_subject() -> String {
    GENERAL_KNOWLEDGE.to_string()
}
fn default_question_count() -> usize {
    10
}
fn default_show_explanations() -> bool {
    true
}
fn default_llm_health_timeout_secs() -> u64 {
    3
}
fn default_history_limit() -> usize {
    500
}

impl Default for Config {
    fn default() -> Self {
        Self {
            subject: default_subject(),
            difficulty: Difficulty::default(),
            question_count: default_question_count(),
            time_limit: None,
            auto_submit: false,
            show_explanations: default_show_explanations(),
            api_base: String::new(),
            llm_provider: None,
            llm_base_url: String::new(),
            llm_model: String::new(),
            llm_api_key: String::new(),
            llm_health_timeout_secs: default_llm_health_timeout_secs(),
            bank_dir: None,
            history_limit: default_history_limit(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            let mut config: Config = toml::from_str(&content)
                .with_context(|| format!("parsing {}", path.display()))?;
            config.validate();
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("examace")
            .join("config.toml")
    }

    /// Clamp values a hand-edited file may have pushed out of range.
    pub fn validate(&mut self) {
        self.question_count = self.question_count.clamp(MIN_QUESTIONS, MAX_QUESTIONS);
        self.time_limit = self
            .time_limit
            .map(|m| m.clamp(MIN_TIME_LIMIT, MAX_TIME_LIMIT));
        if self.subject.trim().is_empty() {
            self.subject = default_subject();
        }
        self.llm_health_timeout_secs = self.llm_health_timeout_secs.max(1);
        self.history_limit = self.history_limit.max(1);
        self.api_base = self.api_base.trim().trim_end_matches('/').to_string();
    }

    pub fn api_token() -> Option<String> {
        std::env::var(API_TOKEN_ENV)
            .ok()
            .filter(|t| !t.trim().is_empty())
    }

    pub fn backend_configured(&self) -> bool {
        !self.api_base.is_empty()
    }

    pub fn provider_settings(&self) -> Option<ProviderSettings> {
        let kind = self.llm_provider?;
        let mut settings =
            ProviderSettings::new(kind, &self.llm_base_url, &self.llm_model, &self.llm_api_key);
        settings.health_timeout = Duration::from_secs(self.llm_health_timeout_secs);
        Some(settings)
    }

    /// Copy for display, with the LLM key masked.
    pub fn redacted(&self) -> Self {
        let mut shown = self.clone();
        if !shown.llm_api_key.is_empty() {
            shown.llm_api_key = "********".to_string();
        }
        shown
    }

    /// Update one field from its string form, as used by `config set`.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let unset = |v: &str| v.is_empty() || v.eq_ignore_ascii_case("none");
        match key {
            "subject" => self.subject = value.to_string(),
            "difficulty" => self.difficulty = value.parse()?,
            "question_count" => self.question_count = value.parse()?,
            "time_limit" => {
                self.time_limit = if unset(value) {
                    None
                } else {
                    Some(value.parse()?)
                }
            }
            "auto_submit" => self.auto_submit = value.parse()?,
            "show_explanations" => self.show_explanations = value.parse()?,
            "api_base" => self.api_base = value.to_string(),
            "llm_provider" => {
                self.llm_provider = if unset(value) {
                    None
                } else {
                    Some(value.parse()?)
                }
            }
            "llm_base_url" => self.llm_base_url = value.to_string(),
            "llm_model" => self.llm_model = value.to_string(),
            "llm_api_key" => self.llm_api_key = value.to_string(),
            "llm_health_timeout_secs" => self.llm_health_timeout_secs = value.parse()?,
            "bank_dir" => {
                self.bank_dir = if unset(value) {
                    None
                } else {
                    Some(PathBuf::from(value))
                }
            }
            "history_limit" => self.history_limit = value.parse()?,
            _ => bail!("Unknown config key: {key}"),
        }
        self.validate();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_from_empty_file() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.subject, "General Knowledge");
        assert_eq!(config.difficulty, Difficulty::Beginner);
        assert_eq!(config.question_count, 10);
        assert!(config.show_explanations);
        assert!(!config.backend_configured());
        assert!(config.provider_settings().is_none());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config: Config = toml::from_str(
            r#"
subject = "Physics"
difficulty = "advanced"
time_limit = 15
llm_provider = "local"
"#,
        )
        .unwrap();
        assert_eq!(config.subject, "Physics");
        assert_eq!(config.difficulty, Difficulty::Advanced);
        assert_eq!(config.time_limit, Some(15));
        assert_eq!(config.question_count, 10);
        let settings = config.provider_settings().unwrap();
        assert_eq!(settings.kind, ProviderKind::Local);
        assert_eq!(settings.health_timeout, Duration::from_secs(3));
    }

    #[test]
    fn validate_clamps_values() {
        let mut config = Config {
            question_count: 99,
            time_limit: Some(0),
            subject: "  ".to_string(),
            api_base: " http://localhost:8000/ ".to_string(),
            ..Config::default()
        };
        config.validate();
        assert_eq!(config.question_count, 30);
        assert_eq!(config.time_limit, Some(1));
        assert_eq!(config.subject, "General Knowledge");
        assert_eq!(config.api_base, "http://localhost:8000");

        config.question_count = 1;
        config.time_limit = Some(500);
        config.validate();
        assert_eq!(config.question_count, 3);
        assert_eq!(config.time_limit, Some(120));
    }

    #[test]
    fn set_parses_and_clamps() {
        let mut config = Config::default();
        config.set("difficulty", "Intermediate").unwrap();
        config.set("question_count", "50").unwrap();
        config.set("time_limit", "20").unwrap();
        config.set("llm_provider", "mistral").unwrap();
        assert_eq!(config.difficulty, Difficulty::Intermediate);
        assert_eq!(config.question_count, 30);
        assert_eq!(config.time_limit, Some(20));
        assert_eq!(config.llm_provider, Some(ProviderKind::Mistral));

        config.set("time_limit", "none").unwrap();
        assert_eq!(config.time_limit, None);

        assert!(config.set("theme", "dark").is_err());
        assert!(config.set("difficulty", "expert").is_err());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config {
            subject: "Networking".to_string(),
            time_limit: Some(30),
            auto_submit: true,
            bank_dir: Some(PathBuf::from("/srv/banks")),
            ..Config::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn redacted_masks_only_the_key() {
        let config = Config {
            llm_api_key: "sk-live-123".to_string(),
            llm_model: "gpt-4o-mini".to_string(),
            ..Config::default()
        };
        let shown = config.redacted();
        assert_eq!(shown.llm_api_key, "********");
        assert_eq!(shown.llm_model, "gpt-4o-mini");
        let text = toml::to_string_pretty(&shown).unwrap();
        assert!(!text.contains("sk-live-123"));

        assert_eq!(Config::default().redacted().llm_api_key, "");
    }
}
