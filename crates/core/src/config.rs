use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::presets::SystemPreset;

/// Environment variable holding the completion API key
pub const API_KEY_ENV: &str = "NOTECHAT_API_KEY";
/// Environment variables holding the Notion integration token
pub const NOTION_TOKEN_ENV: &[&str] = &["NOTION_TOKEN", "notion_token"];
/// Environment variables holding the Notion database id
pub const NOTION_DATABASE_ENV: &[&str] = &["NOTION_DATABASE_ID", "database_id"];

/// Key sent when nothing else is configured (local vLLM servers accept anything)
pub const DEFAULT_API_KEY: &str = "vllm";

/// Completion endpoint defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompletionConfig {
    /// Full chat-completions URL
    pub api_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Stream replies by default
    pub stream: bool,
    /// System-message preset used when `system_message` is unset
    pub preset: String,
    /// Explicit system message, overrides `preset`
    pub system_message: Option<String>,
    /// API key (the environment takes precedence)
    pub api_key: Option<String>,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8001/v1/chat/completions".to_string(),
            model: "Qwen3-32B".to_string(),
            temperature: 0.7,
            max_tokens: 12800,
            stream: true,
            preset: SystemPreset::default().as_str().to_string(),
            system_message: None,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SummaryConfig {
    /// Instruction placed before the transcript
    pub prompt: String,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self { prompt: "Summarize the following conversation, highlighting the key points and conclusions:".to_string() }
    }
}

/// Notion connection and database property names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NotionConfig {
    pub api_base: String,
    pub token: Option<String>,
    pub database_id: Option<String>,
    /// Title-typed property that receives the timestamp title
    pub title_property: String,
    /// Rich-text property that receives the summary
    pub summary_property: String,
    /// Date property that receives the ISO-8601 timestamp
    pub timestamp_property: String,
}

impl Default for NotionConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.notion.com".to_string(),
            token: None,
            database_id: None,
            title_property: "Time".to_string(),
            summary_property: "Summary".to_string(),
            timestamp_property: "Timestamp".to_string(),
        }
    }
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty`, `json` or `compact`
    pub format: String,
    pub file: FileLoggingConfig,
    pub privacy: PrivacyLoggingConfig,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "pretty".to_string(),
            file: FileLoggingConfig::default(),
            privacy: PrivacyLoggingConfig::default(),
        }
    }
}

/// `[logging.file]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileLoggingConfig {
    pub enabled: bool,
    /// Log directory (default: `~/.notechat/logs`)
    pub directory: Option<PathBuf>,
}

/// `[logging.privacy]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrivacyLoggingConfig {
    /// `none`, `truncate` or `full`
    pub log_content: String,
    pub truncate_length: usize,
}

impl Default for PrivacyLoggingConfig {
    fn default() -> Self {
        Self { log_content: "truncate".to_string(), truncate_length: 200 }
    }
}

/// Root configuration structure for notechat.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub completion: CompletionConfig,
    pub summary: SummaryConfig,
    pub notion: NotionConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML string
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(toml_str).map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load from `path` if it exists, otherwise fall back to defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            tracing::debug!(path = %path.display(), "loading config");
            Self::from_file(path)
        } else {
            tracing::debug!(path = %path.display(), "config not found, using defaults");
            Ok(Self::default())
        }
    }

    /// The system message for new requests: explicit message, else the preset's
    pub fn system_message(&self) -> String {
        match &self.completion.system_message {
            Some(message) => message.clone(),
            None => SystemPreset::message_for(&self.completion.preset).to_string(),
        }
    }

    /// Per-request parameters built from the configured defaults
    pub fn completion_params(&self) -> CompletionParams {
        CompletionParams {
            api_url: self.completion.api_url.clone(),
            model: self.completion.model.clone(),
            temperature: self.completion.temperature,
            max_tokens: self.completion.max_tokens,
            stream: self.completion.stream,
        }
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        let completion = &self.completion;

        if completion.api_url.trim().is_empty() {
            return Err(ConfigError::Invalid("completion.api_url must not be empty".to_string()).into());
        }

        if !(0.0..=2.0).contains(&completion.temperature) {
            return Err(ConfigError::Invalid(format!(
                "completion.temperature must be within 0.0..=2.0, got {}",
                completion.temperature
            ))
            .into());
        }

        if completion.max_tokens == 0 {
            return Err(ConfigError::Invalid("completion.max_tokens must be positive".to_string()).into());
        }

        completion.preset.parse::<SystemPreset>()?;

        Ok(())
    }

    /// Get example configuration (as a string)
    pub fn example() -> &'static str {
        r#"# notechat configuration
# Secrets may also come from the environment (or a .env file):
#   NOTECHAT_API_KEY, NOTION_TOKEN, NOTION_DATABASE_ID

[completion]
# OpenAI-compatible chat-completions endpoint
api_url = "http://localhost:8001/v1/chat/completions"
model = "Qwen3-32B"
temperature = 0.7
max_tokens = 12800
# Stream replies as they are generated
stream = true
# System-message preset: "no-think" or "default"
preset = "no-think"
# Explicit system message (overrides the preset)
# system_message = "You are a terse assistant."
# api_key = "sk-..."

[summary]
prompt = "Summarize the following conversation, highlighting the key points and conclusions:"

[notion]
api_base = "https://api.notion.com"
# token = "secret_..."
# database_id = "..."
title_property = "Time"
summary_property = "Summary"
timestamp_property = "Timestamp"

[logging]
level = "warn"
format = "pretty"

[logging.file]
enabled = false

[logging.privacy]
# How much message content reaches the logs: "none", "truncate" or "full"
log_content = "truncate"
truncate_length = 200
"#
    }
}

/// Parameters the caller supplies with each completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionParams {
    pub api_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub stream: bool,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Config::default().completion_params()
    }
}

impl CompletionParams {
    /// Same parameters with streaming switched on or off
    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }
}

/// Process-wide secrets, resolved once at startup
#[derive(Clone, PartialEq, Eq)]
pub struct Secrets {
    pub api_key: String,
    pub notion_token: Option<String>,
    pub notion_database_id: Option<String>,
}

impl Secrets {
    /// Resolve secrets from the process environment, then the config file
    pub fn from_env(config: &Config) -> Self {
        Self::resolve(config, |name| std::env::var(name).ok())
    }

    /// Resolve secrets with an arbitrary variable lookup
    pub fn resolve(config: &Config, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let api_key = first_set(&lookup, &[API_KEY_ENV])
            .or_else(|| config.completion.api_key.clone())
            .unwrap_or_else(|| DEFAULT_API_KEY.to_string());

        Self {
            api_key,
            notion_token: first_set(&lookup, NOTION_TOKEN_ENV).or_else(|| config.notion.token.clone()),
            notion_database_id: first_set(&lookup, NOTION_DATABASE_ENV)
                .or_else(|| config.notion.database_id.clone()),
        }
    }

    pub fn notion_token(&self) -> Result<&str> {
        self.notion_token.as_deref().ok_or(crate::Error::MissingSecret("NOTION_TOKEN"))
    }

    pub fn notion_database_id(&self) -> Result<&str> {
        self.notion_database_id
            .as_deref()
            .ok_or(crate::Error::MissingSecret("NOTION_DATABASE_ID"))
    }
}

/// First non-blank value among `names`
fn first_set(lookup: &impl Fn(&str) -> Option<String>, names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| lookup(name).filter(|value| !value.trim().is_empty()))
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |present: bool| if present { "<redacted>" } else { "<unset>" };
        f.debug_struct("Secrets")
            .field("api_key", &redact(!self.api_key.is_empty()))
            .field("notion_token", &redact(self.notion_token.is_some()))
            .field("notion_database_id", &self.notion_database_id)
            .finish()
    }
}

/// Configuration plus secrets; built once and shared read-only
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub config: Config,
    pub secrets: Secrets,
}

impl AppConfig {
    pub fn new(config: Config, secrets: Secrets) -> Self {
        Self { config, secrets }
    }

    /// Load the config file (or defaults) and resolve secrets from the environment
    pub fn load(path: &Path) -> Result<Self> {
        let config = Config::load_or_default(path)?;
        let secrets = Secrets::from_env(&config);
        Ok(Self { config, secrets })
    }
}

/// Configuration-specific errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Unknown system-message preset
    #[error("unknown system preset: {0}")]
    UnknownPreset(String),

    /// A value is out of range or malformed
    #[error("invalid value: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    TomlParse(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::TomlParse(err.to_string())
    }
}
