//! Logging setup on the tracing ecosystem.
//!
//! # Environment Variables
//!
//! - `NOTECHAT_LOG`: Filter directive (like `RUST_LOG`), e.g., `notechat=debug`
//! - `NOTECHAT_LOG_FORMAT`: Output format for stderr: `pretty`, `json`, `compact`
//! - `NOTECHAT_LOG_DIR`: Directory for file logs (default `~/.notechat/logs`)
//!
//! # Configuration
//!
//! ```toml
//! [logging]
//! level = "warn"
//! format = "pretty"
//!
//! [logging.file]
//! enabled = false
//!
//! [logging.privacy]
//! log_content = "truncate"
//! truncate_length = 200
//! ```
//!
//! Message and summary text can be sensitive; call sites pass it through
//! [`redact_content`] before logging it. Keys and tokens are never logged.

use crate::Error;
use crate::config::LoggingConfig as ConfigLoggingConfig;
use std::env;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Log output format for stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Pretty, human-readable output with colors (default for TTY)
    #[default]
    Pretty,
    /// JSON output (one line per event)
    Json,
    /// Compact, single-line output
    Compact,
}

impl LogFormat {
    pub const VALUES: &[LogFormat] = &[LogFormat::Pretty, LogFormat::Json, LogFormat::Compact];

    pub fn parse_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pretty" => Some(LogFormat::Pretty),
            "json" => Some(LogFormat::Json),
            "compact" => Some(LogFormat::Compact),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
            LogFormat::Compact => "compact",
        }
    }
}

/// How much message content reaches the logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentLogging {
    /// Replace content with a placeholder.
    None,
    /// Keep the first `truncate_length` chars.
    #[default]
    Truncate,
    /// Log content in full.
    Full,
}

impl ContentLogging {
    pub fn parse_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" => Some(ContentLogging::None),
            "truncate" => Some(ContentLogging::Truncate),
            "full" => Some(ContentLogging::Full),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentLogging::None => "none",
            ContentLogging::Truncate => "truncate",
            ContentLogging::Full => "full",
        }
    }
}

impl FromStr for ContentLogging {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentLogging::parse_str(s).ok_or_else(|| format!("invalid content logging: {}", s))
    }
}

/// Privacy controls for conversation content in logs.
#[derive(Debug, Clone)]
pub struct PrivacyConfig {
    pub log_content: ContentLogging,
    pub truncate_length: usize,
}

impl Default for PrivacyConfig {
    fn default() -> Self {
        Self { log_content: ContentLogging::default(), truncate_length: 200 }
    }
}

/// Resolved logging settings.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Default log level for stderr output.
    pub level: String,
    pub format: LogFormat,
    /// Directory for daily-rotated JSON log files, when file logging is on.
    pub file_dir: Option<PathBuf>,
    pub privacy: PrivacyConfig,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "warn".to_string(), format: LogFormat::default(), file_dir: None, privacy: PrivacyConfig::default() }
    }
}

impl From<ConfigLoggingConfig> for LoggingConfig {
    fn from(config: ConfigLoggingConfig) -> Self {
        let format = LogFormat::parse_str(&config.format).unwrap_or_default();
        let log_content = ContentLogging::parse_str(&config.privacy.log_content).unwrap_or_default();
        let file_dir = if config.file.enabled {
            Some(config.file.directory.unwrap_or_else(default_log_dir))
        } else {
            None
        };

        Self {
            level: config.level,
            format,
            file_dir,
            privacy: PrivacyConfig { log_content, truncate_length: config.privacy.truncate_length },
        }
    }
}

impl LoggingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Build an EnvFilter from this config and environment variables.
    fn build_env_filter(&self) -> EnvFilter {
        let filter = env::var("NOTECHAT_LOG")
            .ok()
            .or_else(|| env::var("RUST_LOG").ok())
            .unwrap_or_else(|| self.level.clone());

        EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new("warn"))
    }

    fn is_tty() -> bool {
        atty::is(atty::Stream::Stderr)
    }

    /// Determine the appropriate format for stderr output.
    fn detect_format(&self) -> LogFormat {
        if let Ok(fmt_str) = env::var("NOTECHAT_LOG_FORMAT")
            && let Some(fmt) = LogFormat::parse_str(&fmt_str)
        {
            return fmt;
        }

        if self.format != LogFormat::Pretty {
            return self.format;
        }

        if Self::is_tty() { LogFormat::Pretty } else { LogFormat::Compact }
    }
}

/// `NOTECHAT_LOG_DIR`, else `~/.notechat/logs`, else `./.notechat/logs`
fn default_log_dir() -> PathBuf {
    if let Ok(custom_dir) = env::var("NOTECHAT_LOG_DIR") {
        return PathBuf::from(custom_dir);
    }

    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".notechat")
        .join("logs")
}

/// Initialize the global tracing subscriber.
///
/// Sets up an env-based filter (`NOTECHAT_LOG`, then `RUST_LOG`, then the
/// configured level), stderr output in the detected format, and, when a log
/// directory is configured, a daily-rotated JSON file layer.
///
/// The returned guard flushes the file writer on drop; keep it alive for the
/// lifetime of the process.
pub fn init_logging(config: Option<LoggingConfig>) -> Result<Option<WorkerGuard>, Error> {
    let config = config.unwrap_or_default();
    let env_filter = config.build_env_filter();
    let format = config.detect_format();

    let registry = Registry::default().with(env_filter);
    let init_err = |e: tracing_subscriber::util::TryInitError| Error::Other(format!("failed to init logging: {}", e));

    if let Some(log_dir) = &config.file_dir {
        std::fs::create_dir_all(log_dir).map_err(|e| Error::Other(format!("failed to create log directory: {}", e)))?;

        let file_appender = tracing_appender::rolling::daily(log_dir, "notechat.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        match format {
            LogFormat::Pretty => registry
                .with(fmt::layer().pretty().with_writer(io::stderr).with_ansi(true))
                .with(fmt::layer().json().with_writer(non_blocking.clone()))
                .try_init()
                .map_err(init_err)?,
            LogFormat::Json => registry
                .with(fmt::layer().json().with_writer(io::stderr))
                .with(fmt::layer().json().with_writer(non_blocking.clone()))
                .try_init()
                .map_err(init_err)?,
            LogFormat::Compact => registry
                .with(fmt::layer().compact().with_writer(io::stderr))
                .with(fmt::layer().json().with_writer(non_blocking.clone()))
                .try_init()
                .map_err(init_err)?,
        }

        return Ok(Some(guard));
    }

    match format {
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_writer(io::stderr).with_ansi(true))
            .try_init()
            .map_err(init_err)?,
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(io::stderr))
            .try_init()
            .map_err(init_err)?,
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_writer(io::stderr))
            .try_init()
            .map_err(init_err)?,
    }

    Ok(None)
}

/// Apply the privacy policy to conversation content before it is logged.
pub fn redact_content(content: &str, privacy: &PrivacyConfig) -> String {
    match privacy.log_content {
        ContentLogging::None => format!("[REDACTED {} chars]", content.chars().count()),
        ContentLogging::Full => content.to_string(),
        ContentLogging::Truncate => {
            let total = content.chars().count();
            if total <= privacy.truncate_length {
                return content.to_string();
            }
            let mut truncated = content.chars().take(privacy.truncate_length).collect::<String>();
            truncated.push_str("...");
            truncated.push_str(&format!(" ({} total chars)", total));
            truncated
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FileLoggingConfig, PrivacyLoggingConfig};

    #[test]
    fn test_log_format_from_str() {
        assert_eq!(LogFormat::parse_str("pretty"), Some(LogFormat::Pretty));
        assert_eq!(LogFormat::parse_str("JSON"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse_str("compact"), Some(LogFormat::Compact));
        assert_eq!(LogFormat::parse_str("invalid"), None);
    }

    #[test]
    fn test_log_format_as_str() {
        for format in LogFormat::VALUES {
            assert_eq!(LogFormat::parse_str(format.as_str()), Some(*format));
        }
    }

    #[test]
    fn test_content_logging_from_str() {
        assert_eq!("none".parse::<ContentLogging>(), Ok(ContentLogging::None));
        assert_eq!("TRUNCATE".parse::<ContentLogging>(), Ok(ContentLogging::Truncate));
        assert_eq!("full".parse::<ContentLogging>(), Ok(ContentLogging::Full));
        assert!("loud".parse::<ContentLogging>().is_err());
        assert_eq!(ContentLogging::Full.as_str(), "full");
    }

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "warn");
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.file_dir.is_none());
        assert_eq!(config.privacy.log_content, ContentLogging::Truncate);
    }

    #[test]
    fn test_logging_config_with_level() {
        let config = LoggingConfig::new().with_level("debug");
        assert_eq!(config.level, "debug");
        assert_eq!(config.format, LogFormat::Pretty);
    }

    #[test]
    fn test_init_logging_with_file_layer() {
        let temp = tempfile::TempDir::new().unwrap();
        let log_dir = temp.path().join("logs");
        let config =
            LoggingConfig { format: LogFormat::Json, file_dir: Some(log_dir.clone()), ..LoggingConfig::default() };

        let guard = init_logging(Some(config)).unwrap();
        assert!(guard.is_some());
        assert!(log_dir.is_dir());

        tracing::warn!("file layer installed");
        drop(guard);
    }

    #[test]
    fn test_from_config_section() {
        let section = ConfigLoggingConfig {
            level: "info".to_string(),
            format: "json".to_string(),
            file: FileLoggingConfig { enabled: true, directory: Some(PathBuf::from("/var/log/notechat")) },
            privacy: PrivacyLoggingConfig { log_content: "none".to_string(), truncate_length: 50 },
        };

        let config = LoggingConfig::from(section);
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.file_dir, Some(PathBuf::from("/var/log/notechat")));
        assert_eq!(config.privacy.log_content, ContentLogging::None);
        assert_eq!(config.privacy.truncate_length, 50);
    }

    #[test]
    fn test_from_config_section_file_disabled() {
        let config = LoggingConfig::from(ConfigLoggingConfig::default());
        assert!(config.file_dir.is_none());
    }

    #[test]
    fn test_redact_content_none() {
        let privacy = PrivacyConfig { log_content: ContentLogging::None, truncate_length: 100 };
        assert_eq!(redact_content("secret plans", &privacy), "[REDACTED 12 chars]");
    }

    #[test]
    fn test_redact_content_truncate() {
        let privacy = PrivacyConfig { log_content: ContentLogging::Truncate, truncate_length: 10 };

        let redacted = redact_content("abcdefghijklmnopqrstuvwxyz", &privacy);
        assert!(redacted.starts_with("abcdefghij..."));
        assert!(redacted.contains("26 total chars"));

        assert_eq!(redact_content("short", &privacy), "short");
    }

    #[test]
    fn test_redact_content_truncate_multibyte() {
        let privacy = PrivacyConfig { log_content: ContentLogging::Truncate, truncate_length: 2 };
        let redacted = redact_content("总结文本", &privacy);
        assert!(redacted.starts_with("总结..."));
    }

    #[test]
    fn test_redact_content_full() {
        let privacy = PrivacyConfig { log_content: ContentLogging::Full, truncate_length: 1 };
        let long_content = "a".repeat(200);
        assert_eq!(redact_content(&long_content, &privacy), long_content);
    }
}
