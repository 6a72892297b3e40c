//! Application configuration module
//!
//! Handles loading and validating configuration from environment variables.

use crate::clearing::SignalTieBreak;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Moderation engine configuration
#[derive(Debug, Clone)]
pub struct ModerationConfig {
    pub signal_tie_break: SignalTieBreak,
    /// Send post-commit notifications
    pub notify: bool,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            signal_tie_break: SignalTieBreak::FirstEncountered,
            notify: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "clearing_moderation=debug".to_string(),
            format: LogFormat::Compact,
        }
    }
}

/// Complete application settings
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub moderation: ModerationConfig,
    pub logging: LoggingConfig,
}

impl Settings {
    /// Load settings from environment variables
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists (ignore errors if file not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup; unset keys take defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let moderation = ModerationConfig {
            signal_tie_break: match lookup("MODERATION_SIGNAL_TIE_BREAK") {
                Some(value) => parse_tie_break(&value)?,
                None => ModerationConfig::default().signal_tie_break,
            },
            notify: match lookup("MODERATION_NOTIFY") {
                Some(value) => parse_bool("MODERATION_NOTIFY", &value)?,
                None => ModerationConfig::default().notify,
            },
        };

        let logging = LoggingConfig {
            filter: lookup("LOG_FILTER")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or_else(|| LoggingConfig::default().filter),
            format: match lookup("LOG_FORMAT") {
                Some(value) => parse_log_format(&value)?,
                None => LogFormat::default(),
            },
        };

        Ok(Self { moderation, logging })
    }
}

fn parse_tie_break(value: &str) -> Result<SignalTieBreak, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "first" => Ok(SignalTieBreak::FirstEncountered),
        "latest" => Ok(SignalTieBreak::MostRecent),
        other => Err(ConfigError::InvalidValue(format!(
            "MODERATION_SIGNAL_TIE_BREAK must be 'first' or 'latest', got '{}'",
            other
        ))),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(ConfigError::InvalidValue(format!("{} must be a boolean, got '{}'", key, other))),
    }
}

fn parse_log_format(value: &str) -> Result<LogFormat, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "compact" => Ok(LogFormat::Compact),
        "json" => Ok(LogFormat::Json),
        other => Err(ConfigError::InvalidValue(format!(
            "LOG_FORMAT must be 'compact' or 'json', got '{}'",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings.moderation.signal_tie_break, SignalTieBreak::FirstEncountered);
        assert!(settings.moderation.notify);
        assert_eq!(settings.logging.format, LogFormat::Compact);
        assert_eq!(settings.logging.filter, "clearing_moderation=debug");
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::from_lookup(lookup(&[
            ("MODERATION_SIGNAL_TIE_BREAK", "latest"),
            ("MODERATION_NOTIFY", "false"),
            ("RUST_LOG", "info"),
            ("LOG_FORMAT", "JSON"),
        ]))
        .unwrap();
        assert_eq!(settings.moderation.signal_tie_break, SignalTieBreak::MostRecent);
        assert!(!settings.moderation.notify);
        assert_eq!(settings.logging.filter, "info");
        assert_eq!(settings.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_log_filter_wins_over_rust_log() {
        let settings = Settings::from_lookup(lookup(&[("LOG_FILTER", "warn"), ("RUST_LOG", "info")])).unwrap();
        assert_eq!(settings.logging.filter, "warn");
    }

    #[test]
    fn test_invalid_values() {
        assert!(Settings::from_lookup(lookup(&[("MODERATION_SIGNAL_TIE_BREAK", "random")])).is_err());
        assert!(Settings::from_lookup(lookup(&[("MODERATION_NOTIFY", "maybe")])).is_err());
        assert!(Settings::from_lookup(lookup(&[("LOG_FORMAT", "xml")])).is_err());
    }
}
