//! Configuration loading, validation, and management for SignalScope.
//!
//! Loads configuration from `~/.signalscope/config.toml` with environment
//! variable overrides. Validates all settings before use.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.signalscope/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Context compaction settings
    #[serde(default)]
    pub context: ContextConfig,

    /// Signal merge and feed settings
    #[serde(default)]
    pub signals: SignalsConfig,

    /// Relevance ranking settings
    #[serde(default)]
    pub ranking: RankingConfig,
}

/// Per-session context compaction settings. Immutable once a session starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextConfig {
    /// User turns kept verbatim
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Summarize older turns once the turn count exceeds this (0 disables)
    #[serde(default = "default_summarize_after")]
    pub summarize_after: usize,

    /// Shrink oversized tool results
    #[serde(default = "default_true")]
    pub tool_trim_enabled: bool,

    /// Character limit for results of unrecognized tools
    #[serde(default = "default_max_tool_payload_chars")]
    pub max_tool_payload_chars: usize,

    /// Output bound passed to the summarizer
    #[serde(default = "default_summary_max_tokens")]
    pub summary_max_tokens: u32,
}

fn default_max_turns() -> usize {
    10
}
fn default_summarize_after() -> usize {
    15
}
fn default_max_tool_payload_chars() -> usize {
    4000
}
fn default_summary_max_tokens() -> u32 {
    500
}
fn default_true() -> bool {
    true
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            summarize_after: default_summarize_after(),
            tool_trim_enabled: true,
            max_tool_payload_chars: default_max_tool_payload_chars(),
            summary_max_tokens: default_summary_max_tokens(),
        }
    }
}

impl ContextConfig {
    /// Whether summary injection is switched on (`summarize_after > 0`).
    pub fn summarization_enabled(&self) -> bool {
        self.summarize_after > 0
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_tool_payload_chars == 0 {
            return Err(ConfigError::ValidationError(
                "context.max_tool_payload_chars must be > 0".into(),
            ));
        }
        if self.summary_max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "context.summary_max_tokens must be > 0".into(),
            ));
        }
        if self.summarization_enabled() && self.summarize_after < self.max_turns {
            tracing::warn!(
                max_turns = self.max_turns,
                summarize_after = self.summarize_after,
                "summarize_after is below max_turns; summaries will cover turns as soon as they leave the window"
            );
        }
        Ok(())
    }
}

/// How connection side-channel maps from several results are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionMergePolicy {
    /// Keep the map from the last connection-bearing result
    #[default]
    LastWins,
    /// Union the adjacency sets of every connection-bearing result
    Union,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalsConfig {
    /// Trailing window used when a feed request names no dates
    #[serde(default = "default_window_days")]
    pub default_window_days: u32,

    /// Maximum entries returned by a feed
    #[serde(default = "default_max_feed_size")]
    pub max_feed_size: usize,

    #[serde(default)]
    pub connection_policy: ConnectionMergePolicy,
}

fn default_window_days() -> u32 {
    30
}
fn default_max_feed_size() -> usize {
    200
}

impl Default for SignalsConfig {
    fn default() -> Self {
        Self {
            default_window_days: default_window_days(),
            max_feed_size: default_max_feed_size(),
            connection_policy: ConnectionMergePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Add the flat bonus for previously liked profiles
    #[serde(default = "default_true")]
    pub liked_bonus_enabled: bool,

    /// Cap on ranked results (unset = no cap)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            liked_bonus_enabled: true,
            limit: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.signalscope/config.toml).
    ///
    /// Environment variables override file values:
    /// - `SIGNALSCOPE_MAX_TURNS`
    /// - `SIGNALSCOPE_SUMMARIZE_AFTER`
    /// - `SIGNALSCOPE_TOOL_TRIM` (`true` / `false`)
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".signalscope")
    }

    /// Apply overrides from an environment lookup.
    fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(v) = lookup("SIGNALSCOPE_MAX_TURNS") {
            self.context.max_turns = parse_env("SIGNALSCOPE_MAX_TURNS", &v)?;
        }
        if let Some(v) = lookup("SIGNALSCOPE_SUMMARIZE_AFTER") {
            self.context.summarize_after = parse_env("SIGNALSCOPE_SUMMARIZE_AFTER", &v)?;
        }
        if let Some(v) = lookup("SIGNALSCOPE_TOOL_TRIM") {
            self.context.tool_trim_enabled = parse_env("SIGNALSCOPE_TOOL_TRIM", &v)?;
        }
        Ok(())
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        self.context.validate()?;

        if self.signals.default_window_days == 0 {
            return Err(ConfigError::ValidationError(
                "signals.default_window_days must be > 0".into(),
            ));
        }

        if self.signals.max_feed_size == 0 {
            return Err(ConfigError::ValidationError(
                "signals.max_feed_size must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `config init`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::ValidationError(format!("{key} has invalid value {value:?}")))
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for signalscope_core::Error {
    fn from(err: ConfigError) -> Self {
        signalscope_core::Error::Config {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.context.max_turns, 10);
        assert_eq!(config.context.summarize_after, 15);
        assert!(config.context.tool_trim_enabled);
        assert_eq!(config.signals.connection_policy, ConnectionMergePolicy::LastWins);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.context, config.context);
        assert_eq!(parsed.signals, config.signals);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: AppConfig = toml::from_str(
            r#"
[context]
max_turns = 4

[signals]
connection_policy = "union"
"#,
        )
        .unwrap();
        assert_eq!(parsed.context.max_turns, 4);
        assert_eq!(parsed.context.summarize_after, 15);
        assert_eq!(parsed.signals.connection_policy, ConnectionMergePolicy::Union);
        assert_eq!(parsed.signals.max_feed_size, 200);
    }

    #[test]
    fn zero_payload_limit_rejected() {
        let mut config = AppConfig::default();
        config.context.max_tool_payload_chars = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_feed_size_rejected() {
        let mut config = AppConfig::default();
        config.signals.max_feed_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn summarize_after_below_max_turns_is_allowed() {
        let mut config = AppConfig::default();
        config.context.max_turns = 10;
        config.context.summarize_after = 3;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().context.max_turns, 10);
    }

    #[test]
    fn config_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[context]\nsummarize_after = 0\n").unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.context.summarize_after, 0);
        assert!(!config.context.summarization_enabled());
    }

    #[test]
    fn malformed_config_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[context\nmax_turns = ").unwrap();

        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("SIGNALSCOPE_MAX_TURNS", "3"),
            ("SIGNALSCOPE_TOOL_TRIM", "false"),
        ]);
        let mut config = AppConfig::default();
        config
            .apply_env_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.context.max_turns, 3);
        assert!(!config.context.tool_trim_enabled);
        assert_eq!(config.context.summarize_after, 15);
    }

    #[test]
    fn bad_env_override_rejected() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env_overrides(|k| (k == "SIGNALSCOPE_MAX_TURNS").then(|| "many".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("SIGNALSCOPE_MAX_TURNS"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("max_turns"));
        assert!(toml_str.contains("last_wins"));
    }

    #[test]
    fn config_error_converts_to_core_error() {
        let err: signalscope_core::Error = ConfigError::ValidationError("bad".into()).into();
        assert!(matches!(err, signalscope_core::Error::Config { .. }));
    }
}
