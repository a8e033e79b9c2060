//! Configuration management for Remindr
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::api::types::Priority;
use crate::error::{RemindrError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure for Remindr
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Backend API settings
    #[serde(default)]
    pub api: ApiConfig,
    /// Debounced text analysis settings
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// Where the session token and cached profile are kept
    #[serde(default)]
    pub session: SessionConfig,
    /// Due-alert settings for `watch`
    #[serde(default)]
    pub alerts: AlertsConfig,
    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the reminder backend (e.g. `http://localhost:8000`)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout (seconds)
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl ApiConfig {
    /// Request timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Debounced analysis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Quiet period after the last edit before analysis runs (seconds)
    #[serde(default = "default_debounce_seconds")]
    pub debounce_seconds: u64,

    /// Buffers must be strictly longer than this to auto-trigger
    #[serde(default = "default_min_chars")]
    pub min_chars: usize,

    /// Suggestions at or below this confidence never create reminders
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    /// Priority attached to reminders created from analysis
    #[serde(default)]
    pub default_priority: Priority,
}

fn default_debounce_seconds() -> u64 {
    12
}

fn default_min_chars() -> usize {
    10
}

fn default_confidence_threshold() -> f64 {
    0.3
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            debounce_seconds: default_debounce_seconds(),
            min_chars: default_min_chars(),
            confidence_threshold: default_confidence_threshold(),
            default_priority: Priority::default(),
        }
    }
}

impl AnalysisConfig {
    /// Debounce delay as a [`Duration`]
    pub fn debounce(&self) -> Duration {
        Duration::from_secs(self.debounce_seconds)
    }
}

/// Session persistence backend
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionBackend {
    /// JSON file in the user data directory
    #[default]
    File,
    /// OS native credential store
    Keyring,
}

/// Session persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionConfig {
    /// Which backend stores the token and cached profile
    #[serde(default)]
    pub backend: SessionBackend,

    /// Explicit session file path (file backend only)
    #[serde(default)]
    pub file_path: Option<PathBuf>,
}

/// Due-alert configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsConfig {
    /// Deliver alerts at all
    #[serde(default = "default_alerts_enabled")]
    pub enabled: bool,

    /// Ring the terminal bell with each alert
    #[serde(default = "default_bell")]
    pub bell: bool,

    /// Countdown refresh interval (milliseconds)
    #[serde(default = "default_tick_millis")]
    pub tick_millis: u64,
}

fn default_alerts_enabled() -> bool {
    true
}

fn default_bell() -> bool {
    true
}

fn default_tick_millis() -> u64 {
    1000
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            enabled: default_alerts_enabled(),
            bell: default_bell(),
            tick_millis: default_tick_millis(),
        }
    }
}

impl AlertsConfig {
    /// Countdown tick as a [`Duration`]
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_millis)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Emit JSON log lines instead of the human-readable format
    #[serde(default)]
    pub json: bool,
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged configuration
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| RemindrError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| RemindrError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(base_url) = std::env::var("REMINDR_API_URL") {
            self.api.base_url = base_url;
        }

        if let Ok(timeout) = std::env::var("REMINDR_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.api.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid REMINDR_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(debounce) = std::env::var("REMINDR_DEBOUNCE_SECONDS") {
            if let Ok(value) = debounce.parse() {
                self.analysis.debounce_seconds = value;
            } else {
                tracing::warn!("Invalid REMINDR_DEBOUNCE_SECONDS: {}", debounce);
            }
        }

        if let Ok(min_chars) = std::env::var("REMINDR_MIN_CHARS") {
            if let Ok(value) = min_chars.parse() {
                self.analysis.min_chars = value;
            } else {
                tracing::warn!("Invalid REMINDR_MIN_CHARS: {}", min_chars);
            }
        }

        if let Ok(threshold) = std::env::var("REMINDR_CONFIDENCE_THRESHOLD") {
            if let Ok(value) = threshold.parse() {
                self.analysis.confidence_threshold = value;
            } else {
                tracing::warn!("Invalid REMINDR_CONFIDENCE_THRESHOLD: {}", threshold);
            }
        }

        if let Ok(backend) = std::env::var("REMINDR_SESSION_BACKEND") {
            self.session.backend = match backend.to_lowercase().as_str() {
                "file" => SessionBackend::File,
                "keyring" => SessionBackend::Keyring,
                _ => {
                    tracing::warn!("Invalid session backend: {}, using default", backend);
                    SessionBackend::default()
                }
            };
        }

        if let Ok(file) = std::env::var("REMINDR_SESSION_FILE") {
            tracing::debug!(session_file = %file, "Env override: REMINDR_SESSION_FILE");
            self.session.file_path = Some(PathBuf::from(file));
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(api_url) = &cli.api_url {
            tracing::debug!("Using API URL override from CLI: {}", api_url);
            self.api.base_url = api_url.clone();
        }
        if cli.json_logs {
            self.logging.json = true;
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        let parsed = url::Url::parse(&self.api.base_url).map_err(|e| {
            RemindrError::Config(format!("Invalid api.base_url '{}': {}", self.api.base_url, e))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(RemindrError::Config(format!(
                "api.base_url must use http or https, got {}",
                parsed.scheme()
            ))
            .into());
        }

        if self.api.timeout_seconds == 0 {
            return Err(RemindrError::Config(
                "api.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.analysis.debounce_seconds == 0 {
            return Err(RemindrError::Config(
                "analysis.debounce_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        let threshold = self.analysis.confidence_threshold;
        if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
            return Err(RemindrError::Config(
                "analysis.confidence_threshold must be between 0.0 and 1.0".to_string(),
            )
            .into());
        }

        if self.alerts.tick_millis == 0 {
            return Err(
                RemindrError::Config("alerts.tick_millis must be greater than 0".to_string())
                    .into(),
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:8000");
        assert_eq!(config.analysis.debounce_seconds, 12);
        assert_eq!(config.analysis.min_chars, 10);
        assert_eq!(config.analysis.confidence_threshold, 0.3);
        assert_eq!(config.session.backend, SessionBackend::File);
        assert_eq!(config.alerts.tick_millis, 1000);
    }

    #[test]
    fn test_config_validation_success() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_bad_url() {
        let mut config = Config::default();
        config.api.base_url = "not a url".to_string();
        assert!(config.validate().is_err());

        config.api.base_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_timeout() {
        let mut config = Config::default();
        config.api.timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_threshold_out_of_range() {
        let mut config = Config::default();
        config.analysis.confidence_threshold = 1.5;
        assert!(config.validate().is_err());

        config.analysis.confidence_threshold = -0.1;
        assert!(config.validate().is_err());

        config.analysis.confidence_threshold = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_debounce_and_tick() {
        let mut config = Config::default();
        config.analysis.debounce_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.alerts.tick_millis = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
api:
  base_url: https://reminders.example.com
  timeout_seconds: 10
analysis:
  debounce_seconds: 5
  min_chars: 20
  confidence_threshold: 0.5
  default_priority: high
session:
  backend: keyring
alerts:
  bell: false
logging:
  json: true
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.api.base_url, "https://reminders.example.com");
        assert_eq!(config.api.timeout_seconds, 10);
        assert_eq!(config.analysis.debounce(), Duration::from_secs(5));
        assert_eq!(config.analysis.min_chars, 20);
        assert_eq!(config.analysis.default_priority, Priority::High);
        assert_eq!(config.session.backend, SessionBackend::Keyring);
        assert!(!config.alerts.bell);
        assert!(config.alerts.enabled);
        assert!(config.logging.json);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let config: Config = serde_yaml::from_str("api:\n  timeout_seconds: 3\n").unwrap();
        assert_eq!(config.api.base_url, "http://localhost:8000");
        assert_eq!(config.api.timeout(), Duration::from_secs(3));
        assert_eq!(config.analysis.confidence_threshold, 0.3);
    }

    #[test]
    #[serial]
    fn test_load_nonexistent_file_uses_defaults() {
        let cli = crate::cli::Cli::default();
        let config = Config::load("/definitely/not/here.yaml", &cli).unwrap();
        assert_eq!(config.analysis.min_chars, 10);
    }

    #[test]
    #[serial]
    fn test_apply_env_vars_overrides_fields() {
        std::env::set_var("REMINDR_API_URL", "http://10.0.0.1:9000");
        std::env::set_var("REMINDR_DEBOUNCE_SECONDS", "3");
        std::env::set_var("REMINDR_CONFIDENCE_THRESHOLD", "0.7");
        std::env::set_var("REMINDR_SESSION_BACKEND", "keyring");
        std::env::set_var("REMINDR_MIN_CHARS", "not-a-number");

        let mut config = Config::default();
        config.apply_env_vars();

        std::env::remove_var("REMINDR_API_URL");
        std::env::remove_var("REMINDR_DEBOUNCE_SECONDS");
        std::env::remove_var("REMINDR_CONFIDENCE_THRESHOLD");
        std::env::remove_var("REMINDR_SESSION_BACKEND");
        std::env::remove_var("REMINDR_MIN_CHARS");

        assert_eq!(config.api.base_url, "http://10.0.0.1:9000");
        assert_eq!(config.analysis.debounce_seconds, 3);
        assert_eq!(config.analysis.confidence_threshold, 0.7);
        assert_eq!(config.session.backend, SessionBackend::Keyring);
        // Invalid values are ignored
        assert_eq!(config.analysis.min_chars, 10);
    }

    #[test]
    #[serial]
    fn test_cli_api_url_overrides_env() {
        std::env::set_var("REMINDR_API_URL", "http://from-env:1");
        let mut cli = crate::cli::Cli::default();
        cli.api_url = Some("http://from-cli:2".to_string());
        let config = Config::load("/definitely/not/here.yaml", &cli).unwrap();
        std::env::remove_var("REMINDR_API_URL");

        assert_eq!(config.api.base_url, "http://from-cli:2");
    }
}
