//! # Configuration Module
//!
//! Negotiator settings come from three layers, later ones winning:
//!
//! 1. [`NegotiatorConfig::default()`]
//! 2. An optional YAML file ([`NegotiatorConfig::from_file`])
//! 3. Environment variables ([`NegotiatorConfig::apply_env`])
//!
//! ## Environment Variables
//!
//! | Variable | Field | Default |
//! |---|---|---|
//! | `CONNEG_DEFAULT_MEDIA_TYPE` | `default_media_type` | `application/json` |
//! | `CONNEG_PREFERENCE_HEADER` | `preference_header` | `accept` |
//! | `CONNEG_GENERATOR_TIMEOUT_MS` | `generator_timeout_ms` | unset (no timeout) |
//! | `CONNEG_LOG_LEVEL` | `log.level` | `info` |
//! | `CONNEG_LOG_FORMAT` | `log.format` | `text` |
//!
//! Unparseable values are ignored with a warning and the previous layer's value
//! is kept.
//!
//! ## Example Configuration
//!
//! ```yaml
//! default_media_type: application/json
//! preference_header: accept
//! generator_timeout_ms: 2500
//! log:
//!   level: debug
//!   format: json
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use tracing::warn;

pub const ENV_DEFAULT_MEDIA_TYPE: &str = "CONNEG_DEFAULT_MEDIA_TYPE";
pub const ENV_PREFERENCE_HEADER: &str = "CONNEG_PREFERENCE_HEADER";
pub const ENV_GENERATOR_TIMEOUT_MS: &str = "CONNEG_GENERATOR_TIMEOUT_MS";
pub const ENV_LOG_LEVEL: &str = "CONNEG_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "CONNEG_LOG_FORMAT";

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Logging settings consumed by [`crate::telemetry::init_logging`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default `EnvFilter` directive; `RUST_LOG` takes precedence when set
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Settings of one [`crate::Negotiator`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NegotiatorConfig {
    /// Preference used when the request carries no preference header
    pub default_media_type: String,
    /// Name of the header holding the media-type preference
    pub preference_header: String,
    /// Upper bound for a single generator invocation, in milliseconds.
    ///
    /// `None` keeps the unbounded behaviour: a hung generator hangs `resolve`.
    /// When set, `resolve` must run inside a Tokio runtime.
    pub generator_timeout_ms: Option<u64>,
    pub log: LogConfig,
}

impl Default for NegotiatorConfig {
    fn default() -> Self {
        Self {
            default_media_type: "application/json".to_string(),
            preference_header: "accept".to_string(),
            generator_timeout_ms: None,
            log: LogConfig::default(),
        }
    }
}

impl NegotiatorConfig {
    /// Parse a YAML document; missing fields keep their defaults.
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).context("invalid negotiator config")?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML config file.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&raw).with_context(|| format!("in {}", path.display()))
    }

    /// Defaults with environment overrides applied.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Overlay `CONNEG_*` environment variables onto this config.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub(crate) fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup(ENV_DEFAULT_MEDIA_TYPE) {
            if v.trim().is_empty() {
                warn!(var = ENV_DEFAULT_MEDIA_TYPE, "Ignoring empty override");
            } else {
                self.default_media_type = v.trim().to_string();
            }
        }
        if let Some(v) = lookup(ENV_PREFERENCE_HEADER) {
            if v.trim().is_empty() {
                warn!(var = ENV_PREFERENCE_HEADER, "Ignoring empty override");
            } else {
                self.preference_header = v.trim().to_string();
            }
        }
        if let Some(v) = lookup(ENV_GENERATOR_TIMEOUT_MS) {
            match v.trim().parse::<u64>() {
                Ok(0) => self.generator_timeout_ms = None,
                Ok(ms) => self.generator_timeout_ms = Some(ms),
                Err(e) => warn!(var = ENV_GENERATOR_TIMEOUT_MS, value = %v, error = %e, "Ignoring invalid override"),
            }
        }
        if let Some(v) = lookup(ENV_LOG_LEVEL) {
            if !v.trim().is_empty() {
                self.log.level = v.trim().to_string();
            }
        }
        if let Some(v) = lookup(ENV_LOG_FORMAT) {
            match v.parse::<LogFormat>() {
                Ok(format) => self.log.format = format,
                Err(e) => warn!(var = ENV_LOG_FORMAT, error = %e, "Ignoring invalid override"),
            }
        }
    }

    /// Generator timeout as a `Duration`, if configured.
    #[must_use]
    pub fn generator_timeout(&self) -> Option<Duration> {
        self.generator_timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.default_media_type.trim().is_empty(),
            "default_media_type must not be empty"
        );
        anyhow::ensure!(
            !self.preference_header.trim().is_empty(),
            "preference_header must not be empty"
        );
        Ok(())
    }
}
