//! Server Settings
//!
//! Layered from an optional TOML file and `RISK_ENGINE__*` environment
//! variables, e.g. `RISK_ENGINE__SERVER__PORT=9090` or
//! `RISK_ENGINE__ENGINE__ALERTS__ALERTABLE_TIER=high`.

use config::{Config, ConfigError, Environment, File};
use monitor::EngineConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::rate_limit::RateLimitConfig;

/// Config file looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_NAME: &str = "risk-engine";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "RISK_ENGINE";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub rate_limit: RateLimitConfig,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl ServerSettings {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Max level: trace, debug, info, warn, error
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Plain,
        }
    }
}

/// Complete process settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub engine: EngineConfig,
}

impl Settings {
    /// Load settings from `path` (required when given) or the optional
    /// default file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
