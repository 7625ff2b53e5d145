//! Worker configuration: optional TOML file, then environment overrides.

use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::domain::QueueName;
use crate::error::ConfigError;

pub const ENV_TRANSPORT_URL: &str = "REEF_TRANSPORT_URL";
pub const ENV_LOG_FORMAT: &str = "REEF_LOG_FORMAT";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(ConfigError::InvalidValue {
                key: "log_format".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogFormat::Text => "text",
            LogFormat::Json => "json",
        })
    }
}

/// Workers per queue.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    pub email: usize,
    pub booking: usize,
    pub report: usize,
    pub maintenance: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            email: QueueName::Email.default_concurrency(),
            booking: QueueName::Booking.default_concurrency(),
            report: QueueName::Report.default_concurrency(),
            maintenance: QueueName::Maintenance.default_concurrency(),
        }
    }
}

impl ConcurrencyConfig {
    pub fn for_queue(&self, queue: QueueName) -> usize {
        match queue {
            QueueName::Email => self.email,
            QueueName::Booking => self.booking,
            QueueName::Report => self.report,
            QueueName::Maintenance => self.maintenance,
        }
    }
}

fn default_transport_url() -> String {
    "memory://".into()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReefConfig {
    #[serde(default = "default_transport_url")]
    pub transport_url: String,
    #[serde(default)]
    pub log_format: LogFormat,
    #[serde(default)]
    pub concurrency: ConcurrencyConfig,
}

impl Default for ReefConfig {
    fn default() -> Self {
        Self {
            transport_url: default_transport_url(),
            log_format: LogFormat::default(),
            concurrency: ConcurrencyConfig::default(),
        }
    }
}

impl ReefConfig {
    /// Read `path` if given, apply `REEF_*` environment overrides, validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                })?;
                toml::from_str(&raw)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate without touching the environment.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(url) = lookup(ENV_TRANSPORT_URL).filter(|v| !v.trim().is_empty()) {
            self.transport_url = url.trim().to_string();
        }
        if let Some(format) = lookup(ENV_LOG_FORMAT).filter(|v| !v.trim().is_empty()) {
            self.log_format = format.parse()?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for queue in QueueName::ALL {
            if self.concurrency.for_queue(queue) == 0 {
                return Err(ConfigError::InvalidValue {
                    key: format!("concurrency.{queue}"),
                    value: "0".to_string(),
                });
            }
        }
        if self.transport_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "transport_url".to_string(),
                value: String::new(),
            });
        }
        Ok(())
    }
}
