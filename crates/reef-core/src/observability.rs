//! Queue counts and tracing setup.

use serde::{Deserialize, Serialize};
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LogFormat;
use crate::error::ConfigError;

/// Jobs of one queue by state. `succeeded` is a running total; acked jobs
/// are not kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    pub pending: usize,
    pub active: usize,
    pub succeeded: usize,
    pub delayed: usize,
    pub dead: usize,
}

/// Install the global subscriber. `RUST_LOG` overrides the default `info`.
pub fn init_tracing(format: LogFormat) -> Result<(), ConfigError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| ConfigError::Tracing(err.to_string())),
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| ConfigError::Tracing(err.to_string())),
    }
}
