use thiserror::Error;

use crate::domain::{JobId, QueueName};

/// Failures of the queue transport itself.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport is closed")]
    Closed,

    #[error("unsupported transport url: {0}")]
    UnsupportedUrl(String),

    #[error("job not found: {0}")]
    JobNotFound(JobId),

    #[error("invalid cron expression '{expression}': {reason}")]
    InvalidCron { expression: String, reason: String },

    #[error("payload encode: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Failures of the data store collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("data store unavailable: {0}")]
    Unavailable(String),
}

/// Failure of one job run. Returning it from a handler makes the transport
/// retry the job (or bury it once attempts run out).
#[derive(Debug, Error)]
pub enum JobError {
    #[error("payload decode for {job_name}: {source}")]
    Decode {
        job_name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("email dispatch to {to} failed: {reason}")]
    Dispatch { to: String, reason: String },

    #[error("{0}")]
    Other(String),
}

/// Startup wiring mistakes, caught before any pool starts.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("job '{job_name}' is already registered on queue {queue}")]
    DuplicateHandler { queue: QueueName, job_name: String },

    #[error("job '{job_name}' belongs to queue {expected}, not {actual}")]
    WrongQueue {
        job_name: String,
        expected: QueueName,
        actual: QueueName,
    },

    #[error("missing handlers for scheduled jobs: {0:?}")]
    MissingHandlers(Vec<String>),

    #[error("concurrency for queue {0} must be at least 1")]
    ZeroConcurrency(QueueName),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("failed to init tracing: {0}")]
    Tracing(String),
}
