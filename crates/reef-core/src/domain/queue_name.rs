use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The fixed set of work queues.
///
/// Each queue gets its own worker pool. The default concurrency values are
/// the production ones; `Report` runs one job at a time so daily, weekly and
/// monthly report generation never overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueName {
    Email,
    Booking,
    Report,
    Maintenance,
}

impl QueueName {
    pub const ALL: [QueueName; 4] = [
        QueueName::Email,
        QueueName::Booking,
        QueueName::Report,
        QueueName::Maintenance,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            QueueName::Email => "email",
            QueueName::Booking => "booking",
            QueueName::Report => "report",
            QueueName::Maintenance => "maintenance",
        }
    }

    pub fn default_concurrency(self) -> usize {
        match self {
            QueueName::Email => 5,
            QueueName::Booking => 3,
            QueueName::Report => 1,
            QueueName::Maintenance => 2,
        }
    }
}

impl fmt::Display for QueueName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown queue name: {0}")]
pub struct UnknownQueue(pub String);

impl FromStr for QueueName {
    type Err = UnknownQueue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QueueName::ALL
            .into_iter()
            .find(|q| q.as_str() == s)
            .ok_or_else(|| UnknownQueue(s.to_string()))
    }
}
