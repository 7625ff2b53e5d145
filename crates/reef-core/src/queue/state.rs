//! Job state machine inside the transport.

use serde::{Deserialize, Serialize};

/// State of a job the transport still holds.
///
/// - Pending -> Active -> (acked, record removed)
/// - Pending -> Active -> Delayed -> Pending, until attempts run out
/// - Pending -> Active -> Dead
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Ready to be leased.
    Pending,

    /// Leased by a worker.
    Active,

    /// Waiting for its retry backoff to elapse.
    Delayed,

    /// Failed permanently; keeps the final error.
    Dead,
}

impl JobState {
    /// No further transitions once dead.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Dead)
    }
}
