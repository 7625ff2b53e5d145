//! Job record: state + envelope.

use std::time::Instant;

use super::JobState;
use crate::domain::JobEnvelope;

/// Everything the transport knows about one job.
///
/// - Single source of truth for the job's state.
/// - Queue structures (ready/delayed) hold `JobId`s only.
/// - All state transitions happen here.
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub envelope: JobEnvelope,
    pub state: JobState,

    /// Attempts made so far (including the current one while Active).
    pub attempts: u32,

    /// Last error message (if any).
    pub last_error: Option<String>,

    /// When to retry next (Delayed only).
    pub next_run_at: Option<Instant>,

    pub created_at: Instant,
    pub updated_at: Instant,
}

impl JobRecord {
    pub fn new(envelope: JobEnvelope) -> Self {
        let now = Instant::now();
        Self {
            envelope,
            state: JobState::Pending,
            attempts: 0,
            last_error: None,
            next_run_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn attempts_allowed(&self) -> u32 {
        self.envelope.options().attempts
    }

    pub fn start_attempt(&mut self) {
        self.state = JobState::Active;
        self.attempts += 1;
        self.updated_at = Instant::now();
    }

    pub fn mark_dead(&mut self, error: String) {
        self.state = JobState::Dead;
        self.last_error = Some(error);
        self.updated_at = Instant::now();
    }

    pub fn schedule_retry(&mut self, next_run_at: Instant, error: String) {
        self.state = JobState::Delayed;
        self.next_run_at = Some(next_run_at);
        self.last_error = Some(error);
        self.updated_at = Instant::now();
    }

    /// Delayed -> Pending.
    pub fn requeue(&mut self) {
        self.state = JobState::Pending;
        self.next_run_at = None;
        self.updated_at = Instant::now();
    }
}
