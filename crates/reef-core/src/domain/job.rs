use serde::{Deserialize, Serialize};

use super::{JobId, QueueName};
use crate::queue::BackoffPolicy;

/// Attempts and backoff for one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOptions {
    /// Total attempts allowed, including the first one.
    pub attempts: u32,
    pub backoff: BackoffPolicy,
}

impl JobOptions {
    /// One-shot jobs: 3 attempts, exponential backoff from 1s.
    pub fn one_shot() -> Self {
        Self {
            attempts: 3,
            backoff: BackoffPolicy::default_one_shot(),
        }
    }

    /// Recurring occurrences are not retried by the transport; the next
    /// scheduled occurrence is the retry.
    pub fn recurring() -> Self {
        Self {
            attempts: 1,
            backoff: BackoffPolicy::default_one_shot(),
        }
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }
}

impl Default for JobOptions {
    fn default() -> Self {
        Self::one_shot()
    }
}

/// Job name + payload (+ routing data) carried through the transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobEnvelope {
    job_id: JobId,
    queue: QueueName,
    job_name: String,
    payload: serde_json::Value,
    options: JobOptions,
    /// Cron expression of the registration that produced this job, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    schedule: Option<String>,
}

impl JobEnvelope {
    pub fn new(
        job_id: JobId,
        queue: QueueName,
        job_name: impl Into<String>,
        payload: serde_json::Value,
        options: JobOptions,
    ) -> Self {
        Self {
            job_id,
            queue,
            job_name: job_name.into(),
            payload,
            options,
            schedule: None,
        }
    }

    pub fn with_schedule(mut self, cron: impl Into<String>) -> Self {
        self.schedule = Some(cron.into());
        self
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn queue(&self) -> QueueName {
        self.queue
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    pub fn options(&self) -> JobOptions {
        self.options
    }

    pub fn schedule(&self) -> Option<&str> {
        self.schedule.as_deref()
    }

    pub fn is_recurring(&self) -> bool {
        self.schedule.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempts_never_drop_below_one() {
        assert_eq!(JobOptions::one_shot().with_attempts(0).attempts, 1);
    }

    #[test]
    fn envelope_survives_the_wire() {
        let env = JobEnvelope::new(
            JobId::generate(),
            QueueName::Maintenance,
            "cleanup-stale-tenants",
            serde_json::json!({}),
            JobOptions::recurring(),
        )
        .with_schedule("0 3 * * *");

        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["queue"], "maintenance");
        assert_eq!(json["jobName"], "cleanup-stale-tenants");

        let back: JobEnvelope = serde_json::from_value(json).unwrap();
        assert_eq!(back.job_id(), env.job_id());
        assert!(back.is_recurring());
        assert_eq!(back.options(), JobOptions::recurring());
    }
}
