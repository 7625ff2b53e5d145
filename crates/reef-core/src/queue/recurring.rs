//! Recurring registrations and their cron occurrences.

use chrono::{DateTime, Utc};
use croner::Cron;

use crate::domain::{JobId, QueueName};
use crate::error::TransportError;

/// Parse and validate a five-field cron expression.
pub fn parse_cron(expression: &str) -> Result<Cron, TransportError> {
    Cron::new(expression)
        .parse()
        .map_err(|e| TransportError::InvalidCron {
            expression: expression.to_string(),
            reason: e.to_string(),
        })
}

/// One `(queue, job_name, cron)` registration.
pub(crate) struct RecurringEntry {
    pub queue: QueueName,
    pub job_name: String,
    pub cron_expression: String,
    pub payload: serde_json::Value,
    schedule: Cron,
    /// Next due occurrence; `None` if the expression has no future match.
    pub next_run_at: Option<DateTime<Utc>>,
    /// Job materialized for the most recent occurrence.
    pub last_job: Option<JobId>,
}

impl RecurringEntry {
    pub fn new(
        queue: QueueName,
        job_name: &str,
        cron_expression: &str,
        payload: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<Self, TransportError> {
        let schedule = parse_cron(cron_expression)?;
        let next_run_at = schedule.find_next_occurrence(&now, false).ok();
        Ok(Self {
            queue,
            job_name: job_name.to_string(),
            cron_expression: cron_expression.to_string(),
            payload,
            schedule,
            next_run_at,
            last_job: None,
        })
    }

    pub fn matches(&self, queue: QueueName, job_name: &str, cron_expression: &str) -> bool {
        self.queue == queue && self.job_name == job_name && self.cron_expression == cron_expression
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_run_at.is_some_and(|at| at <= now)
    }

    /// Move past every occurrence up to `now`. Missed occurrences collapse
    /// into the one being materialized.
    pub fn advance(&mut self, now: DateTime<Utc>) {
        self.next_run_at = self.schedule.find_next_occurrence(&now, false).ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn rejects_garbage_expressions() {
        let err = parse_cron("every day at eight").unwrap_err();
        assert!(matches!(err, TransportError::InvalidCron { .. }));
    }

    #[test]
    fn daily_entry_is_due_at_eight() {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 7, 30, 0).unwrap();
        let mut entry = RecurringEntry::new(
            QueueName::Booking,
            "send-reminders",
            "0 8 * * *",
            serde_json::json!({}),
            now,
        )
        .unwrap();

        assert_eq!(
            entry.next_run_at,
            Some(Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).unwrap())
        );
        assert!(!entry.is_due(now));

        let later = Utc.with_ymd_and_hms(2026, 5, 3, 9, 0, 0).unwrap();
        assert!(entry.is_due(later));
        entry.advance(later);
        assert_eq!(
            entry.next_run_at,
            Some(Utc.with_ymd_and_hms(2026, 5, 4, 8, 0, 0).unwrap())
        );
    }
}
