//! Recurring job registration.
//!
//! The scheduler only tells the transport what to run and when. The
//! transport materializes occurrences and deduplicates registrations, so
//! registering the same schedule on every process start is safe.

use std::sync::Arc;

use tracing::info;

use super::handlers::{
    CheckEquipmentService, CheckTrialExpirations, CleanupExpiredSessions, CleanupStaleTenants,
    SendReminders,
};
use crate::domain::QueueName;
use crate::error::TransportError;
use crate::ports::{QueueTransport, Registration};
use crate::typed::JobPayload;

/// One entry of the recurring schedule. Cron is five-field, UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecurringJob {
    pub queue: QueueName,
    pub job_name: &'static str,
    pub cron: &'static str,
}

impl RecurringJob {
    pub const fn of<T: JobPayload>(cron: &'static str) -> Self {
        Self {
            queue: T::QUEUE,
            job_name: T::NAME,
            cron,
        }
    }
}

/// The production schedule.
pub fn standard_schedule() -> Vec<RecurringJob> {
    vec![
        RecurringJob::of::<SendReminders>("0 8 * * *"),
        RecurringJob::of::<CheckEquipmentService>("0 6 * * *"),
        RecurringJob::of::<CleanupExpiredSessions>("0 * * * *"),
        RecurringJob::of::<CheckTrialExpirations>("0 9 * * *"),
        RecurringJob::of::<CleanupStaleTenants>("0 3 * * *"),
    ]
}

pub struct Scheduler {
    transport: Arc<dyn QueueTransport>,
}

impl Scheduler {
    pub fn new(transport: Arc<dyn QueueTransport>) -> Self {
        Self { transport }
    }

    pub async fn register_recurring(
        &self,
        queue: QueueName,
        job_name: &str,
        cron: &str,
    ) -> Result<Registration, TransportError> {
        // scheduled jobs carry no data
        self.transport
            .register_recurring(queue, job_name, serde_json::json!({}), cron)
            .await
    }

    /// Register every entry. Stops at the first transport error.
    pub async fn register_all(&self, jobs: &[RecurringJob]) -> Result<(), TransportError> {
        for job in jobs {
            let registration = self
                .register_recurring(job.queue, job.job_name, job.cron)
                .await?;
            info!(
                queue = %job.queue,
                job_name = job.job_name,
                cron = job.cron,
                ?registration,
                "recurring job registered"
            );
        }
        Ok(())
    }
}
