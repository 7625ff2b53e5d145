//! JobSystemBuilder - JobSystem の構築とワイヤリング
//!
//! 起動時に検証する (fail-fast):
//! - schedule に載っている job は全て handler が登録済み
//! - 各 queue の concurrency は 1 以上
//!
//! 足りなければ pool を一つも起動せずに `BuildError` を返す。

use std::collections::HashMap;
use std::sync::Arc;

use super::job_system::JobSystem;
use super::scheduler::RecurringJob;
use crate::domain::QueueName;
use crate::error::BuildError;
use crate::ports::QueueTransport;
use crate::typed::{Handler, JobPayload, JobRouter};

/// ```ignore
/// let system = JobSystemBuilder::new(transport)
///     .register::<SendReminders, _>(reminders)?
///     .concurrency(QueueName::Email, 10)
///     .schedule(standard_schedule())
///     .build()?;
/// ```
pub struct JobSystemBuilder {
    transport: Arc<dyn QueueTransport>,
    routers: HashMap<QueueName, JobRouter>,
    concurrency: HashMap<QueueName, usize>,
    schedule: Vec<RecurringJob>,
}

impl JobSystemBuilder {
    pub fn new(transport: Arc<dyn QueueTransport>) -> Self {
        Self {
            transport,
            routers: QueueName::ALL
                .into_iter()
                .map(|q| (q, JobRouter::new(q)))
                .collect(),
            concurrency: QueueName::ALL
                .into_iter()
                .map(|q| (q, q.default_concurrency()))
                .collect(),
            schedule: Vec::new(),
        }
    }

    /// Register a handler on the queue its payload type belongs to.
    pub fn register<T: JobPayload, H: Handler<T> + 'static>(
        mut self,
        handler: H,
    ) -> Result<Self, BuildError> {
        self.routers
            .entry(T::QUEUE)
            .or_insert_with(|| JobRouter::new(T::QUEUE))
            .register::<T, H>(handler)?;
        Ok(self)
    }

    pub fn concurrency(mut self, queue: QueueName, workers: usize) -> Self {
        self.concurrency.insert(queue, workers);
        self
    }

    /// Recurring jobs registered by `JobSystem::register_schedule`. Each
    /// needs a handler by `build()` time.
    pub fn schedule(mut self, jobs: impl IntoIterator<Item = RecurringJob>) -> Self {
        self.schedule.extend(jobs);
        self
    }

    pub fn build(self) -> Result<JobSystem, BuildError> {
        for queue in QueueName::ALL {
            if self.concurrency.get(&queue).copied().unwrap_or(0) == 0 {
                return Err(BuildError::ZeroConcurrency(queue));
            }
        }

        let missing: Vec<String> = self
            .schedule
            .iter()
            .filter(|job| {
                self.routers
                    .get(&job.queue)
                    .is_none_or(|router| router.get(job.job_name).is_none())
            })
            .map(|job| format!("{}/{}", job.queue, job.job_name))
            .collect();
        if !missing.is_empty() {
            return Err(BuildError::MissingHandlers(missing));
        }

        let routers = self
            .routers
            .into_iter()
            .map(|(queue, router)| (queue, Arc::new(router)))
            .collect();
        Ok(JobSystem::new(
            self.transport,
            routers,
            self.concurrency,
            self.schedule,
        ))
    }
}
