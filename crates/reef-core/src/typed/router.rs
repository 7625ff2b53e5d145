//! JobRouter - per-queue dispatch from job name to handler.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use super::handler::{DynHandler, Handler, TypedHandler};
use super::job::JobPayload;
use crate::domain::{JobEnvelope, QueueName};
use crate::error::{BuildError, JobError};

/// Handlers of one queue, keyed by job name.
///
/// Built mutably at startup, then shared read-only (`Arc`) by every worker
/// of the queue's pool, so dispatch needs no lock.
pub struct JobRouter {
    queue: QueueName,
    handlers: HashMap<&'static str, Arc<dyn DynHandler>>,
}

impl JobRouter {
    pub fn new(queue: QueueName) -> Self {
        Self {
            queue,
            handlers: HashMap::new(),
        }
    }

    pub fn queue(&self) -> QueueName {
        self.queue
    }

    pub fn register<T: JobPayload, H: Handler<T> + 'static>(
        &mut self,
        handler: H,
    ) -> Result<(), BuildError> {
        if T::QUEUE != self.queue {
            return Err(BuildError::WrongQueue {
                job_name: T::NAME.to_string(),
                expected: T::QUEUE,
                actual: self.queue,
            });
        }
        if self.handlers.contains_key(T::NAME) {
            return Err(BuildError::DuplicateHandler {
                queue: self.queue,
                job_name: T::NAME.to_string(),
            });
        }
        self.handlers
            .insert(T::NAME, Arc::new(TypedHandler::<T, H>::new(handler)));
        Ok(())
    }

    pub fn get(&self, job_name: &str) -> Option<Arc<dyn DynHandler>> {
        self.handlers.get(job_name).cloned()
    }

    pub fn registered_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.handlers.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Dispatch one job.
    ///
    /// Unknown job names are logged and treated as handled. Retrying them
    /// would only loop when a producer is newer than this consumer.
    pub async fn route(&self, envelope: &JobEnvelope) -> Result<(), JobError> {
        let Some(handler) = self.handlers.get(envelope.job_name()) else {
            warn!(
                queue = %self.queue,
                job_id = %envelope.job_id(),
                job_name = envelope.job_name(),
                "unknown job name, dropping"
            );
            return Ok(());
        };
        handler.handle_dyn(envelope.payload().clone()).await
    }
}
