use std::sync::Arc;

use crate::domain::{JobId, JobOptions};
use crate::error::TransportError;
use crate::ports::QueueTransport;
use crate::typed::JobPayload;

/// Enqueues typed jobs. Handlers that fan out follow-up work hold one.
#[derive(Clone)]
pub struct JobProducer {
    transport: Arc<dyn QueueTransport>,
}

impl JobProducer {
    pub fn new(transport: Arc<dyn QueueTransport>) -> Self {
        Self { transport }
    }

    pub async fn enqueue<T: JobPayload>(&self, job: &T) -> Result<JobId, TransportError> {
        self.enqueue_with(job, T::options()).await
    }

    pub async fn enqueue_with<T: JobPayload>(
        &self,
        job: &T,
        options: JobOptions,
    ) -> Result<JobId, TransportError> {
        let payload = serde_json::to_value(job)?;
        self.transport
            .enqueue(T::QUEUE, T::NAME, payload, options)
            .await
    }
}
