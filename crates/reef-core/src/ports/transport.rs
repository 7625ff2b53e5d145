//! Queue transport port.
//!
//! The transport is the durable, at-least-once work queue: it owns job
//! state, retry/backoff, dead jobs, and materializing recurring jobs when
//! their cron occurrence is due. The application never runs its own timer
//! loop for recurring work.
//!
//! # Requirements on implementations
//! - `register_recurring` must deduplicate on `(queue, job_name, cron)`.
//! - At most one occurrence of a recurring registration may be pending or
//!   active at a time. The tenant lifecycle scan does read-then-write on the
//!   lifecycle ledger without a transaction, so overlapping runs would race.
//! - Leases already handed out must still be able to `ack`/`fail` after
//!   `close()` so in-flight jobs can drain.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{JobEnvelope, JobId, JobOptions, QueueName};
use crate::error::TransportError;
use crate::observability::QueueCounts;

/// A leased job. The worker owns the lease and must either `ack` or `fail`.
#[async_trait]
pub trait JobLease: Send {
    fn envelope(&self) -> &JobEnvelope;

    /// Attempts made including this one.
    fn attempts_made(&self) -> u32;

    /// Mark success.
    async fn ack(self: Box<Self>) -> Result<(), TransportError>;

    /// Mark failure; the transport decides between retry and dead.
    async fn fail(self: Box<Self>, error: String) -> Result<FailureDisposition, TransportError>;
}

/// What the transport did with a failed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDisposition {
    RetryScheduled { delay: Duration },
    Dead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Created,
    AlreadyRegistered,
}

#[async_trait]
pub trait QueueTransport: Send + Sync {
    /// Prepare a queue for consumption. An error here keeps that queue's
    /// pool from starting.
    async fn open(&self, queue: QueueName) -> Result<(), TransportError>;

    /// Enqueue a one-shot job.
    async fn enqueue(
        &self,
        queue: QueueName,
        job_name: &str,
        payload: serde_json::Value,
        options: JobOptions,
    ) -> Result<JobId, TransportError>;

    /// Register a recurring job materialized on `cron` (five-field cron, UTC).
    async fn register_recurring(
        &self,
        queue: QueueName,
        job_name: &str,
        payload: serde_json::Value,
        cron: &str,
    ) -> Result<Registration, TransportError>;

    /// Lease one ready job. Waits until one is available; `None` once the
    /// transport is closed.
    async fn lease(&self, queue: QueueName) -> Option<Box<dyn JobLease>>;

    async fn counts(&self, queue: QueueName) -> Result<QueueCounts, TransportError>;

    /// Dead jobs of a queue with their final error.
    async fn dead_jobs(&self, queue: QueueName) -> Result<Vec<DeadJob>, TransportError>;

    /// Release the connection. Waiting `lease` calls return `None`.
    async fn close(&self);
}

#[derive(Debug, Clone)]
pub struct DeadJob {
    pub envelope: JobEnvelope,
    pub attempts: u32,
    pub error: String,
}
