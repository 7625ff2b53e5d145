//! JobSystem - the one object that owns the transport, the routers and the
//! worker pools. Built once at startup and passed around explicitly.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{error, info};

use super::producer::JobProducer;
use super::scheduler::{RecurringJob, Scheduler};
use super::worker_pool::WorkerPool;
use crate::domain::QueueName;
use crate::error::TransportError;
use crate::ports::QueueTransport;
use crate::typed::JobRouter;

pub struct JobSystem {
    transport: Arc<dyn QueueTransport>,
    routers: HashMap<QueueName, Arc<JobRouter>>,
    concurrency: HashMap<QueueName, usize>,
    schedule: Vec<RecurringJob>,
    pools: Vec<WorkerPool>,
}

impl JobSystem {
    pub(crate) fn new(
        transport: Arc<dyn QueueTransport>,
        routers: HashMap<QueueName, Arc<JobRouter>>,
        concurrency: HashMap<QueueName, usize>,
        schedule: Vec<RecurringJob>,
    ) -> Self {
        Self {
            transport,
            routers,
            concurrency,
            schedule,
            pools: Vec::new(),
        }
    }

    pub fn transport(&self) -> Arc<dyn QueueTransport> {
        Arc::clone(&self.transport)
    }

    pub fn producer(&self) -> JobProducer {
        JobProducer::new(self.transport())
    }

    pub fn concurrency(&self, queue: QueueName) -> usize {
        self.concurrency
            .get(&queue)
            .copied()
            .unwrap_or_else(|| queue.default_concurrency())
    }

    /// Queues with a running pool.
    pub fn running_queues(&self) -> Vec<QueueName> {
        self.pools.iter().map(WorkerPool::queue).collect()
    }

    /// Register the recurring schedule with the transport.
    pub async fn register_schedule(&self) -> Result<(), TransportError> {
        Scheduler::new(self.transport())
            .register_all(&self.schedule)
            .await
    }

    /// Start one pool per queue that has handlers.
    ///
    /// A queue that fails to open is logged and left without a pool; the
    /// other queues still start. Returns the queues now running.
    pub async fn start(&mut self) -> Vec<QueueName> {
        for queue in QueueName::ALL {
            if self.pools.iter().any(|p| p.queue() == queue) {
                continue;
            }
            let Some(router) = self.routers.get(&queue) else {
                continue;
            };
            if router.is_empty() {
                info!(queue = %queue, "no handlers registered, pool not started");
                continue;
            }
            if let Err(err) = self.transport.open(queue).await {
                error!(queue = %queue, error = %err, "queue failed to open, pool not started");
                continue;
            }

            let pool = WorkerPool::spawn(
                queue,
                self.concurrency(queue),
                self.transport(),
                Arc::clone(router),
            );
            self.pools.push(pool);
        }
        self.running_queues()
    }

    /// Stop every pool, wait for in-flight jobs, then close the transport.
    ///
    /// Pools drain concurrently; this returns once all of them are done.
    pub async fn shutdown(self) {
        info!(pools = self.pools.len(), "shutting down job system");
        for pool in &self.pools {
            pool.request_shutdown();
        }

        let drains: Vec<_> = self
            .pools
            .into_iter()
            .map(|pool| tokio::spawn(pool.shutdown_and_join()))
            .collect();
        for drain in drains {
            if let Err(err) = drain.await {
                error!(error = %err, "pool drain task failed");
            }
        }

        self.transport.close().await;
        info!("job system stopped");
    }
}
