//! WorkerPool - bounded-concurrency consumer for one queue.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::domain::QueueName;
use crate::ports::{FailureDisposition, QueueTransport};
use crate::typed::JobRouter;

/// Pool handle.
///
/// The pool runs `concurrency` worker loops and each loop holds at most one
/// lease, so at most `concurrency` jobs of the queue are in flight.
/// - `request_shutdown()` stops all loops from taking new leases
/// - `shutdown_and_join()` also waits for in-flight jobs to finish
pub struct WorkerPool {
    queue: QueueName,
    concurrency: usize,
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn spawn(
        queue: QueueName,
        concurrency: usize,
        transport: Arc<dyn QueueTransport>,
        router: Arc<JobRouter>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let joins = (0..concurrency)
            .map(|worker_id| {
                let transport = Arc::clone(&transport);
                let router = Arc::clone(&router);
                let rx = shutdown_rx.clone();
                tokio::spawn(worker_loop(worker_id, queue, transport, router, rx))
            })
            .collect();

        info!(queue = %queue, concurrency, "worker pool started");
        Self {
            queue,
            concurrency,
            shutdown_tx,
            joins,
        }
    }

    pub fn queue(&self) -> QueueName {
        self.queue
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Stop taking new leases. In-flight handlers are never cancelled.
    pub fn request_shutdown(&self) {
        // receivers may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    /// Request shutdown and wait until every in-flight job has finished.
    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        for join in self.joins {
            if let Err(err) = join.await {
                error!(queue = %self.queue, %err, "worker task ended abnormally");
            }
        }
        info!(queue = %self.queue, "worker pool drained");
    }
}

async fn worker_loop(
    worker_id: usize,
    queue: QueueName,
    transport: Arc<dyn QueueTransport>,
    router: Arc<JobRouter>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        // lease は待つ可能性があるので shutdown と競合させる
        let lease = tokio::select! {
            biased;

            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            lease = transport.lease(queue) => lease,
        };

        let Some(lease) = lease else {
            debug!(queue = %queue, worker_id, "transport closed, worker exiting");
            break;
        };

        // ここから先は shutdown が来ても最後まで実行する
        let envelope = lease.envelope().clone();
        let job_id = envelope.job_id();
        let attempts_made = lease.attempts_made();

        match router.route(&envelope).await {
            Ok(()) => {
                if let Err(err) = lease.ack().await {
                    error!(queue = %queue, job_id = %job_id, %err, "ack failed");
                } else {
                    info!(
                        queue = %queue,
                        job_id = %job_id,
                        job_name = envelope.job_name(),
                        "job completed"
                    );
                }
            }
            Err(job_err) => {
                error!(
                    queue = %queue,
                    job_id = %job_id,
                    job_name = envelope.job_name(),
                    attempts_made,
                    error = %job_err,
                    "job failed"
                );
                match lease.fail(job_err.to_string()).await {
                    Ok(FailureDisposition::RetryScheduled { delay }) => {
                        debug!(
                            queue = %queue,
                            job_id = %job_id,
                            delay_ms = delay.as_millis() as u64,
                            "retry scheduled"
                        );
                    }
                    Ok(FailureDisposition::Dead) => {
                        warn!(
                            queue = %queue,
                            job_id = %job_id,
                            attempts_made,
                            error = %job_err,
                            "job moved to dead"
                        );
                    }
                    Err(err) => {
                        error!(queue = %queue, job_id = %job_id, %err, "fail report failed");
                    }
                }
            }
        }
    }
}
