//! In-memory queue transport.
//!
//! Development and test implementation of `QueueTransport`. Nothing is
//! persisted; everything else (retry/backoff, dead jobs, recurring
//! materialization, one active occurrence per registration) behaves like
//! the production transport is required to.

use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, info};

use super::recurring::RecurringEntry;
use super::{JobRecord, JobState};
use crate::domain::{JobEnvelope, JobId, JobOptions, QueueName};
use crate::error::TransportError;
use crate::observability::QueueCounts;
use crate::ports::{
    Clock, DeadJob, FailureDisposition, IdGenerator, JobLease, QueueTransport, Registration,
    UlidGenerator,
};

/// Upper bound on how long an idle `lease` sleeps before re-checking the
/// clock. Recurring due times are wall-clock based and the clock may be
/// moved by hand.
const MAX_IDLE_WAIT: Duration = Duration::from_secs(30);

/// Dead jobs kept per queue; the oldest is dropped beyond this.
pub const DEAD_JOBS_KEPT: usize = 1_000;

/// Delayed job entry. Reverse ordering makes `BinaryHeap` a min-heap.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DelayedJob {
    next_run_at: Instant,
    job_id: JobId,
}

impl PartialOrd for DelayedJob {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DelayedJob {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other.next_run_at.cmp(&self.next_run_at)
    }
}

#[derive(Default)]
struct Lane {
    ready: VecDeque<JobId>,
    delayed: BinaryHeap<DelayedJob>,
    /// Dead jobs, oldest first.
    dead: VecDeque<JobId>,
    /// Acked jobs are removed; only their count survives.
    succeeded: usize,
}

struct TransportState {
    /// Every job that is not yet acked.
    records: HashMap<JobId, JobRecord>,
    lanes: HashMap<QueueName, Lane>,
    recurring: Vec<RecurringEntry>,
    closed: bool,
}

impl TransportState {
    fn new() -> Self {
        Self {
            records: HashMap::new(),
            lanes: QueueName::ALL
                .into_iter()
                .map(|q| (q, Lane::default()))
                .collect(),
            recurring: Vec::new(),
            closed: false,
        }
    }

    fn lane_mut(&mut self, queue: QueueName) -> &mut Lane {
        self.lanes.entry(queue).or_default()
    }

    fn insert_ready(&mut self, record: JobRecord) -> JobId {
        let job_id = record.envelope.job_id();
        let queue = record.envelope.queue();
        self.records.insert(job_id, record);
        self.lane_mut(queue).ready.push_back(job_id);
        job_id
    }

    /// Delayed -> Pending for every job whose backoff has elapsed.
    fn promote_delayed(&mut self, queue: QueueName) {
        let now = Instant::now();
        let Self { records, lanes, .. } = self;
        let Some(lane) = lanes.get_mut(&queue) else {
            return;
        };
        while let Some(entry) = lane.delayed.peek() {
            if entry.next_run_at > now {
                break;
            }
            let Some(entry) = lane.delayed.pop() else {
                break;
            };
            if let Some(record) = records.get_mut(&entry.job_id)
                && record.state == JobState::Delayed
            {
                record.requeue();
                lane.ready.push_back(entry.job_id);
            }
        }
    }

    /// Materialize every due recurring occurrence. Returns the queues that
    /// received a job.
    fn materialize_due(&mut self, clock: &dyn Clock, ids: &dyn IdGenerator) -> Vec<QueueName> {
        let now = clock.now();
        let mut woken = Vec::new();
        let mut fresh = Vec::new();

        for entry in self.recurring.iter_mut().filter(|e| e.is_due(now)) {
            let previous_running = entry
                .last_job
                .and_then(|id| self.records.get(&id))
                .is_some_and(|r| !r.state.is_terminal());

            if previous_running {
                // 前回分がまだ pending/active なら今回の occurrence は捨てる
                debug!(
                    queue = %entry.queue,
                    job_name = %entry.job_name,
                    "previous occurrence still outstanding, skipping"
                );
            } else {
                let envelope = JobEnvelope::new(
                    ids.job_id(),
                    entry.queue,
                    entry.job_name.clone(),
                    entry.payload.clone(),
                    JobOptions::recurring(),
                )
                .with_schedule(entry.cron_expression.clone());
                entry.last_job = Some(envelope.job_id());
                fresh.push(JobRecord::new(envelope));
            }
            entry.advance(now);
        }

        for record in fresh {
            let queue = record.envelope.queue();
            self.insert_ready(record);
            if !woken.contains(&queue) {
                woken.push(queue);
            }
        }
        woken
    }

    /// How long an idle lease on `queue` may sleep.
    fn idle_wait(&self, queue: QueueName, clock: &dyn Clock) -> Duration {
        let now = Instant::now();
        let retry_wait = self
            .lanes
            .get(&queue)
            .and_then(|lane| lane.delayed.peek())
            .map(|entry| entry.next_run_at.saturating_duration_since(now));

        let wall_now = clock.now();
        let recurring_wait = self
            .recurring
            .iter()
            .filter(|e| e.queue == queue)
            .filter_map(|e| e.next_run_at)
            .map(|at| (at - wall_now).to_std().unwrap_or(Duration::ZERO))
            .min();

        [retry_wait, recurring_wait]
            .into_iter()
            .flatten()
            .chain(std::iter::once(MAX_IDLE_WAIT))
            .min()
            .unwrap_or(MAX_IDLE_WAIT)
    }

    /// Ack: the record goes away and the queue's success count goes up.
    fn complete(&mut self, job_id: JobId) -> Result<(), TransportError> {
        let record = self
            .records
            .remove(&job_id)
            .ok_or(TransportError::JobNotFound(job_id))?;
        self.lane_mut(record.envelope.queue()).succeeded += 1;
        Ok(())
    }

    fn bury(&mut self, queue: QueueName, job_id: JobId) {
        let lane = self.lane_mut(queue);
        lane.dead.push_back(job_id);
        let evicted = if lane.dead.len() > DEAD_JOBS_KEPT {
            lane.dead.pop_front()
        } else {
            None
        };
        if let Some(old) = evicted {
            self.records.remove(&old);
        }
    }

    fn counts(&self, queue: QueueName) -> QueueCounts {
        let mut counts = QueueCounts {
            succeeded: self.lanes.get(&queue).map_or(0, |lane| lane.succeeded),
            ..QueueCounts::default()
        };
        for record in self.records.values().filter(|r| r.envelope.queue() == queue) {
            match record.state {
                JobState::Pending => counts.pending += 1,
                JobState::Active => counts.active += 1,
                JobState::Delayed => counts.delayed += 1,
                JobState::Dead => counts.dead += 1,
            }
        }
        counts
    }
}

/// In-memory transport. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct InMemoryTransport {
    state: Arc<Mutex<TransportState>>,
    notifiers: Arc<HashMap<QueueName, Notify>>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl InMemoryTransport {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let ids: Arc<dyn IdGenerator> = Arc::new(UlidGenerator::new(Arc::clone(&clock)));
        Self {
            state: Arc::new(Mutex::new(TransportState::new())),
            notifiers: Arc::new(
                QueueName::ALL
                    .into_iter()
                    .map(|q| (q, Notify::new()))
                    .collect(),
            ),
            clock,
            ids,
        }
    }

    /// Connect from a transport url. Only `memory://` is built in.
    pub fn connect(url: &str, clock: Arc<dyn Clock>) -> Result<Self, TransportError> {
        if url.starts_with("memory://") {
            Ok(Self::new(clock))
        } else {
            Err(TransportError::UnsupportedUrl(url.to_string()))
        }
    }

    fn wake(&self, queue: QueueName) {
        if let Some(notify) = self.notifiers.get(&queue) {
            notify.notify_one();
        }
    }

    /// Materialize due recurring jobs and promote elapsed retries now,
    /// instead of waiting for an idle lease to notice.
    pub async fn tick(&self) {
        let woken = {
            let mut state = self.state.lock().await;
            for queue in QueueName::ALL {
                state.promote_delayed(queue);
            }
            state.materialize_due(self.clock.as_ref(), self.ids.as_ref())
        };
        for queue in woken {
            self.wake(queue);
        }
    }

    /// Snapshot of one job. `None` once the job was acked.
    pub async fn job(&self, job_id: JobId) -> Option<JobRecord> {
        let state = self.state.lock().await;
        state.records.get(&job_id).cloned()
    }

    /// Snapshot of every job still held for a queue, oldest first.
    pub async fn jobs(&self, queue: QueueName) -> Vec<JobRecord> {
        let state = self.state.lock().await;
        let mut jobs: Vec<JobRecord> = state
            .records
            .values()
            .filter(|r| r.envelope.queue() == queue)
            .cloned()
            .collect();
        jobs.sort_by_key(|r| r.created_at);
        jobs
    }

    /// Number of recurring registrations.
    pub async fn recurring_count(&self) -> usize {
        self.state.lock().await.recurring.len()
    }
}

#[async_trait]
impl QueueTransport for InMemoryTransport {
    async fn open(&self, _queue: QueueName) -> Result<(), TransportError> {
        if self.state.lock().await.closed {
            return Err(TransportError::Closed);
        }
        Ok(())
    }

    async fn enqueue(
        &self,
        queue: QueueName,
        job_name: &str,
        payload: serde_json::Value,
        options: JobOptions,
    ) -> Result<JobId, TransportError> {
        let job_id = {
            let mut state = self.state.lock().await;
            if state.closed {
                return Err(TransportError::Closed);
            }
            let envelope = JobEnvelope::new(self.ids.job_id(), queue, job_name, payload, options);
            state.insert_ready(JobRecord::new(envelope))
        };

        self.wake(queue);
        Ok(job_id)
    }

    async fn register_recurring(
        &self,
        queue: QueueName,
        job_name: &str,
        payload: serde_json::Value,
        cron: &str,
    ) -> Result<Registration, TransportError> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(TransportError::Closed);
        }
        if state
            .recurring
            .iter()
            .any(|e| e.matches(queue, job_name, cron))
        {
            return Ok(Registration::AlreadyRegistered);
        }

        let entry = RecurringEntry::new(queue, job_name, cron, payload, self.clock.now())?;
        info!(
            queue = %queue,
            job_name,
            cron,
            next_run_at = ?entry.next_run_at,
            "recurring job registered"
        );
        state.recurring.push(entry);
        drop(state);

        // 次回時刻が変わったので待機中の lease に再計算させる
        self.wake(queue);
        Ok(Registration::Created)
    }

    async fn lease(&self, queue: QueueName) -> Option<Box<dyn JobLease>> {
        let notify = self.notifiers.get(&queue)?;
        loop {
            // enable() before checking state so a close() or enqueue() that
            // lands between the check and the await is not lost.
            let notified = notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let wait = {
                let mut state = self.state.lock().await;
                if state.closed {
                    return None;
                }
                state.promote_delayed(queue);
                let woken = state.materialize_due(self.clock.as_ref(), self.ids.as_ref());
                for other in woken.into_iter().filter(|q| *q != queue) {
                    self.wake(other);
                }

                let next = state.lane_mut(queue).ready.pop_front();
                if let Some(job_id) = next
                    && let Some(record) = state.records.get_mut(&job_id)
                {
                    record.start_attempt();
                    let lease = InMemoryLease {
                        job_id,
                        envelope: record.envelope.clone(),
                        attempts_made: record.attempts,
                        transport: self.clone(),
                    };
                    return Some(Box::new(lease));
                }

                state.idle_wait(queue, self.clock.as_ref())
            };

            tokio::select! {
                _ = &mut notified => {},
                _ = tokio::time::sleep(wait) => {},
            }
        }
    }

    async fn counts(&self, queue: QueueName) -> Result<QueueCounts, TransportError> {
        let state = self.state.lock().await;
        Ok(state.counts(queue))
    }

    async fn dead_jobs(&self, queue: QueueName) -> Result<Vec<DeadJob>, TransportError> {
        let state = self.state.lock().await;
        Ok(state
            .records
            .values()
            .filter(|r| r.envelope.queue() == queue && r.state == JobState::Dead)
            .map(|r| DeadJob {
                envelope: r.envelope.clone(),
                attempts: r.attempts,
                error: r.last_error.clone().unwrap_or_default(),
            })
            .collect())
    }

    async fn close(&self) {
        self.state.lock().await.closed = true;
        for notify in self.notifiers.values() {
            notify.notify_waiters();
        }
    }
}

/// Lease handed out by `InMemoryTransport`.
struct InMemoryLease {
    job_id: JobId,
    envelope: JobEnvelope,
    attempts_made: u32,
    transport: InMemoryTransport,
}

#[async_trait]
impl JobLease for InMemoryLease {
    fn envelope(&self) -> &JobEnvelope {
        &self.envelope
    }

    fn attempts_made(&self) -> u32 {
        self.attempts_made
    }

    async fn ack(self: Box<Self>) -> Result<(), TransportError> {
        self.transport.state.lock().await.complete(self.job_id)
    }

    async fn fail(self: Box<Self>, error: String) -> Result<FailureDisposition, TransportError> {
        let queue = self.envelope.queue();
        let disposition = {
            let mut state = self.transport.state.lock().await;
            let record = state
                .records
                .get_mut(&self.job_id)
                .ok_or(TransportError::JobNotFound(self.job_id))?;

            if record.attempts >= record.attempts_allowed() {
                record.mark_dead(error);
                state.bury(queue, self.job_id);
                FailureDisposition::Dead
            } else {
                let delay = record.envelope.options().backoff.next_delay(record.attempts);
                let next_run_at = Instant::now() + delay;
                record.schedule_retry(next_run_at, error);
                state.lane_mut(queue).delayed.push(DelayedJob {
                    next_run_at,
                    job_id: self.job_id,
                });
                FailureDisposition::RetryScheduled { delay }
            }
        }; // lock released here

        // idle な worker に sleep 時間を再計算させる
        if matches!(disposition, FailureDisposition::RetryScheduled { .. }) {
            self.transport.wake(queue);
        }
        Ok(disposition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FixedClock, SystemClock};
    use crate::queue::BackoffPolicy;
    use chrono::{TimeZone, Utc};

    fn transport() -> (InMemoryTransport, FixedClock) {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2026, 5, 1, 7, 0, 0).unwrap());
        (InMemoryTransport::new(Arc::new(clock.clone())), clock)
    }

    async fn lease_now(t: &InMemoryTransport, queue: QueueName) -> Box<dyn JobLease> {
        tokio::time::timeout(Duration::from_millis(200), t.lease(queue))
            .await
            .expect("lease timed out")
            .expect("transport closed")
    }

    #[tokio::test]
    async fn enqueue_and_counts() {
        let (t, _) = transport();
        t.enqueue(QueueName::Email, "welcome", serde_json::json!({}), JobOptions::one_shot())
            .await
            .unwrap();

        let counts = t.counts(QueueName::Email).await.unwrap();
        assert_eq!(counts.pending, 1);
        assert_eq!(t.counts(QueueName::Booking).await.unwrap().pending, 0);
    }

    #[tokio::test]
    async fn lease_transitions_to_active_and_ack_to_succeeded() {
        let (t, _) = transport();
        t.enqueue(QueueName::Email, "welcome", serde_json::json!({"to": "a@b"}), JobOptions::one_shot())
            .await
            .unwrap();

        let lease = lease_now(&t, QueueName::Email).await;
        assert_eq!(lease.envelope().job_name(), "welcome");
        assert_eq!(lease.attempts_made(), 1);
        assert_eq!(t.counts(QueueName::Email).await.unwrap().active, 1);

        let job_id = lease.envelope().job_id();
        lease.ack().await.unwrap();
        let counts = t.counts(QueueName::Email).await.unwrap();
        assert_eq!(counts.succeeded, 1);
        assert_eq!(counts.active, 0);
        assert!(t.job(job_id).await.is_none());
    }

    #[tokio::test]
    async fn acked_jobs_are_not_retained() {
        let (t, _) = transport();
        for _ in 0..1_000 {
            t.enqueue(QueueName::Email, "welcome", serde_json::json!({}), JobOptions::one_shot())
                .await
                .unwrap();
            lease_now(&t, QueueName::Email).await.ack().await.unwrap();
        }

        assert!(t.jobs(QueueName::Email).await.is_empty());
        assert_eq!(t.counts(QueueName::Email).await.unwrap().succeeded, 1_000);
    }

    #[tokio::test]
    async fn dead_jobs_are_capped_per_queue() {
        let (t, _) = transport();
        let options = JobOptions::one_shot().with_attempts(1);
        let first = t
            .enqueue(QueueName::Report, "generate-report", serde_json::json!({}), options)
            .await
            .unwrap();
        for _ in 0..DEAD_JOBS_KEPT {
            t.enqueue(QueueName::Report, "generate-report", serde_json::json!({}), options)
                .await
                .unwrap();
        }
        for _ in 0..=DEAD_JOBS_KEPT {
            let lease = lease_now(&t, QueueName::Report).await;
            assert_eq!(lease.fail("boom".to_string()).await.unwrap(), FailureDisposition::Dead);
        }

        let dead = t.dead_jobs(QueueName::Report).await.unwrap();
        assert_eq!(dead.len(), DEAD_JOBS_KEPT);
        assert!(t.job(first).await.is_none());
    }

    #[tokio::test]
    async fn failure_schedules_retry_then_dead() {
        let (t, _) = transport();
        let options = JobOptions::one_shot()
            .with_attempts(2)
            .with_backoff(BackoffPolicy::exponential(Duration::from_millis(10)));
        let job_id = t
            .enqueue(QueueName::Email, "welcome", serde_json::json!({}), options)
            .await
            .unwrap();

        let lease = lease_now(&t, QueueName::Email).await;
        let first = lease.fail("smtp down".to_string()).await.unwrap();
        assert_eq!(
            first,
            FailureDisposition::RetryScheduled {
                delay: Duration::from_millis(10)
            }
        );
        assert_eq!(t.counts(QueueName::Email).await.unwrap().delayed, 1);

        // the idle lease wakes up once the backoff has elapsed
        let lease = lease_now(&t, QueueName::Email).await;
        assert_eq!(lease.attempts_made(), 2);
        let second = lease.fail("smtp still down".to_string()).await.unwrap();
        assert_eq!(second, FailureDisposition::Dead);

        let dead = t.dead_jobs(QueueName::Email).await.unwrap();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].envelope.job_id(), job_id);
        assert_eq!(dead[0].attempts, 2);
        assert_eq!(dead[0].error, "smtp still down");
    }

    #[tokio::test]
    async fn identical_registration_is_deduplicated() {
        let (t, _) = transport();
        let first = t
            .register_recurring(QueueName::Booking, "send-reminders", serde_json::json!({}), "0 8 * * *")
            .await
            .unwrap();
        let second = t
            .register_recurring(QueueName::Booking, "send-reminders", serde_json::json!({}), "0 8 * * *")
            .await
            .unwrap();

        assert_eq!(first, Registration::Created);
        assert_eq!(second, Registration::AlreadyRegistered);
        assert_eq!(t.recurring_count().await, 1);
    }

    #[tokio::test]
    async fn invalid_cron_is_rejected_at_registration() {
        let (t, _) = transport();
        let err = t
            .register_recurring(QueueName::Booking, "send-reminders", serde_json::json!({}), "8am daily")
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::InvalidCron { .. }));
    }

    #[tokio::test]
    async fn due_occurrence_is_materialized_once_while_outstanding() {
        let (t, clock) = transport();
        t.register_recurring(
            QueueName::Maintenance,
            "cleanup-expired-sessions",
            serde_json::json!({}),
            "0 * * * *",
        )
        .await
        .unwrap();

        t.tick().await;
        assert_eq!(t.counts(QueueName::Maintenance).await.unwrap().pending, 0);

        clock.advance(chrono::Duration::hours(1));
        t.tick().await;
        assert_eq!(t.counts(QueueName::Maintenance).await.unwrap().pending, 1);

        // next hour comes around while the first occurrence is still pending
        clock.advance(chrono::Duration::hours(1));
        t.tick().await;
        assert_eq!(t.counts(QueueName::Maintenance).await.unwrap().pending, 1);

        let lease = lease_now(&t, QueueName::Maintenance).await;
        assert!(lease.envelope().is_recurring());
        assert_eq!(lease.envelope().options().attempts, 1);
        lease.ack().await.unwrap();

        clock.advance(chrono::Duration::hours(1));
        t.tick().await;
        let counts = t.counts(QueueName::Maintenance).await.unwrap();
        assert_eq!(counts.pending, 1);
        assert_eq!(counts.succeeded, 1);
    }

    #[tokio::test]
    async fn close_releases_waiting_leases() {
        let (t, _) = transport();
        let waiter = tokio::spawn({
            let t = t.clone();
            async move { t.lease(QueueName::Report).await.is_none() }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        t.close().await;

        let released = tokio::time::timeout(Duration::from_millis(200), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(released);
        assert!(matches!(
            t.enqueue(QueueName::Report, "generate-report", serde_json::json!({}), JobOptions::one_shot())
                .await,
            Err(TransportError::Closed)
        ));
    }

    #[tokio::test]
    async fn outstanding_lease_can_ack_after_close() {
        let (t, _) = transport();
        t.enqueue(QueueName::Email, "welcome", serde_json::json!({}), JobOptions::one_shot())
            .await
            .unwrap();
        let lease = lease_now(&t, QueueName::Email).await;
        t.close().await;

        lease.ack().await.unwrap();
        assert_eq!(t.counts(QueueName::Email).await.unwrap().succeeded, 1);
    }

    #[test]
    fn connect_only_knows_memory_scheme() {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        assert!(InMemoryTransport::connect("memory://", Arc::clone(&clock)).is_ok());
        assert!(matches!(
            InMemoryTransport::connect("redis://localhost:6379", clock),
            Err(TransportError::UnsupportedUrl(_))
        ));
    }
}
