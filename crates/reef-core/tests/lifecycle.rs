use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, TimeZone, Utc};

use reef_core::app::{
    Collaborators, NotificationDispatch, ScanReport, TenantLifecycleScanner, assemble,
};
use reef_core::config::ConcurrencyConfig;
use reef_core::domain::{
    LifecycleState, Member, MemberRole, PlanTier, QueueName, Session, SoftDeleteReason, Tenant,
    TenantId, UserId,
};
use reef_core::impls::{InMemoryDataStore, RecordingMailer, TextRenderer};
use reef_core::ports::{Clock, FixedClock, QueueTransport};
use reef_core::queue::InMemoryTransport;

const OWNER: &str = "owner@bluewater.test";

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 10, 3, 30, 0).unwrap()
}

struct World {
    store: InMemoryDataStore,
    mailer: RecordingMailer,
    clock: FixedClock,
}

impl World {
    fn new() -> Self {
        Self {
            store: InMemoryDataStore::new(),
            mailer: RecordingMailer::new(),
            clock: FixedClock::new(t0()),
        }
    }

    fn notifications(&self) -> NotificationDispatch {
        NotificationDispatch::new(Arc::new(self.mailer.clone()), Arc::new(TextRenderer::default()))
    }

    fn scanner(&self) -> TenantLifecycleScanner {
        TenantLifecycleScanner::new(
            Arc::new(self.store.clone()),
            self.notifications(),
            Arc::new(self.clock.clone()),
        )
    }

    /// Tenant whose owner last signed in at `t0()`. The session outlives
    /// every scenario so session cleanup never removes it.
    fn tenant(&self, name: &str, email: &str, plan: Option<PlanTier>) -> TenantId {
        let tenant_id = TenantId::generate();
        let user_id = UserId::generate();
        self.store.add_tenant(Tenant::new(tenant_id, name, plan));
        self.store.add_member(Member {
            user_id,
            tenant_id,
            name: "Noa".to_string(),
            email: email.to_string(),
            role: MemberRole::Owner,
        });
        self.store.insert_session(Session {
            user_id,
            started_at: t0(),
            expires_at: t0() + Duration::days(365),
        });
        tenant_id
    }

    fn at_day(&self, day: i64) {
        self.clock.set(t0() + Duration::days(day));
    }
}

#[tokio::test]
async fn inactivity_walks_through_every_stage_once() {
    let world = World::new();
    let scanner = world.scanner();
    let tenant_id = world.tenant("Bluewater", OWNER, Some(PlanTier::Free));

    world.at_day(60);
    let report = scanner.run().await.unwrap();
    assert_eq!(report.first_warnings_sent, 1);
    let first_at = world.clock.now();
    assert_eq!(
        world.store.lifecycle(tenant_id),
        Some(LifecycleState::FirstWarned {
            first_warning_sent_at: first_at
        })
    );
    assert_eq!(world.mailer.sent_to(OWNER).len(), 1);

    // same day again: nothing new
    let report = scanner.run().await.unwrap();
    assert_eq!(report, ScanReport { processed: 1, ..ScanReport::default() });
    assert_eq!(world.mailer.sent_to(OWNER).len(), 1);

    world.at_day(75);
    let report = scanner.run().await.unwrap();
    assert_eq!(report.second_warnings_sent, 1);
    let sent = world.mailer.sent_to(OWNER);
    assert_eq!(sent.len(), 2);
    assert!(sent[1].text.contains("15 days"), "final notice was: {}", sent[1].text);
    let second_at = world.clock.now();

    world.at_day(90);
    let report = scanner.run().await.unwrap();
    assert_eq!(report.soft_deleted, 1);
    assert_eq!(world.mailer.sent_to(OWNER).len(), 2, "soft delete sends no email");
    assert_eq!(
        world.store.lifecycle(tenant_id),
        Some(LifecycleState::SoftDeleted {
            first_warning_sent_at: Some(first_at),
            second_warning_sent_at: Some(second_at),
            soft_deleted_at: world.clock.now(),
            reason: SoftDeleteReason::Inactivity,
        })
    );

    world.at_day(120);
    let report = scanner.run().await.unwrap();
    assert_eq!(report, ScanReport::default());
    assert_eq!(world.mailer.sent().len(), 2);
}

#[tokio::test]
async fn tenant_first_seen_at_eighty_days_gets_only_the_final_notice() {
    let world = World::new();
    let tenant_id = world.tenant("Late", OWNER, None);

    world.at_day(80);
    let report = world.scanner().run().await.unwrap();

    assert_eq!(report.first_warnings_sent, 0);
    assert_eq!(report.second_warnings_sent, 1);
    assert!(world.mailer.sent_to(OWNER)[0].text.contains("10 days"));
    assert!(matches!(
        world.store.lifecycle(tenant_id),
        Some(LifecycleState::SecondWarned {
            first_warning_sent_at: None,
            ..
        })
    ));
}

#[tokio::test]
async fn premium_tenant_is_never_touched() {
    let world = World::new();
    let tenant_id = world.tenant("Paid", OWNER, Some(PlanTier::Premium));

    for day in [60, 75, 90, 200] {
        world.at_day(day);
        let report = world.scanner().run().await.unwrap();
        assert_eq!(report, ScanReport::default());
    }
    assert!(world.mailer.sent().is_empty());
    assert_eq!(world.store.lifecycle(tenant_id), Some(LifecycleState::Active));
}

#[tokio::test]
async fn tenant_without_sessions_is_skipped() {
    let world = World::new();
    let tenant_id = TenantId::generate();
    world.store.add_tenant(Tenant::new(tenant_id, "Quiet", None));
    world.store.add_member(Member {
        user_id: UserId::generate(),
        tenant_id,
        name: "Sol".to_string(),
        email: OWNER.to_string(),
        role: MemberRole::Owner,
    });

    world.at_day(100);
    let report = world.scanner().run().await.unwrap();

    assert_eq!(report.processed, 1);
    assert!(report.errors.is_empty());
    assert!(world.mailer.sent().is_empty());
    assert_eq!(world.store.lifecycle(tenant_id), Some(LifecycleState::Active));
}

#[tokio::test]
async fn send_failure_is_retried_by_the_next_run() {
    let world = World::new();
    let tenant_id = world.tenant("Flaky", OWNER, None);
    let other = world.tenant("Steady", "owner@steady.test", None);
    world.mailer.reject(OWNER);

    world.at_day(61);
    let report = world.scanner().run().await.unwrap();
    assert_eq!(report.processed, 2);
    assert_eq!(report.first_warnings_sent, 1);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].tenant_id, tenant_id);
    assert_eq!(world.store.lifecycle(tenant_id), Some(LifecycleState::Active));
    assert!(matches!(world.store.lifecycle(other), Some(LifecycleState::FirstWarned { .. })));

    world.mailer.accept(OWNER);
    world.at_day(62);
    let report = world.scanner().run().await.unwrap();
    assert_eq!(report.first_warnings_sent, 1);
    assert!(report.errors.is_empty());
    assert_eq!(world.mailer.sent_to(OWNER).len(), 1);
    assert_eq!(world.mailer.sent_to("owner@steady.test").len(), 1);
}

/// Is a stale-tenant scan still held by the transport?
async fn scan_outstanding(transport: &InMemoryTransport) -> bool {
    transport
        .jobs(QueueName::Maintenance)
        .await
        .iter()
        .any(|r| r.envelope.job_name() == "cleanup-stale-tenants")
}

/// Move the clock, fire due occurrences and wait for the scan to be acked.
async fn scan_at_day(world: &World, transport: &InMemoryTransport, day: i64) {
    let before = transport.counts(QueueName::Maintenance).await.unwrap().succeeded;
    world.at_day(day);
    transport.tick().await;
    tokio::time::timeout(StdDuration::from_secs(10), async {
        while scan_outstanding(transport).await
            || transport.counts(QueueName::Maintenance).await.unwrap().succeeded == before
        {
            tokio::time::sleep(StdDuration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn scheduled_scan_runs_through_the_job_system() {
    let world = World::new();
    let tenant_id = world.tenant("Bluewater", OWNER, None);
    let clock: Arc<dyn Clock> = Arc::new(world.clock.clone());
    let transport = InMemoryTransport::new(Arc::clone(&clock));
    let store = Arc::new(world.store.clone());

    let mut system = assemble(
        Collaborators {
            transport: Arc::new(transport.clone()),
            tenants: store.clone(),
            bookings: store.clone(),
            maintenance: store.clone(),
            reports: store,
            notifications: world.notifications(),
            clock,
        },
        &ConcurrencyConfig::default(),
    )
    .unwrap();
    system.register_schedule().await.unwrap();
    system.start().await;

    scan_at_day(&world, &transport, 60).await;
    assert!(matches!(world.store.lifecycle(tenant_id), Some(LifecycleState::FirstWarned { .. })));

    scan_at_day(&world, &transport, 75).await;
    assert!(matches!(world.store.lifecycle(tenant_id), Some(LifecycleState::SecondWarned { .. })));

    scan_at_day(&world, &transport, 90).await;
    assert!(world.store.lifecycle(tenant_id).is_some_and(|s| s.is_soft_deleted()));
    assert_eq!(world.mailer.sent_to(OWNER).len(), 2);

    system.shutdown().await;
}
