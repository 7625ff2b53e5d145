//! maintenance queue: housekeeping jobs, all scheduled.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::email::TrialExpiringEmail;
use crate::app::lifecycle_scanner::TenantLifecycleScanner;
use crate::app::producer::JobProducer;
use crate::domain::{JobOptions, QueueName};
use crate::error::JobError;
use crate::ports::{Clock, MaintenanceStore};
use crate::typed::{Handler, JobPayload};

/// Trials ending within this many days get a heads-up email.
pub const TRIAL_NOTICE_WINDOW_DAYS: i64 = 3;

macro_rules! scheduled_job {
    ($ty:ident, $name:literal) => {
        #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $ty {}

        impl JobPayload for $ty {
            const NAME: &'static str = $name;
            const QUEUE: QueueName = QueueName::Maintenance;

            fn options() -> JobOptions {
                JobOptions::recurring()
            }
        }
    };
}

scheduled_job!(CheckEquipmentService, "check-equipment-service");
scheduled_job!(CleanupExpiredSessions, "cleanup-expired-sessions");
scheduled_job!(CheckTrialExpirations, "check-trial-expirations");
scheduled_job!(CleanupStaleTenants, "cleanup-stale-tenants");

pub struct CheckEquipmentServiceHandler {
    store: Arc<dyn MaintenanceStore>,
    clock: Arc<dyn Clock>,
}

impl CheckEquipmentServiceHandler {
    pub fn new(store: Arc<dyn MaintenanceStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }
}

#[async_trait]
impl Handler<CheckEquipmentService> for CheckEquipmentServiceHandler {
    async fn handle(&self, _job: CheckEquipmentService) -> Result<(), JobError> {
        let today = self.clock.now().date_naive();
        let flagged = self.store.flag_equipment_due_for_service(today).await?;
        info!(flagged, %today, "equipment service check done");
        Ok(())
    }
}

pub struct CleanupExpiredSessionsHandler {
    store: Arc<dyn MaintenanceStore>,
    clock: Arc<dyn Clock>,
}

impl CleanupExpiredSessionsHandler {
    pub fn new(store: Arc<dyn MaintenanceStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }
}

#[async_trait]
impl Handler<CleanupExpiredSessions> for CleanupExpiredSessionsHandler {
    async fn handle(&self, _job: CleanupExpiredSessions) -> Result<(), JobError> {
        let purged = self.store.purge_expired_sessions(self.clock.now()).await?;
        info!(purged, "expired sessions cleaned up");
        Ok(())
    }
}

pub struct CheckTrialExpirationsHandler {
    store: Arc<dyn MaintenanceStore>,
    producer: JobProducer,
    clock: Arc<dyn Clock>,
}

impl CheckTrialExpirationsHandler {
    pub fn new(store: Arc<dyn MaintenanceStore>, producer: JobProducer, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            producer,
            clock,
        }
    }
}

#[async_trait]
impl Handler<CheckTrialExpirations> for CheckTrialExpirationsHandler {
    async fn handle(&self, _job: CheckTrialExpirations) -> Result<(), JobError> {
        let now = self.clock.now();
        let trials = self
            .store
            .trials_ending_between(now, now + Duration::days(TRIAL_NOTICE_WINDOW_DAYS))
            .await?;

        for trial in &trials {
            // 残り 1 日未満でも 0 日とは言わない
            let days_left = (trial.trial_ends_at - now).num_days().max(1);
            self.producer
                .enqueue(&TrialExpiringEmail {
                    to: trial.owner_email.clone(),
                    shop_name: trial.shop_name.clone(),
                    days_left,
                })
                .await?;
        }

        info!(notices = trials.len(), "trial expiration check done");
        Ok(())
    }
}

pub struct CleanupStaleTenantsHandler {
    scanner: Arc<TenantLifecycleScanner>,
}

impl CleanupStaleTenantsHandler {
    pub fn new(scanner: Arc<TenantLifecycleScanner>) -> Self {
        Self { scanner }
    }
}

#[async_trait]
impl Handler<CleanupStaleTenants> for CleanupStaleTenantsHandler {
    async fn handle(&self, _job: CleanupStaleTenants) -> Result<(), JobError> {
        // per-tenant failures are in the report; only listing failures fail the job
        self.scanner.run().await?;
        Ok(())
    }
}
