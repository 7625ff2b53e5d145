//! Wiring of every handler into one JobSystem.

use std::sync::Arc;

use super::builder::JobSystemBuilder;
use super::handlers::{
    BookingReminderEmail, CheckEquipmentService, CheckEquipmentServiceHandler,
    CheckTrialExpirations, CheckTrialExpirationsHandler, CleanupExpiredSessions,
    CleanupExpiredSessionsHandler, CleanupStaleTenants, CleanupStaleTenantsHandler,
    EmailJobHandler, GenerateReport, GenerateReportHandler, ReportReadyEmail, SendReminders,
    SendRemindersHandler, TrialExpiringEmail, WelcomeEmail,
};
use super::job_system::JobSystem;
use super::lifecycle_scanner::TenantLifecycleScanner;
use super::notifications::NotificationDispatch;
use super::producer::JobProducer;
use super::scheduler::standard_schedule;
use crate::config::ConcurrencyConfig;
use crate::domain::QueueName;
use crate::error::BuildError;
use crate::ports::{BookingStore, Clock, MaintenanceStore, QueueTransport, ReportStore, TenantStore};

/// External collaborators the handlers need.
#[derive(Clone)]
pub struct Collaborators {
    pub transport: Arc<dyn QueueTransport>,
    pub tenants: Arc<dyn TenantStore>,
    pub bookings: Arc<dyn BookingStore>,
    pub maintenance: Arc<dyn MaintenanceStore>,
    pub reports: Arc<dyn ReportStore>,
    pub notifications: NotificationDispatch,
    pub clock: Arc<dyn Clock>,
}

/// Build the JobSystem with every production handler and the standard
/// schedule.
pub fn assemble(c: Collaborators, concurrency: &ConcurrencyConfig) -> Result<JobSystem, BuildError> {
    let producer = JobProducer::new(Arc::clone(&c.transport));
    let email = EmailJobHandler::new(c.notifications.clone());
    let scanner = Arc::new(TenantLifecycleScanner::new(
        c.tenants,
        c.notifications,
        Arc::clone(&c.clock),
    ));

    let mut builder = JobSystemBuilder::new(c.transport)
        .register::<BookingReminderEmail, _>(email.clone())?
        .register::<TrialExpiringEmail, _>(email.clone())?
        .register::<ReportReadyEmail, _>(email.clone())?
        .register::<WelcomeEmail, _>(email)?
        .register::<SendReminders, _>(SendRemindersHandler::new(
            c.bookings,
            producer.clone(),
            Arc::clone(&c.clock),
        ))?
        .register::<GenerateReport, _>(GenerateReportHandler::new(
            c.reports,
            producer.clone(),
            Arc::clone(&c.clock),
        ))?
        .register::<CheckEquipmentService, _>(CheckEquipmentServiceHandler::new(
            Arc::clone(&c.maintenance),
            Arc::clone(&c.clock),
        ))?
        .register::<CleanupExpiredSessions, _>(CleanupExpiredSessionsHandler::new(
            Arc::clone(&c.maintenance),
            Arc::clone(&c.clock),
        ))?
        .register::<CheckTrialExpirations, _>(CheckTrialExpirationsHandler::new(
            c.maintenance,
            producer,
            c.clock,
        ))?
        .register::<CleanupStaleTenants, _>(CleanupStaleTenantsHandler::new(scanner))?
        .schedule(standard_schedule());

    for queue in QueueName::ALL {
        builder = builder.concurrency(queue, concurrency.for_queue(queue));
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::{InMemoryDataStore, RecordingMailer, TextRenderer};
    use crate::ports::FixedClock;
    use crate::queue::InMemoryTransport;
    use chrono::Utc;

    #[tokio::test]
    async fn every_queue_gets_a_pool() {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(Utc::now()));
        let store = Arc::new(InMemoryDataStore::new());
        let transport = InMemoryTransport::new(Arc::clone(&clock));
        let mut system = assemble(
            Collaborators {
                transport: Arc::new(transport.clone()),
                tenants: store.clone(),
                bookings: store.clone(),
                maintenance: store.clone(),
                reports: store,
                notifications: NotificationDispatch::new(
                    Arc::new(RecordingMailer::new()),
                    Arc::new(TextRenderer::default()),
                ),
                clock,
            },
            &ConcurrencyConfig {
                email: 2,
                ..ConcurrencyConfig::default()
            },
        )
        .unwrap();

        assert_eq!(system.concurrency(QueueName::Email), 2);
        assert_eq!(system.concurrency(QueueName::Maintenance), 2);
        system.register_schedule().await.unwrap();
        assert_eq!(transport.recurring_count().await, 5);

        assert_eq!(system.start().await, QueueName::ALL.to_vec());
        system.shutdown().await;
    }
}
