//! Job payloads and handlers, one module per queue.

pub mod booking;
pub mod email;
pub mod maintenance;
pub mod report;

pub use self::booking::{SendReminders, SendRemindersHandler};
pub use self::email::{
    BookingReminderEmail, EmailJob, EmailJobHandler, ReportReadyEmail, TrialExpiringEmail,
    WelcomeEmail,
};
pub use self::maintenance::{
    CheckEquipmentService, CheckEquipmentServiceHandler, CheckTrialExpirations,
    CheckTrialExpirationsHandler, CleanupExpiredSessions, CleanupExpiredSessionsHandler,
    CleanupStaleTenants, CleanupStaleTenantsHandler, TRIAL_NOTICE_WINDOW_DAYS,
};
pub use self::report::{GenerateReport, GenerateReportHandler};
