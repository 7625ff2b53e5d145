//! Ports: the seams to external collaborators.
//!
//! - queue transport (durable job queue)
//! - data store (tenants, bookings, equipment, reports)
//! - mailer + email renderer
//! - clock and id generation

pub mod clock;
pub mod data_store;
pub mod id_generator;
pub mod mailer;
pub mod transport;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::data_store::{
    BookingStore, MaintenanceStore, ReportPeriod, ReportStore, ReportSummary, TenantStore,
    TrialNotice, UpcomingBooking,
};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::mailer::{EmailRenderer, MailError, Mailer, RenderError};
pub use self::transport::{DeadJob, FailureDisposition, JobLease, QueueTransport, Registration};
