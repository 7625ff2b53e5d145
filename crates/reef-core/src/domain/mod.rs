//! Domain model: ids, queues, jobs, tenants and their lifecycle.

pub mod email;
pub mod ids;
pub mod job;
pub mod lifecycle;
pub mod queue_name;
pub mod tenant;

pub use email::{EmailTemplate, OutboundEmail, RenderedEmail};
pub use ids::{JobId, TenantId, UserId};
pub use job::{JobEnvelope, JobOptions};
pub use lifecycle::{
    LifecycleAction, LifecycleError, LifecycleState, LifecycleTransition, SoftDeleteReason,
};
pub use queue_name::QueueName;
pub use tenant::{Member, MemberRole, OwnerContact, PlanTier, Session, Tenant};
