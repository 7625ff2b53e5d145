//! Data store ports.
//!
//! The relational store behind the product is shared by all handlers and
//! is safe to use concurrently. Each trait covers what one family of jobs
//! reads or writes.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{LifecycleState, OwnerContact, Tenant, TenantId};
use crate::error::StoreError;

#[async_trait]
pub trait TenantStore: Send + Sync {
    /// Tenants on the free or standard plan, or without a subscription,
    /// that are not soft-deleted yet.
    async fn list_lifecycle_candidates(&self) -> Result<Vec<Tenant>, StoreError>;

    /// Most recent session start across all members of the tenant.
    async fn last_activity_at(&self, tenant_id: TenantId)
    -> Result<Option<DateTime<Utc>>, StoreError>;

    /// First member with the owner role.
    async fn find_owner(&self, tenant_id: TenantId) -> Result<Option<OwnerContact>, StoreError>;

    async fn save_lifecycle(
        &self,
        tenant_id: TenantId,
        state: &LifecycleState,
    ) -> Result<(), StoreError>;
}

/// A confirmed booking on an upcoming trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingBooking {
    pub booking_number: String,
    pub customer_name: String,
    pub customer_email: String,
    pub trip_name: String,
    pub departs_at: DateTime<Utc>,
    pub shop_name: String,
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Confirmed bookings whose trip departs in `[from, to)`.
    async fn bookings_departing_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<UpcomingBooking>, StoreError>;
}

/// A trial that is about to run out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialNotice {
    pub tenant_id: TenantId,
    pub shop_name: String,
    pub owner_email: String,
    pub trial_ends_at: DateTime<Utc>,
}

#[async_trait]
pub trait MaintenanceStore: Send + Sync {
    /// Flag equipment whose next service date is on or before `today`.
    /// Returns how many items were newly flagged.
    async fn flag_equipment_due_for_service(&self, today: NaiveDate) -> Result<usize, StoreError>;

    /// Delete sessions that expired before `now`. Returns how many.
    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize, StoreError>;

    async fn trials_ending_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<TrialNotice>, StoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportPeriod {
    Daily,
    Weekly,
    Monthly,
}

impl ReportPeriod {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportPeriod::Daily => "daily",
            ReportPeriod::Weekly => "weekly",
            ReportPeriod::Monthly => "monthly",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub shop_name: String,
    pub title: String,
    pub lines: Vec<String>,
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn build_report(
        &self,
        tenant_id: TenantId,
        period: ReportPeriod,
        as_of: DateTime<Utc>,
    ) -> Result<ReportSummary, StoreError>;
}
