//! InMemoryDataStore - 開発・テスト用のデータストア
//!
//! 四つの store port を一つの構造体で実装する。seed 用のメソッドは同期。

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::domain::{
    LifecycleState, Member, MemberRole, OwnerContact, Session, Tenant, TenantId, UserId,
};
use crate::error::StoreError;
use crate::ports::{
    BookingStore, MaintenanceStore, ReportPeriod, ReportStore, ReportSummary, TenantStore,
    TrialNotice, UpcomingBooking,
};

/// Session length used by `add_session`.
const SESSION_TTL_DAYS: i64 = 30;

#[derive(Debug, Clone)]
struct Equipment {
    name: String,
    next_service_on: NaiveDate,
    service_due: bool,
}

#[derive(Debug, Default)]
struct Tables {
    tenants: Vec<Tenant>,
    members: Vec<Member>,
    sessions: Vec<Session>,
    bookings: Vec<UpcomingBooking>,
    equipment: Vec<Equipment>,
    trials: Vec<TrialNotice>,
    unavailable: bool,
}

impl Tables {
    fn member_ids(&self, tenant_id: TenantId) -> Vec<UserId> {
        self.members
            .iter()
            .filter(|m| m.tenant_id == tenant_id)
            .map(|m| m.user_id)
            .collect()
    }

    fn available(&self) -> Result<(), StoreError> {
        if self.unavailable {
            Err(StoreError::Unavailable("in-memory store switched off".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDataStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn add_tenant(&self, tenant: Tenant) {
        self.tables().tenants.push(tenant);
    }

    pub fn add_member(&self, member: Member) {
        self.tables().members.push(member);
    }

    /// Session starting at `started_at` with the default lifetime.
    pub fn add_session(&self, user_id: UserId, started_at: DateTime<Utc>) {
        self.insert_session(Session {
            user_id,
            started_at,
            expires_at: started_at + Duration::days(SESSION_TTL_DAYS),
        });
    }

    pub fn insert_session(&self, session: Session) {
        self.tables().sessions.push(session);
    }

    pub fn session_count(&self) -> usize {
        self.tables().sessions.len()
    }

    pub fn add_booking(&self, booking: UpcomingBooking) {
        self.tables().bookings.push(booking);
    }

    pub fn add_equipment(&self, name: impl Into<String>, next_service_on: NaiveDate) {
        self.tables().equipment.push(Equipment {
            name: name.into(),
            next_service_on,
            service_due: false,
        });
    }

    /// Names of equipment flagged for service, sorted.
    pub fn equipment_flagged_for_service(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tables()
            .equipment
            .iter()
            .filter(|e| e.service_due)
            .map(|e| e.name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn add_trial(&self, trial: TrialNotice) {
        self.tables().trials.push(trial);
    }

    /// Make every store call fail with `StoreError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.tables().unavailable = unavailable;
    }

    pub fn tenant(&self, tenant_id: TenantId) -> Option<Tenant> {
        self.tables()
            .tenants
            .iter()
            .find(|t| t.id == tenant_id)
            .cloned()
    }

    pub fn lifecycle(&self, tenant_id: TenantId) -> Option<LifecycleState> {
        self.tenant(tenant_id).map(|t| t.lifecycle)
    }
}

#[async_trait]
impl TenantStore for InMemoryDataStore {
    async fn list_lifecycle_candidates(&self) -> Result<Vec<Tenant>, StoreError> {
        let tables = self.tables();
        tables.available()?;
        Ok(tables
            .tenants
            .iter()
            .filter(|t| !t.is_premium() && !t.lifecycle.is_soft_deleted())
            .cloned()
            .collect())
    }

    async fn last_activity_at(
        &self,
        tenant_id: TenantId,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        let tables = self.tables();
        tables.available()?;
        let members = tables.member_ids(tenant_id);
        Ok(tables
            .sessions
            .iter()
            .filter(|s| members.contains(&s.user_id))
            .map(|s| s.started_at)
            .max())
    }

    async fn find_owner(&self, tenant_id: TenantId) -> Result<Option<OwnerContact>, StoreError> {
        let tables = self.tables();
        tables.available()?;
        Ok(tables
            .members
            .iter()
            .find(|m| m.tenant_id == tenant_id && m.role == MemberRole::Owner)
            .map(OwnerContact::from))
    }

    async fn save_lifecycle(
        &self,
        tenant_id: TenantId,
        state: &LifecycleState,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables();
        tables.available()?;
        let tenant = tables
            .tenants
            .iter_mut()
            .find(|t| t.id == tenant_id)
            .ok_or_else(|| StoreError::NotFound(format!("tenant {tenant_id}")))?;
        tenant.lifecycle = *state;
        Ok(())
    }
}

#[async_trait]
impl BookingStore for InMemoryDataStore {
    async fn bookings_departing_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<UpcomingBooking>, StoreError> {
        let tables = self.tables();
        tables.available()?;
        let mut bookings: Vec<UpcomingBooking> = tables
            .bookings
            .iter()
            .filter(|b| b.departs_at >= from && b.departs_at < to)
            .cloned()
            .collect();
        bookings.sort_by_key(|b| b.departs_at);
        Ok(bookings)
    }
}

#[async_trait]
impl MaintenanceStore for InMemoryDataStore {
    async fn flag_equipment_due_for_service(&self, today: NaiveDate) -> Result<usize, StoreError> {
        let mut tables = self.tables();
        tables.available()?;
        let mut flagged = 0;
        for item in tables
            .equipment
            .iter_mut()
            .filter(|e| !e.service_due && e.next_service_on <= today)
        {
            item.service_due = true;
            flagged += 1;
        }
        Ok(flagged)
    }

    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut tables = self.tables();
        tables.available()?;
        let before = tables.sessions.len();
        tables.sessions.retain(|s| s.expires_at >= now);
        Ok(before - tables.sessions.len())
    }

    async fn trials_ending_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<TrialNotice>, StoreError> {
        let tables = self.tables();
        tables.available()?;
        Ok(tables
            .trials
            .iter()
            .filter(|t| t.trial_ends_at >= from && t.trial_ends_at < to)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ReportStore for InMemoryDataStore {
    async fn build_report(
        &self,
        tenant_id: TenantId,
        period: ReportPeriod,
        as_of: DateTime<Utc>,
    ) -> Result<ReportSummary, StoreError> {
        let tables = self.tables();
        tables.available()?;
        let tenant = tables
            .tenants
            .iter()
            .find(|t| t.id == tenant_id)
            .ok_or_else(|| StoreError::NotFound(format!("tenant {tenant_id}")))?;

        let window = match period {
            ReportPeriod::Daily => Duration::days(1),
            ReportPeriod::Weekly => Duration::days(7),
            ReportPeriod::Monthly => Duration::days(30),
        };
        let members = tables.member_ids(tenant_id);
        let sessions = tables
            .sessions
            .iter()
            .filter(|s| members.contains(&s.user_id))
            .filter(|s| s.started_at >= as_of - window && s.started_at < as_of)
            .count();

        Ok(ReportSummary {
            shop_name: tenant.name.clone(),
            title: format!("{} report, {}", period.as_str(), as_of.date_naive()),
            lines: vec![
                format!("members: {}", members.len()),
                format!("sessions: {sessions}"),
            ],
        })
    }
}
