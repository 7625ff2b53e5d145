//! TenantLifecycleScanner - inactivity warnings and soft delete.
//!
//! ```text
//! Active --(>=60d)--> FirstWarned --(>=75d)--> SecondWarned --(>=90d)--> SoftDeleted
//! ```
//!
//! One run walks every candidate tenant once. For each tenant the
//! read-decide-send-persist step is a unit: the ledger only moves forward
//! after the mail transport accepted the notice, so a failed send is
//! retried by the next run and a successful one is never repeated.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::app::notifications::NotificationDispatch;
use crate::domain::lifecycle::{days_since_activity, decide};
use crate::domain::{
    EmailTemplate, LifecycleAction, LifecycleError, LifecycleTransition, OwnerContact,
    SoftDeleteReason, Tenant, TenantId,
};
use crate::error::StoreError;
use crate::ports::{Clock, TenantStore};

/// Result of one scan, logged at the end of every run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub processed: usize,
    pub first_warnings_sent: usize,
    pub second_warnings_sent: usize,
    pub soft_deleted: usize,
    pub errors: Vec<TenantFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantFailure {
    pub tenant_id: TenantId,
    pub error: String,
}

/// Why one tenant could not be advanced on this run.
#[derive(Debug, Error)]
pub enum TenantScanError {
    #[error("tenant has no owner to notify")]
    NoOwner,

    #[error("notice to {to} not sent: {reason}")]
    NotSent { to: String, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Skipped(&'static str),
    Unchanged,
    FirstWarningSent,
    SecondWarningSent,
    SoftDeleted,
}

pub struct TenantLifecycleScanner {
    store: Arc<dyn TenantStore>,
    notifications: NotificationDispatch,
    clock: Arc<dyn Clock>,
}

impl TenantLifecycleScanner {
    pub fn new(
        store: Arc<dyn TenantStore>,
        notifications: NotificationDispatch,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            notifications,
            clock,
        }
    }

    /// Scan every candidate tenant.
    ///
    /// Only a failure to list candidates fails the run. Anything that goes
    /// wrong for a single tenant lands in `ScanReport::errors` and the scan
    /// moves on to the next one.
    pub async fn run(&self) -> Result<ScanReport, StoreError> {
        let tenants = self.store.list_lifecycle_candidates().await?;
        let now = self.clock.now();
        let mut report = ScanReport::default();

        for tenant in &tenants {
            report.processed += 1;
            match self.scan_tenant(tenant, now).await {
                Ok(Outcome::FirstWarningSent) => report.first_warnings_sent += 1,
                Ok(Outcome::SecondWarningSent) => report.second_warnings_sent += 1,
                Ok(Outcome::SoftDeleted) => report.soft_deleted += 1,
                Ok(Outcome::Skipped(reason)) => {
                    debug!(tenant_id = %tenant.id, reason, "tenant skipped");
                }
                Ok(Outcome::Unchanged) => {}
                Err(err) => {
                    warn!(tenant_id = %tenant.id, error = %err, "tenant lifecycle step failed");
                    report.errors.push(TenantFailure {
                        tenant_id: tenant.id,
                        error: err.to_string(),
                    });
                }
            }
        }

        info!(
            processed = report.processed,
            first_warnings_sent = report.first_warnings_sent,
            second_warnings_sent = report.second_warnings_sent,
            soft_deleted = report.soft_deleted,
            errors = report.errors.len(),
            "tenant lifecycle scan finished"
        );
        Ok(report)
    }

    async fn scan_tenant(&self, tenant: &Tenant, now: DateTime<Utc>) -> Result<Outcome, TenantScanError> {
        // candidates exclude paying tenants already; never touch one regardless
        if tenant.is_premium() {
            return Ok(Outcome::Skipped("premium"));
        }
        if tenant.lifecycle.is_soft_deleted() {
            return Ok(Outcome::Skipped("soft-deleted"));
        }

        let Some(last_activity_at) = self.store.last_activity_at(tenant.id).await? else {
            return Ok(Outcome::Skipped("no activity"));
        };
        let days = days_since_activity(now, last_activity_at);

        match decide(&tenant.lifecycle, days) {
            LifecycleAction::Nothing => Ok(Outcome::Unchanged),
            LifecycleAction::SoftDelete => {
                let next = tenant.lifecycle.apply(LifecycleTransition::SoftDeleted {
                    at: now,
                    reason: SoftDeleteReason::Inactivity,
                })?;
                self.store.save_lifecycle(tenant.id, &next).await?;
                info!(tenant_id = %tenant.id, days_inactive = days, "tenant soft-deleted");
                Ok(Outcome::SoftDeleted)
            }
            LifecycleAction::SendFinalNotice { days_remaining } => {
                // an invalid transition must not send mail
                let next = tenant
                    .lifecycle
                    .apply(LifecycleTransition::SecondWarningSent { at: now })?;
                let owner = self.owner(tenant.id).await?;
                self.notify(
                    &owner.email,
                    EmailTemplate::InactivityFinalNotice {
                        owner_name: owner.name.clone(),
                        shop_name: tenant.name.clone(),
                        days_remaining,
                    },
                )
                .await?;
                self.store.save_lifecycle(tenant.id, &next).await?;
                info!(tenant_id = %tenant.id, days_inactive = days, days_remaining, "final notice sent");
                Ok(Outcome::SecondWarningSent)
            }
            LifecycleAction::SendFirstWarning => {
                let next = tenant
                    .lifecycle
                    .apply(LifecycleTransition::FirstWarningSent { at: now })?;
                let owner = self.owner(tenant.id).await?;
                self.notify(
                    &owner.email,
                    EmailTemplate::InactivityWarning {
                        owner_name: owner.name.clone(),
                        shop_name: tenant.name.clone(),
                        days_inactive: days,
                    },
                )
                .await?;
                self.store.save_lifecycle(tenant.id, &next).await?;
                info!(tenant_id = %tenant.id, days_inactive = days, "first inactivity warning sent");
                Ok(Outcome::FirstWarningSent)
            }
        }
    }

    async fn owner(&self, tenant_id: TenantId) -> Result<OwnerContact, TenantScanError> {
        self.store
            .find_owner(tenant_id)
            .await?
            .ok_or(TenantScanError::NoOwner)
    }

    async fn notify(&self, to: &str, template: EmailTemplate) -> Result<(), TenantScanError> {
        let result = self.notifications.send_template(to, &template).await;
        if result.success {
            Ok(())
        } else {
            Err(TenantScanError::NotSent {
                to: to.to_string(),
                reason: result.error.unwrap_or_else(|| "unknown".to_string()),
            })
        }
    }
}
