use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{LifecycleState, TenantId, UserId};

/// Billing plan of a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Free,
    Standard,
    Premium,
}

/// A shop as seen by the background jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    /// `None` when the tenant has no subscription record; treated as free.
    pub plan: Option<PlanTier>,
    #[serde(default)]
    pub lifecycle: LifecycleState,
}

impl Tenant {
    pub fn new(id: TenantId, name: impl Into<String>, plan: Option<PlanTier>) -> Self {
        Self {
            id,
            name: name.into(),
            plan,
            lifecycle: LifecycleState::Active,
        }
    }

    pub fn effective_plan(&self) -> PlanTier {
        self.plan.unwrap_or(PlanTier::Free)
    }

    pub fn is_premium(&self) -> bool {
        self.effective_plan() == PlanTier::Premium
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Owner,
    Admin,
    Staff,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub user_id: UserId,
    pub tenant_id: TenantId,
    pub name: String,
    pub email: String,
    pub role: MemberRole,
}

/// Where lifecycle notices for a tenant go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerContact {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
}

impl From<&Member> for OwnerContact {
    fn from(member: &Member) -> Self {
        Self {
            user_id: member.user_id,
            name: member.name.clone(),
            email: member.email.clone(),
        }
    }
}

/// A login session of a member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: UserId,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}
