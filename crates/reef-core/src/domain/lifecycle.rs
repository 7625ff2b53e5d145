//! Tenant inactivity lifecycle.
//!
//! ```text
//! Active --(>=60d)--> FirstWarned --(>=75d)--> SecondWarned --(>=90d)--> SoftDeleted
//! ```
//!
//! The state is persisted with the tenant and doubles as the idempotency
//! ledger: a warning is sent at most once because the state records that it
//! was sent, and a soft delete happens at most once because `SoftDeleted` is
//! terminal. Every timestamp that was ever set is carried forward so the
//! record explains itself after the fact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const FIRST_WARNING_AFTER_DAYS: i64 = 60;
pub const SECOND_WARNING_AFTER_DAYS: i64 = 75;
pub const SOFT_DELETE_AFTER_DAYS: i64 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoftDeleteReason {
    Inactivity,
}

impl SoftDeleteReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SoftDeleteReason::Inactivity => "inactivity",
        }
    }
}

/// Persisted lifecycle state of a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum LifecycleState {
    #[default]
    Active,

    FirstWarned {
        first_warning_sent_at: DateTime<Utc>,
    },

    /// The first warning can be missing when the scanner did not run while
    /// the tenant was inside the 60..75 day window.
    SecondWarned {
        first_warning_sent_at: Option<DateTime<Utc>>,
        second_warning_sent_at: DateTime<Utc>,
    },

    SoftDeleted {
        first_warning_sent_at: Option<DateTime<Utc>>,
        second_warning_sent_at: Option<DateTime<Utc>>,
        soft_deleted_at: DateTime<Utc>,
        reason: SoftDeleteReason,
    },
}

/// Something that happened to a tenant which moves its lifecycle forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleTransition {
    FirstWarningSent { at: DateTime<Utc> },
    SecondWarningSent { at: DateTime<Utc> },
    SoftDeleted { at: DateTime<Utc>, reason: SoftDeleteReason },
}

impl LifecycleTransition {
    fn name(&self) -> &'static str {
        match self {
            LifecycleTransition::FirstWarningSent { .. } => "first_warning_sent",
            LifecycleTransition::SecondWarningSent { .. } => "second_warning_sent",
            LifecycleTransition::SoftDeleted { .. } => "soft_deleted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("lifecycle transition {transition} is not allowed from state {from}")]
pub struct LifecycleError {
    pub from: &'static str,
    pub transition: &'static str,
}

impl LifecycleState {
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleState::Active => "active",
            LifecycleState::FirstWarned { .. } => "first_warned",
            LifecycleState::SecondWarned { .. } => "second_warned",
            LifecycleState::SoftDeleted { .. } => "soft_deleted",
        }
    }

    pub fn first_warning_sent_at(&self) -> Option<DateTime<Utc>> {
        match *self {
            LifecycleState::Active => None,
            LifecycleState::FirstWarned {
                first_warning_sent_at,
            } => Some(first_warning_sent_at),
            LifecycleState::SecondWarned {
                first_warning_sent_at,
                ..
            }
            | LifecycleState::SoftDeleted {
                first_warning_sent_at,
                ..
            } => first_warning_sent_at,
        }
    }

    pub fn second_warning_sent_at(&self) -> Option<DateTime<Utc>> {
        match *self {
            LifecycleState::Active | LifecycleState::FirstWarned { .. } => None,
            LifecycleState::SecondWarned {
                second_warning_sent_at,
                ..
            } => Some(second_warning_sent_at),
            LifecycleState::SoftDeleted {
                second_warning_sent_at,
                ..
            } => second_warning_sent_at,
        }
    }

    pub fn soft_deleted_at(&self) -> Option<DateTime<Utc>> {
        match *self {
            LifecycleState::SoftDeleted {
                soft_deleted_at, ..
            } => Some(soft_deleted_at),
            _ => None,
        }
    }

    pub fn is_soft_deleted(&self) -> bool {
        matches!(self, LifecycleState::SoftDeleted { .. })
    }

    /// Apply a transition, refusing anything that would move backwards or
    /// repeat a side effect that already happened.
    pub fn apply(self, transition: LifecycleTransition) -> Result<LifecycleState, LifecycleError> {
        let refused = LifecycleError {
            from: self.name(),
            transition: transition.name(),
        };

        match (self, transition) {
            (LifecycleState::Active, LifecycleTransition::FirstWarningSent { at }) => {
                Ok(LifecycleState::FirstWarned {
                    first_warning_sent_at: at,
                })
            }
            (
                LifecycleState::Active | LifecycleState::FirstWarned { .. },
                LifecycleTransition::SecondWarningSent { at },
            ) => Ok(LifecycleState::SecondWarned {
                first_warning_sent_at: self.first_warning_sent_at(),
                second_warning_sent_at: at,
            }),
            (LifecycleState::SoftDeleted { .. }, _) => Err(refused),
            (_, LifecycleTransition::SoftDeleted { at, reason }) => {
                Ok(LifecycleState::SoftDeleted {
                    first_warning_sent_at: self.first_warning_sent_at(),
                    second_warning_sent_at: self.second_warning_sent_at(),
                    soft_deleted_at: at,
                    reason,
                })
            }
            _ => Err(refused),
        }
    }
}

/// What the scanner should do with a tenant on this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    Nothing,
    SendFirstWarning,
    SendFinalNotice { days_remaining: i64 },
    SoftDelete,
}

/// Whole days since the last activity. Activity in the future counts as now.
pub fn days_since_activity(now: DateTime<Utc>, last_activity_at: DateTime<Utc>) -> i64 {
    (now - last_activity_at).num_days().max(0)
}

/// Pick the action for a tenant.
///
/// Thresholds are checked from the most severe down, so a tenant that was
/// not scanned for a while lands in the right bucket instead of receiving a
/// stale earlier-stage warning.
pub fn decide(state: &LifecycleState, days_since_activity: i64) -> LifecycleAction {
    if state.is_soft_deleted() {
        return LifecycleAction::Nothing;
    }

    if days_since_activity >= SOFT_DELETE_AFTER_DAYS {
        LifecycleAction::SoftDelete
    } else if days_since_activity >= SECOND_WARNING_AFTER_DAYS {
        if state.second_warning_sent_at().is_none() {
            LifecycleAction::SendFinalNotice {
                days_remaining: SOFT_DELETE_AFTER_DAYS - days_since_activity,
            }
        } else {
            LifecycleAction::Nothing
        }
    } else if days_since_activity >= FIRST_WARNING_AFTER_DAYS {
        // only from Active; a second warning never gets followed by a first
        if matches!(state, LifecycleState::Active) {
            LifecycleAction::SendFirstWarning
        } else {
            LifecycleAction::Nothing
        }
    } else {
        LifecycleAction::Nothing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rstest::rstest;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()
    }

    fn first_warned() -> LifecycleState {
        LifecycleState::FirstWarned {
            first_warning_sent_at: t0(),
        }
    }

    fn second_warned() -> LifecycleState {
        LifecycleState::SecondWarned {
            first_warning_sent_at: Some(t0()),
            second_warning_sent_at: t0(),
        }
    }

    #[rstest]
    #[case(LifecycleState::Active, 0, LifecycleAction::Nothing)]
    #[case(LifecycleState::Active, 59, LifecycleAction::Nothing)]
    #[case(LifecycleState::Active, 60, LifecycleAction::SendFirstWarning)]
    #[case(LifecycleState::Active, 74, LifecycleAction::SendFirstWarning)]
    #[case(first_warned(), 70, LifecycleAction::Nothing)]
    #[case(first_warned(), 75, LifecycleAction::SendFinalNotice { days_remaining: 15 })]
    #[case(LifecycleState::Active, 80, LifecycleAction::SendFinalNotice { days_remaining: 10 })]
    #[case(second_warned(), 89, LifecycleAction::Nothing)]
    #[case(second_warned(), 62, LifecycleAction::Nothing)]
    #[case(second_warned(), 90, LifecycleAction::SoftDelete)]
    #[case(LifecycleState::Active, 400, LifecycleAction::SoftDelete)]
    fn decide_picks_most_severe_bucket(
        #[case] state: LifecycleState,
        #[case] days: i64,
        #[case] expected: LifecycleAction,
    ) {
        assert_eq!(decide(&state, days), expected);
    }

    #[test]
    fn soft_deleted_is_terminal() {
        let deleted = LifecycleState::Active
            .apply(LifecycleTransition::SoftDeleted {
                at: t0(),
                reason: SoftDeleteReason::Inactivity,
            })
            .unwrap();

        assert_eq!(decide(&deleted, 1000), LifecycleAction::Nothing);
        let again = deleted.apply(LifecycleTransition::SoftDeleted {
            at: t0(),
            reason: SoftDeleteReason::Inactivity,
        });
        assert!(again.is_err());
    }

    #[test]
    fn warnings_cannot_repeat_or_go_backwards() {
        assert!(
            first_warned()
                .apply(LifecycleTransition::FirstWarningSent { at: t0() })
                .is_err()
        );
        assert!(
            second_warned()
                .apply(LifecycleTransition::SecondWarningSent { at: t0() })
                .is_err()
        );
        let err = second_warned()
            .apply(LifecycleTransition::FirstWarningSent { at: t0() })
            .unwrap_err();
        assert_eq!(err.from, "second_warned");
        assert_eq!(err.transition, "first_warning_sent");
    }

    #[test]
    fn audit_trail_is_carried_forward() {
        let first_at = t0();
        let second_at = t0() + Duration::days(15);
        let deleted_at = t0() + Duration::days(30);

        let state = LifecycleState::Active
            .apply(LifecycleTransition::FirstWarningSent { at: first_at })
            .and_then(|s| s.apply(LifecycleTransition::SecondWarningSent { at: second_at }))
            .and_then(|s| {
                s.apply(LifecycleTransition::SoftDeleted {
                    at: deleted_at,
                    reason: SoftDeleteReason::Inactivity,
                })
            })
            .unwrap();

        assert_eq!(state.first_warning_sent_at(), Some(first_at));
        assert_eq!(state.second_warning_sent_at(), Some(second_at));
        assert_eq!(state.soft_deleted_at(), Some(deleted_at));
    }

    #[test]
    fn persisted_shape_is_tagged() {
        let json = serde_json::to_value(first_warned()).unwrap();
        assert_eq!(json["state"], "first_warned");
        assert!(json.get("firstWarningSentAt").is_some());

        let active: LifecycleState = serde_json::from_value(serde_json::json!({"state": "active"})).unwrap();
        assert_eq!(active, LifecycleState::Active);
    }

    #[test]
    fn days_are_floored_and_never_negative() {
        let now = t0();
        assert_eq!(days_since_activity(now, now - Duration::hours(60 * 24 - 1)), 59);
        assert_eq!(days_since_activity(now, now - Duration::days(60)), 60);
        assert_eq!(days_since_activity(now, now + Duration::days(2)), 0);
    }
}
