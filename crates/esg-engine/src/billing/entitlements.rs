use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use super::domain::{PlanCode, SubscriptionPlan, UserSubscription};
use super::plans::PlanCatalog;
use super::repository::{HoursDebit, SubscriptionRepository};
use crate::assessment::{
    AssessmentRepository, DiagnosisAllowance, DiagnosisQuota, DiagnosisStatus, QuotaError, UserId,
};
use crate::consultation::{HoursLedger, LedgerError};
use crate::error::ErrorKind;
use crate::store::RepositoryError;

/// Diagnoses that count against a plan's cap.
const COUNTED_STATUSES: [DiagnosisStatus; 2] =
    [DiagnosisStatus::InProgress, DiagnosisStatus::Completed];

/// The plan currently governing a user. `subscription` is `None` for the free fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivePlan {
    pub plan: SubscriptionPlan,
    pub subscription: Option<UserSubscription>,
    pub consultation_hours_used: Decimal,
    pub consultation_hours_remaining: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HoursBalance {
    pub total: Decimal,
    pub used: Decimal,
    pub remaining: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HoursUsage {
    pub hours_used: Decimal,
    pub total_used: Decimal,
    pub remaining: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiagnosisUsage {
    pub current: usize,
    pub limit: Option<u32>,
    pub unlimited: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UsageBreakdown {
    pub diagnoses: DiagnosisUsage,
    pub consultation_hours: HoursBalance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageStats {
    pub plan: SubscriptionPlan,
    pub subscription: Option<UserSubscription>,
    pub usage: UsageBreakdown,
}

/// Answers "what may this user do right now" from subscriptions and plan caps.
pub struct EntitlementService<S, A> {
    subscriptions: Arc<S>,
    diagnoses: Arc<A>,
    plans: Arc<PlanCatalog>,
    free_plan: PlanCode,
}

impl<S, A> EntitlementService<S, A>
where
    S: SubscriptionRepository + 'static,
    A: AssessmentRepository + 'static,
{
    pub fn new(
        subscriptions: Arc<S>,
        diagnoses: Arc<A>,
        plans: Arc<PlanCatalog>,
        free_plan: PlanCode,
    ) -> Self {
        Self {
            subscriptions,
            diagnoses,
            plans,
            free_plan,
        }
    }

    pub fn plans(&self) -> &PlanCatalog {
        &self.plans
    }

    pub fn active_plan(&self, user: &UserId) -> Result<ActivePlan, EntitlementError> {
        self.active_plan_at(user, Utc::now())
    }

    pub(crate) fn active_plan_at(
        &self,
        user: &UserId,
        now: DateTime<Utc>,
    ) -> Result<ActivePlan, EntitlementError> {
        let current = self
            .subscriptions
            .for_user(user)?
            .into_iter()
            .find(|subscription| subscription.is_entitling(now));

        match current {
            Some(subscription) => {
                let plan = self
                    .plans
                    .get(&subscription.plan_code)
                    .cloned()
                    .ok_or_else(|| EntitlementError::UnknownPlan(subscription.plan_code.clone()))?;
                let used = subscription.consultation_hours_used;
                Ok(ActivePlan {
                    consultation_hours_remaining: plan.consultation_hours - used,
                    consultation_hours_used: used,
                    subscription: Some(subscription),
                    plan,
                })
            }
            None => {
                let plan = self
                    .plans
                    .get(&self.free_plan)
                    .cloned()
                    .ok_or_else(|| EntitlementError::FreePlanMissing(self.free_plan.clone()))?;
                Ok(ActivePlan {
                    consultation_hours_remaining: plan.consultation_hours,
                    consultation_hours_used: Decimal::ZERO,
                    subscription: None,
                    plan,
                })
            }
        }
    }

    pub fn can_create_diagnosis(
        &self,
        user: &UserId,
    ) -> Result<DiagnosisAllowance, EntitlementError> {
        let active = self.active_plan(user)?;
        let current_count = self.diagnoses.count_for_user(user, &COUNTED_STATUSES)?;
        let plan_code = active.plan.code.0;

        Ok(match active.plan.max_diagnoses {
            None => DiagnosisAllowance::unlimited(current_count, plan_code),
            Some(limit) => DiagnosisAllowance {
                allowed: current_count < limit as usize,
                current_count,
                limit: Some(limit),
                plan_code,
            },
        })
    }

    pub fn remaining_hours(&self, user: &UserId) -> Result<HoursBalance, EntitlementError> {
        let active = self.active_plan(user)?;
        Ok(HoursBalance {
            total: active.plan.consultation_hours,
            used: active.consultation_hours_used,
            remaining: active.consultation_hours_remaining,
        })
    }

    /// Charges consultation hours against the active subscription, never past the plan cap.
    pub fn track_hours(
        &self,
        user: &UserId,
        hours: Decimal,
    ) -> Result<HoursUsage, EntitlementError> {
        if hours <= Decimal::ZERO {
            return Err(EntitlementError::InvalidHours(hours));
        }

        let active = self.active_plan(user)?;
        let Some(subscription) = &active.subscription else {
            return Err(EntitlementError::NoActiveSubscription);
        };
        let cap = active.plan.consultation_hours;

        match self.subscriptions.debit_hours(subscription.id, hours, cap)? {
            HoursDebit::Applied { total_used } => {
                info!(
                    subscription_id = %subscription.id,
                    hours = %hours,
                    total_used = %total_used,
                    "consultation hours tracked"
                );
                Ok(HoursUsage {
                    hours_used: hours,
                    total_used,
                    remaining: cap - total_used,
                })
            }
            HoursDebit::Exceeded { used } => {
                warn!(
                    subscription_id = %subscription.id,
                    requested = %hours,
                    used = %used,
                    "consultation hours exceeded"
                );
                Err(EntitlementError::InsufficientHours {
                    requested: hours,
                    remaining: cap - used,
                })
            }
            HoursDebit::Inactive => Err(EntitlementError::NoActiveSubscription),
        }
    }

    pub fn usage_stats(&self, user: &UserId) -> Result<UsageStats, EntitlementError> {
        let active = self.active_plan(user)?;
        let current = self.diagnoses.count_for_user(user, &COUNTED_STATUSES)?;

        Ok(UsageStats {
            usage: UsageBreakdown {
                diagnoses: DiagnosisUsage {
                    current,
                    limit: active.plan.max_diagnoses,
                    unlimited: active.plan.max_diagnoses.is_none(),
                },
                consultation_hours: HoursBalance {
                    total: active.plan.consultation_hours,
                    used: active.consultation_hours_used,
                    remaining: active.consultation_hours_remaining,
                },
            },
            plan: active.plan,
            subscription: active.subscription,
        })
    }
}

impl<S, A> DiagnosisQuota for EntitlementService<S, A>
where
    S: SubscriptionRepository + 'static,
    A: AssessmentRepository + 'static,
{
    fn check(&self, user: &UserId) -> Result<DiagnosisAllowance, QuotaError> {
        self.can_create_diagnosis(user)
            .map_err(|error| QuotaError(error.to_string()))
    }
}

impl<S, A> HoursLedger for EntitlementService<S, A>
where
    S: SubscriptionRepository + 'static,
    A: AssessmentRepository + 'static,
{
    fn remaining(&self, user: &UserId) -> Result<Decimal, LedgerError> {
        self.remaining_hours(user)
            .map(|balance| balance.remaining)
            .map_err(LedgerError::from)
    }

    fn debit(&self, user: &UserId, hours: Decimal) -> Result<Decimal, LedgerError> {
        self.track_hours(user, hours)
            .map(|usage| usage.remaining)
            .map_err(LedgerError::from)
    }
}

impl From<EntitlementError> for LedgerError {
    fn from(error: EntitlementError) -> Self {
        match error {
            EntitlementError::InsufficientHours {
                requested,
                remaining,
            } => Self::Insufficient {
                requested,
                remaining,
            },
            EntitlementError::NoActiveSubscription => Self::NoSubscription,
            other => Self::Unavailable(other.to_string()),
        }
    }
}

/// Error raised while resolving or consuming entitlements.
#[derive(Debug, thiserror::Error)]
pub enum EntitlementError {
    #[error("fallback plan '{0}' is not configured")]
    FreePlanMissing(PlanCode),
    #[error("plan '{0}' not found")]
    UnknownPlan(PlanCode),
    #[error("no active subscription with consultation hours")]
    NoActiveSubscription,
    #[error("insufficient consultation hours: requested {requested}, remaining {remaining}")]
    InsufficientHours {
        requested: Decimal,
        remaining: Decimal,
    },
    #[error("hours must be positive, got {0}")]
    InvalidHours(Decimal),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl EntitlementError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoActiveSubscription => ErrorKind::InvalidState,
            Self::InsufficientHours { .. } => ErrorKind::CapacityExceeded,
            Self::InvalidHours(_) => ErrorKind::Validation,
            Self::Repository(RepositoryError::NotFound) => ErrorKind::NotFound,
            Self::Repository(
                RepositoryError::Stale
                | RepositoryError::Conflict
                | RepositoryError::Locked
                | RepositoryError::InvalidTransition,
            ) => ErrorKind::InvalidState,
            Self::FreePlanMissing(_)
            | Self::UnknownPlan(_)
            | Self::Repository(RepositoryError::Unavailable(_)) => ErrorKind::Internal,
        }
    }
}
