use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{error, info, warn};

use super::domain::{PlanCode, SubscriptionPlan, SubscriptionStatus, UserSubscription};
use super::gateway::{
    BillingMethod, CheckoutRequest, GatewayError, PaymentGateway, ProviderPaymentStatus,
};
use super::plans::PlanCatalog;
use super::reconciler::{apply_signal, ReconcileOutcome};
use super::repository::{PlanChange, SubscriptionRepository};
use crate::assessment::UserId;
use crate::error::ErrorKind;
use crate::store::RepositoryError;

const MAX_WRITE_ATTEMPTS: usize = 3;
const MAX_TRIAL_DAYS: u32 = 90;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Checkout {
    pub subscription: UserSubscription,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub subscription: UserSubscription,
    pub provider_status: ProviderPaymentStatus,
    pub changed: bool,
}

/// Plan purchase and lifecycle management. Provider calls happen before local writes.
pub struct SubscriptionService<S> {
    subscriptions: Arc<S>,
    plans: Arc<PlanCatalog>,
    gateway: Arc<dyn PaymentGateway>,
}

impl<S> SubscriptionService<S>
where
    S: SubscriptionRepository + 'static,
{
    pub fn new(
        subscriptions: Arc<S>,
        plans: Arc<PlanCatalog>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            subscriptions,
            plans,
            gateway,
        }
    }

    pub fn available_plans(&self) -> Vec<SubscriptionPlan> {
        self.plans.available()
    }

    pub fn plan(&self, code: &PlanCode) -> Result<SubscriptionPlan, SubscriptionError> {
        self.plans
            .get(code)
            .cloned()
            .ok_or_else(|| SubscriptionError::PlanNotFound(code.clone()))
    }

    pub fn subscribe(
        &self,
        user: &UserId,
        code: &PlanCode,
        method: BillingMethod,
    ) -> Result<Checkout, SubscriptionError> {
        let plan = self.purchasable(code)?;
        if !plan.is_paid() {
            return Err(SubscriptionError::PlanNotPurchasable(code.clone()));
        }
        let now = Utc::now();
        self.ensure_no_active(user, now)?;

        let created = self.gateway.create_subscription(&CheckoutRequest {
            user_id: user.clone(),
            plan_code: plan.code.clone(),
            amount: plan.price,
            cycle: plan.billing_cycle,
            method,
        })?;

        let mut record =
            UserSubscription::new(user.clone(), &plan, SubscriptionStatus::PendingPayment, now);
        record.external_id = Some(created.external_id.clone());

        match self.subscriptions.insert(record) {
            Ok(subscription) => {
                info!(
                    subscription_id = %subscription.id,
                    external_id = %created.external_id,
                    plan = %plan.code,
                    "subscription awaiting payment"
                );
                Ok(Checkout {
                    subscription,
                    checkout_url: created.checkout_url,
                })
            }
            Err(err) => {
                warn!(
                    external_id = %created.external_id,
                    error = %err,
                    "local write failed; cancelling provider subscription"
                );
                if let Err(compensation) = self.gateway.cancel_subscription(&created.external_id) {
                    error!(
                        external_id = %created.external_id,
                        error = %compensation,
                        "provider subscription left orphaned"
                    );
                }
                Err(err.into())
            }
        }
    }

    /// Local trial with no provider involvement.
    pub fn start_trial(
        &self,
        user: &UserId,
        code: &PlanCode,
        days: u32,
    ) -> Result<UserSubscription, SubscriptionError> {
        if days == 0 || days > MAX_TRIAL_DAYS {
            return Err(SubscriptionError::InvalidTrial(days));
        }
        let plan = self.purchasable(code)?;
        let now = Utc::now();
        self.ensure_no_active(user, now)?;

        let trial = UserSubscription::new(user.clone(), &plan, SubscriptionStatus::Trial, now)
            .with_trial(days, now);
        let stored = self.subscriptions.insert(trial)?;
        info!(subscription_id = %stored.id, plan = %plan.code, days, "trial started");
        Ok(stored)
    }

    pub fn cancel(&self, user: &UserId) -> Result<UserSubscription, SubscriptionError> {
        let mut current = self.manageable(user)?;
        if let Some(external_id) = &current.external_id {
            self.gateway.cancel_subscription(external_id)?;
        }

        for _ in 0..MAX_WRITE_ATTEMPTS {
            if current.status == SubscriptionStatus::Cancelled {
                return Ok(current);
            }
            match self.subscriptions.transition(
                current.id,
                current.status,
                SubscriptionStatus::Cancelled,
                Utc::now(),
            ) {
                Ok(cancelled) => {
                    info!(subscription_id = %cancelled.id, "subscription cancelled");
                    return Ok(cancelled);
                }
                Err(RepositoryError::Stale) => {
                    current = self
                        .subscriptions
                        .fetch(current.id)?
                        .ok_or(RepositoryError::NotFound)?;
                }
                Err(other) => return Err(other.into()),
            }
        }
        Err(SubscriptionError::Contention)
    }

    pub fn change_plan(
        &self,
        user: &UserId,
        code: &PlanCode,
    ) -> Result<UserSubscription, SubscriptionError> {
        let plan = self.purchasable(code)?;

        for _ in 0..MAX_WRITE_ATTEMPTS {
            let current = self.manageable(user)?;
            match self
                .subscriptions
                .change_plan(current.id, current.status, &plan, Utc::now())
            {
                Ok(PlanChange::Applied(updated)) => {
                    info!(
                        subscription_id = %updated.id,
                        from = %current.plan_code,
                        to = %plan.code,
                        "subscription plan changed"
                    );
                    return Ok(updated);
                }
                Ok(PlanChange::HoursExceeded { used }) => {
                    info!(
                        subscription_id = %current.id,
                        to = %plan.code,
                        used = %used,
                        "plan change refused; used hours exceed the new allowance"
                    );
                    return Err(SubscriptionError::HoursExceedPlan {
                        plan: plan.code.clone(),
                        used,
                        available: plan.consultation_hours,
                    });
                }
                Err(RepositoryError::Stale) => continue,
                Err(other) => return Err(other.into()),
            }
        }
        Err(SubscriptionError::Contention)
    }

    /// Pulls the latest payment status from the provider and applies it locally.
    pub fn sync_status(&self, user: &UserId) -> Result<SyncReport, SubscriptionError> {
        let (subscription, external_id) = self
            .subscriptions
            .for_user(user)?
            .into_iter()
            .find_map(|subscription| {
                let external_id = subscription.external_id.clone()?;
                Some((subscription, external_id))
            })
            .ok_or(SubscriptionError::NoProviderSubscription)?;

        let provider_status = self.gateway.payment_status(&external_id)?;
        let Some(signal) = provider_status.signal() else {
            return Ok(SyncReport {
                subscription,
                provider_status,
                changed: false,
            });
        };

        let outcome = apply_signal(self.subscriptions.as_ref(), subscription, signal, Utc::now())
            .map_err(|err| match err {
                RepositoryError::Stale => SubscriptionError::Contention,
                other => other.into(),
            })?;
        let (subscription, changed) = match outcome {
            ReconcileOutcome::Transitioned(updated) => (updated, true),
            ReconcileOutcome::Unchanged(current) => (current, false),
            ReconcileOutcome::Ignored | ReconcileOutcome::UnknownSubscription => {
                return Err(SubscriptionError::NoProviderSubscription)
            }
        };
        Ok(SyncReport {
            subscription,
            provider_status,
            changed,
        })
    }

    fn purchasable(&self, code: &PlanCode) -> Result<SubscriptionPlan, SubscriptionError> {
        let plan = self.plan(code)?;
        if !plan.active {
            return Err(SubscriptionError::PlanUnavailable(code.clone()));
        }
        Ok(plan)
    }

    fn ensure_no_active(&self, user: &UserId, now: DateTime<Utc>) -> Result<(), SubscriptionError> {
        let existing = self.subscriptions.for_user(user)?;
        if existing.iter().any(|subscription| subscription.is_entitling(now)) {
            return Err(SubscriptionError::AlreadySubscribed);
        }
        Ok(())
    }

    fn manageable(&self, user: &UserId) -> Result<UserSubscription, SubscriptionError> {
        self.subscriptions
            .for_user(user)?
            .into_iter()
            .find(|subscription| subscription.status.is_manageable())
            .ok_or(SubscriptionError::NoActiveSubscription)
    }
}

/// Error raised by subscription management.
#[derive(Debug, thiserror::Error)]
pub enum SubscriptionError {
    #[error("plan '{0}' not found")]
    PlanNotFound(PlanCode),
    #[error("plan '{0}' is not available")]
    PlanUnavailable(PlanCode),
    #[error("plan '{0}' cannot be purchased")]
    PlanNotPurchasable(PlanCode),
    #[error("user already has an active subscription")]
    AlreadySubscribed,
    #[error("active subscription not found")]
    NoActiveSubscription,
    #[error("no subscription is linked to the payment provider")]
    NoProviderSubscription,
    #[error("{used} consultation hours already used; plan '{plan}' only grants {available}")]
    HoursExceedPlan {
        plan: PlanCode,
        used: Decimal,
        available: Decimal,
    },
    #[error("trial length must be between 1 and {MAX_TRIAL_DAYS} days, got {0}")]
    InvalidTrial(u32),
    #[error("subscription kept changing; retry the request")]
    Contention,
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl SubscriptionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PlanNotFound(_) | Self::NoActiveSubscription | Self::NoProviderSubscription => {
                ErrorKind::NotFound
            }
            Self::PlanNotPurchasable(_) | Self::InvalidTrial(_) => ErrorKind::Validation,
            Self::PlanUnavailable(_) | Self::AlreadySubscribed | Self::Contention => {
                ErrorKind::InvalidState
            }
            Self::HoursExceedPlan { .. } => ErrorKind::CapacityExceeded,
            Self::Gateway(_) => ErrorKind::ExternalDependency,
            Self::Repository(RepositoryError::NotFound) => ErrorKind::NotFound,
            Self::Repository(RepositoryError::Unavailable(_)) => ErrorKind::Internal,
            Self::Repository(_) => ErrorKind::InvalidState,
        }
    }
}
