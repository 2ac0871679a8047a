use std::fmt;

use chrono::{DateTime, Duration, Months, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::assessment::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanCode(pub String);

impl PlanCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlanCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingCycle {
    Monthly,
    Yearly,
    Free,
}

impl BillingCycle {
    /// End of the first billing period; free plans never expire.
    pub fn expiry_from(self, start: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Monthly => start.checked_add_months(Months::new(1)),
            Self::Yearly => start.checked_add_months(Months::new(12)),
            Self::Free => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlanFeatures {
    pub certification: bool,
    pub report_export: bool,
    pub priority_support: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionPlan {
    pub code: PlanCode,
    pub name: String,
    pub price: Decimal,
    pub billing_cycle: BillingCycle,
    pub consultation_hours: Decimal,
    /// `None` means unlimited diagnoses.
    pub max_diagnoses: Option<u32>,
    pub features: PlanFeatures,
    pub active: bool,
}

impl SubscriptionPlan {
    pub fn is_paid(&self) -> bool {
        self.price > Decimal::ZERO
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(pub Uuid);

impl SubscriptionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Subscription identifier assigned by the payment provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalSubscriptionId(pub String);

impl fmt::Display for ExternalSubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    PendingPayment,
    Active,
    Overdue,
    Cancelled,
    Trial,
}

/// Payment outcome as far as local subscription state is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentSignal {
    Confirmed,
    Overdue,
    Revoked,
}

impl SubscriptionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::PendingPayment => "pending_payment",
            Self::Active => "active",
            Self::Overdue => "overdue",
            Self::Cancelled => "cancelled",
            Self::Trial => "trial",
        }
    }

    /// Next status after a payment signal, or `None` when the signal changes nothing.
    /// Applying the same signal twice is a no-op the second time.
    pub fn after_payment(self, signal: PaymentSignal) -> Option<Self> {
        match (signal, self) {
            (PaymentSignal::Confirmed, Self::PendingPayment) => Some(Self::Active),
            (PaymentSignal::Confirmed, _) => None,
            // Cancellation is final; a late overdue notice must not reopen dunning.
            (PaymentSignal::Overdue, Self::Overdue | Self::Cancelled) => None,
            (PaymentSignal::Overdue, _) => Some(Self::Overdue),
            // A newer confirmation may already have reactivated the subscription.
            (PaymentSignal::Revoked, Self::Active | Self::Cancelled) => None,
            (PaymentSignal::Revoked, _) => Some(Self::Cancelled),
        }
    }

    /// Statuses a user can cancel or change plan from.
    pub const fn is_manageable(self) -> bool {
        matches!(self, Self::Active | Self::Trial)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSubscription {
    pub id: SubscriptionId,
    pub user_id: UserId,
    pub plan_code: PlanCode,
    pub status: SubscriptionStatus,
    pub started_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub consultation_hours_used: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<ExternalSubscriptionId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserSubscription {
    pub fn new(
        user_id: UserId,
        plan: &SubscriptionPlan,
        status: SubscriptionStatus,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: SubscriptionId::generate(),
            user_id,
            plan_code: plan.code.clone(),
            status,
            started_at: now,
            expires_at: plan.billing_cycle.expiry_from(now),
            trial_ends_at: None,
            consultation_hours_used: Decimal::ZERO,
            external_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_trial(mut self, days: u32, now: DateTime<Utc>) -> Self {
        self.trial_ends_at = Some(now + Duration::days(i64::from(days)));
        self
    }

    /// Active and not past its expiry.
    pub fn is_entitling(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Active
            && self.expires_at.map_or(true, |expiry| expiry > now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn confirmation_only_activates_pending_subscriptions() {
        use SubscriptionStatus::*;
        assert_eq!(
            PendingPayment.after_payment(PaymentSignal::Confirmed),
            Some(Active)
        );
        assert_eq!(Active.after_payment(PaymentSignal::Confirmed), None);
        assert_eq!(Overdue.after_payment(PaymentSignal::Confirmed), None);
        assert_eq!(Cancelled.after_payment(PaymentSignal::Confirmed), None);
    }

    #[test]
    fn overdue_applies_even_to_active_subscriptions() {
        use SubscriptionStatus::*;
        assert_eq!(Active.after_payment(PaymentSignal::Overdue), Some(Overdue));
        assert_eq!(Overdue.after_payment(PaymentSignal::Overdue), None);
        assert_eq!(Trial.after_payment(PaymentSignal::Overdue), Some(Overdue));
        assert_eq!(Cancelled.after_payment(PaymentSignal::Overdue), None);
    }

    #[test]
    fn revocation_never_cancels_an_active_subscription() {
        use SubscriptionStatus::*;
        assert_eq!(Active.after_payment(PaymentSignal::Revoked), None);
        assert_eq!(
            PendingPayment.after_payment(PaymentSignal::Revoked),
            Some(Cancelled)
        );
        assert_eq!(Overdue.after_payment(PaymentSignal::Revoked), Some(Cancelled));
        assert_eq!(Cancelled.after_payment(PaymentSignal::Revoked), None);
    }

    #[test]
    fn monthly_expiry_clamps_to_month_end() {
        let start = Utc.with_ymd_and_hms(2025, 1, 31, 12, 0, 0).single().expect("date");
        let expiry = BillingCycle::Monthly.expiry_from(start).expect("expiry");
        assert_eq!(
            expiry,
            Utc.with_ymd_and_hms(2025, 2, 28, 12, 0, 0).single().expect("date")
        );
        assert!(BillingCycle::Free.expiry_from(start).is_none());
    }
}
