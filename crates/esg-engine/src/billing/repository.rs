use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::domain::{
    ExternalSubscriptionId, SubscriptionId, SubscriptionPlan, SubscriptionStatus, UserSubscription,
};
use crate::assessment::UserId;
use crate::store::RepositoryError;

/// Outcome of a conditional consultation-hour increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum HoursDebit {
    Applied { total_used: Decimal },
    /// The increment would pass the cap; nothing was written.
    Exceeded { used: Decimal },
    /// The subscription stopped being active before the debit landed.
    Inactive,
}

/// Outcome of a conditional plan switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanChange {
    Applied(UserSubscription),
    /// Hours already used exceed what the new plan grants; nothing was written.
    HoursExceeded { used: Decimal },
}

/// Storage abstraction for user subscriptions.
///
/// Status writes are compare-and-set so reconciler deliveries, user actions and
/// provider syncs can race without losing each other's updates.
pub trait SubscriptionRepository: Send + Sync {
    fn insert(&self, subscription: UserSubscription) -> Result<UserSubscription, RepositoryError>;
    fn fetch(&self, id: SubscriptionId) -> Result<Option<UserSubscription>, RepositoryError>;
    /// Newest first.
    fn for_user(&self, user: &UserId) -> Result<Vec<UserSubscription>, RepositoryError>;
    fn by_external_id(
        &self,
        external_id: &ExternalSubscriptionId,
    ) -> Result<Option<UserSubscription>, RepositoryError>;
    /// Moves `id` from `from` to `to`; [`RepositoryError::Stale`] when the stored status differs.
    fn transition(
        &self,
        id: SubscriptionId,
        from: SubscriptionStatus,
        to: SubscriptionStatus,
        at: DateTime<Utc>,
    ) -> Result<UserSubscription, RepositoryError>;
    /// Switches the plan and marks the subscription active, provided it is still in `from`
    /// and its used hours fit within the new plan's allowance.
    fn change_plan(
        &self,
        id: SubscriptionId,
        from: SubscriptionStatus,
        plan: &SubscriptionPlan,
        at: DateTime<Utc>,
    ) -> Result<PlanChange, RepositoryError>;
    /// Adds `hours` to the used total only if the result stays within `cap`.
    fn debit_hours(
        &self,
        id: SubscriptionId,
        hours: Decimal,
        cap: Decimal,
    ) -> Result<HoursDebit, RepositoryError>;
}
