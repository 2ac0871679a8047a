use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::domain::{ExternalSubscriptionId, PaymentSignal, UserSubscription};
use super::repository::SubscriptionRepository;
use crate::store::RepositoryError;

/// Compare-and-set attempts before a status write is reported as contended.
const MAX_TRANSITION_ATTEMPTS: usize = 3;

/// Event names pushed by the payment provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentEventKind {
    PaymentCreated,
    PaymentConfirmed,
    PaymentReceived,
    PaymentOverdue,
    PaymentDeleted,
    PaymentRefunded,
    #[serde(other)]
    Unrecognized,
}

impl PaymentEventKind {
    pub fn signal(self) -> Option<PaymentSignal> {
        match self {
            Self::PaymentConfirmed | Self::PaymentReceived => Some(PaymentSignal::Confirmed),
            Self::PaymentOverdue => Some(PaymentSignal::Overdue),
            Self::PaymentDeleted | Self::PaymentRefunded => Some(PaymentSignal::Revoked),
            Self::PaymentCreated | Self::Unrecognized => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct PaymentRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub subscription: Option<ExternalSubscriptionId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaymentEvent {
    pub event: PaymentEventKind,
    #[serde(default)]
    pub payment: Option<PaymentRecord>,
}

/// Body returned to the provider. Always `received: true` so it stops redelivering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Acknowledgement {
    pub received: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Acknowledgement {
    pub fn received() -> Self {
        Self {
            received: true,
            error: None,
        }
    }

    fn failed() -> Self {
        Self {
            received: true,
            error: Some("internal processing error".to_string()),
        }
    }
}

/// What a reconciliation did to the local subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Ignored,
    UnknownSubscription,
    Unchanged(UserSubscription),
    Transitioned(UserSubscription),
}

/// Applies provider payment events to local subscriptions.
pub struct PaymentEventReconciler<S> {
    subscriptions: Arc<S>,
}

impl<S> PaymentEventReconciler<S>
where
    S: SubscriptionRepository + 'static,
{
    pub fn new(subscriptions: Arc<S>) -> Self {
        Self { subscriptions }
    }

    /// Handles one delivery. Faults are logged and folded into the acknowledgement.
    pub fn handle(&self, event: &PaymentEvent) -> Acknowledgement {
        match self.reconcile(event, Utc::now()) {
            Ok(_) => Acknowledgement::received(),
            Err(err) => {
                error!(event = ?event.event, error = %err, "payment event processing failed");
                Acknowledgement::failed()
            }
        }
    }

    pub fn reconcile(
        &self,
        event: &PaymentEvent,
        now: DateTime<Utc>,
    ) -> Result<ReconcileOutcome, RepositoryError> {
        let payment_id = event
            .payment
            .as_ref()
            .and_then(|payment| payment.id.as_deref())
            .unwrap_or("-");
        info!(event = ?event.event, payment_id, "payment event received");

        let Some(signal) = event.event.signal() else {
            debug!(event = ?event.event, payment_id, "payment event needs no action");
            return Ok(ReconcileOutcome::Ignored);
        };
        let Some(external_id) = event
            .payment
            .as_ref()
            .and_then(|payment| payment.subscription.as_ref())
        else {
            debug!(payment_id, "payment without subscription; skipping");
            return Ok(ReconcileOutcome::Ignored);
        };
        let Some(subscription) = self.subscriptions.by_external_id(external_id)? else {
            warn!(external_id = %external_id, "no local subscription for payment event");
            return Ok(ReconcileOutcome::UnknownSubscription);
        };

        apply_signal(self.subscriptions.as_ref(), subscription, signal, now)
    }
}

/// Moves a subscription along a payment signal, re-reading on concurrent writes.
pub(crate) fn apply_signal<S>(
    subscriptions: &S,
    mut subscription: UserSubscription,
    signal: PaymentSignal,
    now: DateTime<Utc>,
) -> Result<ReconcileOutcome, RepositoryError>
where
    S: SubscriptionRepository + ?Sized,
{
    for _ in 0..MAX_TRANSITION_ATTEMPTS {
        let Some(next) = subscription.status.after_payment(signal) else {
            return Ok(ReconcileOutcome::Unchanged(subscription));
        };

        match subscriptions.transition(subscription.id, subscription.status, next, now) {
            Ok(updated) => {
                info!(
                    subscription_id = %updated.id,
                    from = subscription.status.label(),
                    to = next.label(),
                    "subscription status reconciled"
                );
                return Ok(ReconcileOutcome::Transitioned(updated));
            }
            Err(RepositoryError::Stale) => {
                subscription = subscriptions
                    .fetch(subscription.id)?
                    .ok_or(RepositoryError::NotFound)?;
            }
            Err(other) => return Err(other),
        }
    }

    Err(RepositoryError::Stale)
}
