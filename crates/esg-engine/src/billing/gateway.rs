use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::domain::{BillingCycle, ExternalSubscriptionId, PaymentSignal, PlanCode};
use crate::assessment::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingMethod {
    CreditCard,
    Pix,
    Boleto,
    #[default]
    Undefined,
}

/// Recurring charge requested from the payment provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutRequest {
    pub user_id: UserId,
    pub plan_code: PlanCode,
    pub amount: Decimal,
    pub cycle: BillingCycle,
    pub method: BillingMethod,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewaySubscription {
    pub external_id: ExternalSubscriptionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_url: Option<String>,
}

/// Payment status as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProviderPaymentStatus {
    Pending,
    Received,
    Confirmed,
    Overdue,
    Refunded,
    Deleted,
    #[serde(other)]
    Unknown,
}

impl ProviderPaymentStatus {
    pub fn signal(self) -> Option<PaymentSignal> {
        match self {
            Self::Received | Self::Confirmed => Some(PaymentSignal::Confirmed),
            Self::Overdue => Some(PaymentSignal::Overdue),
            Self::Refunded | Self::Deleted => Some(PaymentSignal::Revoked),
            Self::Pending | Self::Unknown => None,
        }
    }
}

/// Failure talking to the payment provider. Provider text is kept for the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("payment provider rejected the request: {0}")]
    Rejected(String),
    #[error("payment provider unavailable: {0}")]
    Unavailable(String),
}

/// Outbound payment-provider client.
pub trait PaymentGateway: Send + Sync {
    fn create_subscription(
        &self,
        request: &CheckoutRequest,
    ) -> Result<GatewaySubscription, GatewayError>;
    fn cancel_subscription(&self, external_id: &ExternalSubscriptionId)
        -> Result<(), GatewayError>;
    /// Status of the most recent payment of the subscription.
    fn payment_status(
        &self,
        external_id: &ExternalSubscriptionId,
    ) -> Result<ProviderPaymentStatus, GatewayError>;
}
