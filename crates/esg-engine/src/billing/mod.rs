//! Plans, subscriptions and the entitlements derived from them, plus the
//! payment-provider seam and the webhook reconciler that keeps both sides aligned.

pub mod domain;
pub mod entitlements;
pub mod gateway;
pub mod plans;
pub mod reconciler;
pub mod repository;
pub mod router;
pub mod subscriptions;

#[cfg(test)]
mod tests;

pub use domain::{
    BillingCycle, ExternalSubscriptionId, PaymentSignal, PlanCode, PlanFeatures, SubscriptionId,
    SubscriptionPlan, SubscriptionStatus, UserSubscription,
};
pub use entitlements::{
    ActivePlan, EntitlementError, EntitlementService, HoursBalance, HoursUsage, UsageStats,
};
pub use gateway::{
    BillingMethod, CheckoutRequest, GatewayError, GatewaySubscription, PaymentGateway,
    ProviderPaymentStatus,
};
pub use plans::{standard_plans, PlanCatalog};
pub use reconciler::{
    Acknowledgement, PaymentEvent, PaymentEventKind, PaymentEventReconciler, PaymentRecord,
    ReconcileOutcome,
};
pub use repository::{HoursDebit, PlanChange, SubscriptionRepository};
pub use router::{billing_router, BillingState, WEBHOOK_TOKEN_HEADER};
pub use subscriptions::{Checkout, SubscriptionError, SubscriptionService, SyncReport};
