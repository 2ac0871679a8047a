use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Value};

use crate::assessment::UserId;
use crate::billing::{
    standard_plans, BillingState, CheckoutRequest, EntitlementService, ExternalSubscriptionId,
    GatewayError, GatewaySubscription, HoursDebit, PaymentEvent, PaymentEventReconciler,
    PaymentGateway, PlanCatalog, PlanChange, PlanCode, ProviderPaymentStatus, SubscriptionId,
    SubscriptionPlan, SubscriptionRepository, SubscriptionService, SubscriptionStatus,
    UserSubscription,
};
use crate::store::memory::{InMemoryAssessmentRepository, InMemorySubscriptionRepository};
use crate::store::RepositoryError;

pub(super) fn user(name: &str) -> UserId {
    UserId(name.to_string())
}

pub(super) fn plans() -> Arc<PlanCatalog> {
    Arc::new(standard_plans())
}

pub(super) fn plan(code: &str) -> SubscriptionPlan {
    standard_plans()
        .get(&PlanCode::new(code))
        .cloned()
        .expect("standard plan")
}

/// Payment provider fake that records every call.
pub(super) struct RecordingGateway {
    sequence: AtomicU64,
    status: Mutex<ProviderPaymentStatus>,
    fail_create: bool,
    pub(super) created: Mutex<Vec<CheckoutRequest>>,
    pub(super) cancelled: Mutex<Vec<ExternalSubscriptionId>>,
}

impl RecordingGateway {
    pub(super) fn new() -> Self {
        Self {
            sequence: AtomicU64::new(1),
            status: Mutex::new(ProviderPaymentStatus::Pending),
            fail_create: false,
            created: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn rejecting() -> Self {
        Self {
            fail_create: true,
            ..Self::new()
        }
    }

    pub(super) fn report(&self, status: ProviderPaymentStatus) {
        *self.status.lock().expect("gateway mutex poisoned") = status;
    }

    pub(super) fn cancelled(&self) -> Vec<ExternalSubscriptionId> {
        self.cancelled.lock().expect("gateway mutex poisoned").clone()
    }
}

impl PaymentGateway for RecordingGateway {
    fn create_subscription(
        &self,
        request: &CheckoutRequest,
    ) -> Result<GatewaySubscription, GatewayError> {
        if self.fail_create {
            return Err(GatewayError::Rejected("card declined".to_string()));
        }
        self.created
            .lock()
            .expect("gateway mutex poisoned")
            .push(request.clone());
        let id = self.sequence.fetch_add(1, Ordering::Relaxed);
        Ok(GatewaySubscription {
            external_id: ExternalSubscriptionId(format!("sub_{id:04}")),
            checkout_url: Some(format!("https://pay.example.test/checkout/{id}")),
        })
    }

    fn cancel_subscription(
        &self,
        external_id: &ExternalSubscriptionId,
    ) -> Result<(), GatewayError> {
        self.cancelled
            .lock()
            .expect("gateway mutex poisoned")
            .push(external_id.clone());
        Ok(())
    }

    fn payment_status(
        &self,
        _external_id: &ExternalSubscriptionId,
    ) -> Result<ProviderPaymentStatus, GatewayError> {
        Ok(*self.status.lock().expect("gateway mutex poisoned"))
    }
}

pub(super) struct Harness {
    pub(super) subscriptions: Arc<InMemorySubscriptionRepository>,
    pub(super) diagnoses: Arc<InMemoryAssessmentRepository>,
    pub(super) gateway: Arc<RecordingGateway>,
    pub(super) entitlements:
        Arc<EntitlementService<InMemorySubscriptionRepository, InMemoryAssessmentRepository>>,
    pub(super) service: Arc<SubscriptionService<InMemorySubscriptionRepository>>,
    pub(super) reconciler: Arc<PaymentEventReconciler<InMemorySubscriptionRepository>>,
}

impl Harness {
    pub(super) fn new() -> Self {
        Self::with_gateway(RecordingGateway::new())
    }

    pub(super) fn with_gateway(gateway: RecordingGateway) -> Self {
        let subscriptions = Arc::new(InMemorySubscriptionRepository::new());
        let diagnoses = Arc::new(InMemoryAssessmentRepository::new());
        let gateway = Arc::new(gateway);
        let plans = plans();
        Self {
            entitlements: Arc::new(EntitlementService::new(
                subscriptions.clone(),
                diagnoses.clone(),
                plans.clone(),
                PlanCode::new("free"),
            )),
            service: Arc::new(SubscriptionService::new(
                subscriptions.clone(),
                plans,
                gateway.clone(),
            )),
            reconciler: Arc::new(PaymentEventReconciler::new(subscriptions.clone())),
            subscriptions,
            diagnoses,
            gateway,
        }
    }

    /// Stores a subscription directly, bypassing the provider.
    pub(super) fn seed(
        &self,
        owner: &UserId,
        code: &str,
        status: SubscriptionStatus,
    ) -> UserSubscription {
        self.seed_at(owner, code, status, Utc::now())
    }

    pub(super) fn seed_at(
        &self,
        owner: &UserId,
        code: &str,
        status: SubscriptionStatus,
        at: DateTime<Utc>,
    ) -> UserSubscription {
        self.subscriptions
            .insert(UserSubscription::new(owner.clone(), &plan(code), status, at))
            .expect("seed subscription")
    }

    pub(super) fn seed_linked(
        &self,
        owner: &UserId,
        code: &str,
        status: SubscriptionStatus,
        external: &str,
    ) -> UserSubscription {
        let mut record = UserSubscription::new(owner.clone(), &plan(code), status, Utc::now());
        record.external_id = Some(ExternalSubscriptionId(external.to_string()));
        self.subscriptions.insert(record).expect("seed subscription")
    }

    pub(super) fn state(
        &self,
        webhook_token: Option<&str>,
    ) -> BillingState<InMemorySubscriptionRepository, InMemoryAssessmentRepository> {
        BillingState {
            entitlements: self.entitlements.clone(),
            subscriptions: self.service.clone(),
            reconciler: self.reconciler.clone(),
            webhook_token: webhook_token.map(str::to_string),
        }
    }
}

pub(super) fn payment_event(kind: &str, external: Option<&str>) -> PaymentEvent {
    serde_json::from_value(json!({
        "event": kind,
        "payment": { "id": "pay_001", "subscription": external },
    }))
    .expect("event decodes")
}

/// Delegates reads to the in-memory store but refuses every insert.
#[derive(Default)]
pub(super) struct ReadOnlySubscriptions {
    pub(super) inner: InMemorySubscriptionRepository,
}

impl SubscriptionRepository for ReadOnlySubscriptions {
    fn insert(&self, _subscription: UserSubscription) -> Result<UserSubscription, RepositoryError> {
        Err(RepositoryError::Unavailable("read only replica".to_string()))
    }

    fn fetch(&self, id: SubscriptionId) -> Result<Option<UserSubscription>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn for_user(&self, user: &UserId) -> Result<Vec<UserSubscription>, RepositoryError> {
        self.inner.for_user(user)
    }

    fn by_external_id(
        &self,
        external_id: &ExternalSubscriptionId,
    ) -> Result<Option<UserSubscription>, RepositoryError> {
        self.inner.by_external_id(external_id)
    }

    fn transition(
        &self,
        id: SubscriptionId,
        from: SubscriptionStatus,
        to: SubscriptionStatus,
        at: DateTime<Utc>,
    ) -> Result<UserSubscription, RepositoryError> {
        self.inner.transition(id, from, to, at)
    }

    fn change_plan(
        &self,
        id: SubscriptionId,
        from: SubscriptionStatus,
        plan: &SubscriptionPlan,
        at: DateTime<Utc>,
    ) -> Result<PlanChange, RepositoryError> {
        self.inner.change_plan(id, from, plan, at)
    }

    fn debit_hours(
        &self,
        id: SubscriptionId,
        hours: Decimal,
        cap: Decimal,
    ) -> Result<HoursDebit, RepositoryError> {
        self.inner.debit_hours(id, hours, cap)
    }
}

pub(super) struct UnavailableSubscriptions;

fn offline<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("database offline".to_string()))
}

impl SubscriptionRepository for UnavailableSubscriptions {
    fn insert(&self, _subscription: UserSubscription) -> Result<UserSubscription, RepositoryError> {
        offline()
    }

    fn fetch(&self, _id: SubscriptionId) -> Result<Option<UserSubscription>, RepositoryError> {
        offline()
    }

    fn for_user(&self, _user: &UserId) -> Result<Vec<UserSubscription>, RepositoryError> {
        offline()
    }

    fn by_external_id(
        &self,
        _external_id: &ExternalSubscriptionId,
    ) -> Result<Option<UserSubscription>, RepositoryError> {
        offline()
    }

    fn transition(
        &self,
        _id: SubscriptionId,
        _from: SubscriptionStatus,
        _to: SubscriptionStatus,
        _at: DateTime<Utc>,
    ) -> Result<UserSubscription, RepositoryError> {
        offline()
    }

    fn change_plan(
        &self,
        _id: SubscriptionId,
        _from: SubscriptionStatus,
        _plan: &SubscriptionPlan,
        _at: DateTime<Utc>,
    ) -> Result<PlanChange, RepositoryError> {
        offline()
    }

    fn debit_hours(
        &self,
        _id: SubscriptionId,
        _hours: Decimal,
        _cap: Decimal,
    ) -> Result<HoursDebit, RepositoryError> {
        offline()
    }
}

pub(super) fn request(
    method: &str,
    uri: &str,
    headers: &[(&str, &str)],
    body: Option<String>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    match body {
        Some(payload) => builder
            .header("content-type", "application/json")
            .body(Body::from(payload))
            .expect("request builds"),
        None => builder.body(Body::empty()).expect("request builds"),
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
