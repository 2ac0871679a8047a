use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::domain::PlanCode;
use super::entitlements::{EntitlementError, EntitlementService};
use super::gateway::BillingMethod;
use super::reconciler::{Acknowledgement, PaymentEvent, PaymentEventReconciler};
use super::repository::SubscriptionRepository;
use super::subscriptions::{SubscriptionError, SubscriptionService};
use crate::assessment::AssessmentRepository;
use crate::http::{rejection, CallerId};

/// Header the payment provider echoes back on every webhook delivery.
pub const WEBHOOK_TOKEN_HEADER: &str = "x-webhook-token";

/// Shared state for the subscription and webhook routes.
pub struct BillingState<S, A> {
    pub entitlements: Arc<EntitlementService<S, A>>,
    pub subscriptions: Arc<SubscriptionService<S>>,
    pub reconciler: Arc<PaymentEventReconciler<S>>,
    pub webhook_token: Option<String>,
}

impl<S, A> Clone for BillingState<S, A> {
    fn clone(&self) -> Self {
        Self {
            entitlements: self.entitlements.clone(),
            subscriptions: self.subscriptions.clone(),
            reconciler: self.reconciler.clone(),
            webhook_token: self.webhook_token.clone(),
        }
    }
}

/// Router exposing plans, entitlements, subscription management and the payment webhook.
pub fn billing_router<S, A>(state: BillingState<S, A>) -> Router
where
    S: SubscriptionRepository + 'static,
    A: AssessmentRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/subscriptions",
            post(subscribe_handler::<S, A>)
                .put(change_plan_handler::<S, A>)
                .delete(cancel_handler::<S, A>),
        )
        .route(
            "/api/v1/subscriptions/active",
            get(active_plan_handler::<S, A>),
        )
        .route(
            "/api/v1/subscriptions/can-create-diagnosis",
            get(can_create_handler::<S, A>),
        )
        .route(
            "/api/v1/subscriptions/remaining-hours",
            get(remaining_hours_handler::<S, A>),
        )
        .route(
            "/api/v1/subscriptions/usage-stats",
            get(usage_stats_handler::<S, A>),
        )
        .route(
            "/api/v1/subscriptions/track-hours",
            post(track_hours_handler::<S, A>),
        )
        .route("/api/v1/subscriptions/trial", post(trial_handler::<S, A>))
        .route("/api/v1/subscriptions/sync", post(sync_handler::<S, A>))
        .route("/api/v1/subscriptions/plans", get(plans_handler::<S, A>))
        .route(
            "/api/v1/subscriptions/plans/:code",
            get(plan_handler::<S, A>),
        )
        .route("/api/v1/webhooks/payments", post(webhook_handler::<S, A>))
        .with_state(state)
}

fn entitlement_reply<T: serde::Serialize>(result: Result<T, EntitlementError>) -> Response {
    match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(error) => rejection(error.kind(), &error),
    }
}

fn subscription_reply<T: serde::Serialize>(
    status: StatusCode,
    result: Result<T, SubscriptionError>,
) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(error) => rejection(error.kind(), &error),
    }
}

async fn active_plan_handler<S, A>(
    State(state): State<BillingState<S, A>>,
    CallerId(user): CallerId,
) -> Response
where
    S: SubscriptionRepository + 'static,
    A: AssessmentRepository + 'static,
{
    entitlement_reply(state.entitlements.active_plan(&user))
}

async fn can_create_handler<S, A>(
    State(state): State<BillingState<S, A>>,
    CallerId(user): CallerId,
) -> Response
where
    S: SubscriptionRepository + 'static,
    A: AssessmentRepository + 'static,
{
    entitlement_reply(state.entitlements.can_create_diagnosis(&user))
}

async fn remaining_hours_handler<S, A>(
    State(state): State<BillingState<S, A>>,
    CallerId(user): CallerId,
) -> Response
where
    S: SubscriptionRepository + 'static,
    A: AssessmentRepository + 'static,
{
    entitlement_reply(state.entitlements.remaining_hours(&user))
}

async fn usage_stats_handler<S, A>(
    State(state): State<BillingState<S, A>>,
    CallerId(user): CallerId,
) -> Response
where
    S: SubscriptionRepository + 'static,
    A: AssessmentRepository + 'static,
{
    entitlement_reply(state.entitlements.usage_stats(&user))
}

#[derive(Debug, Deserialize)]
pub(crate) struct TrackHoursRequest {
    hours: Decimal,
}

pub(crate) async fn track_hours_handler<S, A>(
    State(state): State<BillingState<S, A>>,
    CallerId(user): CallerId,
    Json(request): Json<TrackHoursRequest>,
) -> Response
where
    S: SubscriptionRepository + 'static,
    A: AssessmentRepository + 'static,
{
    entitlement_reply(state.entitlements.track_hours(&user, request.hours))
}

async fn plans_handler<S, A>(State(state): State<BillingState<S, A>>) -> Response
where
    S: SubscriptionRepository + 'static,
    A: AssessmentRepository + 'static,
{
    (StatusCode::OK, Json(state.subscriptions.available_plans())).into_response()
}

async fn plan_handler<S, A>(
    State(state): State<BillingState<S, A>>,
    Path(code): Path<String>,
) -> Response
where
    S: SubscriptionRepository + 'static,
    A: AssessmentRepository + 'static,
{
    subscription_reply(StatusCode::OK, state.subscriptions.plan(&PlanCode(code)))
}

#[derive(Debug, Deserialize)]
struct SubscribeRequest {
    plan_code: PlanCode,
    #[serde(default)]
    billing_method: BillingMethod,
}

async fn subscribe_handler<S, A>(
    State(state): State<BillingState<S, A>>,
    CallerId(user): CallerId,
    Json(request): Json<SubscribeRequest>,
) -> Response
where
    S: SubscriptionRepository + 'static,
    A: AssessmentRepository + 'static,
{
    subscription_reply(
        StatusCode::CREATED,
        state
            .subscriptions
            .subscribe(&user, &request.plan_code, request.billing_method),
    )
}

#[derive(Debug, Deserialize)]
struct TrialRequest {
    plan_code: PlanCode,
    days: u32,
}

async fn trial_handler<S, A>(
    State(state): State<BillingState<S, A>>,
    CallerId(user): CallerId,
    Json(request): Json<TrialRequest>,
) -> Response
where
    S: SubscriptionRepository + 'static,
    A: AssessmentRepository + 'static,
{
    subscription_reply(
        StatusCode::CREATED,
        state
            .subscriptions
            .start_trial(&user, &request.plan_code, request.days),
    )
}

#[derive(Debug, Deserialize)]
struct ChangePlanRequest {
    plan_code: PlanCode,
}

async fn change_plan_handler<S, A>(
    State(state): State<BillingState<S, A>>,
    CallerId(user): CallerId,
    Json(request): Json<ChangePlanRequest>,
) -> Response
where
    S: SubscriptionRepository + 'static,
    A: AssessmentRepository + 'static,
{
    subscription_reply(
        StatusCode::OK,
        state.subscriptions.change_plan(&user, &request.plan_code),
    )
}

async fn cancel_handler<S, A>(
    State(state): State<BillingState<S, A>>,
    CallerId(user): CallerId,
) -> Response
where
    S: SubscriptionRepository + 'static,
    A: AssessmentRepository + 'static,
{
    subscription_reply(StatusCode::OK, state.subscriptions.cancel(&user))
}

async fn sync_handler<S, A>(
    State(state): State<BillingState<S, A>>,
    CallerId(user): CallerId,
) -> Response
where
    S: SubscriptionRepository + 'static,
    A: AssessmentRepository + 'static,
{
    subscription_reply(StatusCode::OK, state.subscriptions.sync_status(&user))
}

/// Authenticates the delivery, then always acknowledges so the provider stops retrying.
pub(crate) async fn webhook_handler<S, A>(
    State(state): State<BillingState<S, A>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    S: SubscriptionRepository + 'static,
    A: AssessmentRepository + 'static,
{
    if let Some(expected) = &state.webhook_token {
        let presented = headers
            .get(WEBHOOK_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok());
        if presented != Some(expected.as_str()) {
            warn!("payment webhook rejected: invalid token");
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "invalid webhook token" })),
            )
                .into_response();
        }
    }

    let acknowledgement = match serde_json::from_slice::<PaymentEvent>(&body) {
        Ok(event) => state.reconciler.handle(&event),
        Err(err) => {
            warn!(error = %err, "unreadable payment webhook payload");
            Acknowledgement::received()
        }
    };
    (StatusCode::OK, Json(acknowledgement)).into_response()
}
