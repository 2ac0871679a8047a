use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use super::domain::{ConsultationId, ConsultationStatus, ScheduleRequest};
use super::repository::ConsultationRepository;
use super::service::{ConsultationError, ConsultationService};
use crate::http::{rejection, CallerId};

pub fn consultation_router<C>(service: Arc<ConsultationService<C>>) -> Router
where
    C: ConsultationRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/consultations",
            post(schedule_handler::<C>).get(list_handler::<C>),
        )
        .route(
            "/api/v1/consultations/upcoming",
            get(upcoming_handler::<C>),
        )
        .route(
            "/api/v1/consultations/available-slots",
            get(slots_handler::<C>),
        )
        .route("/api/v1/consultations/:id", get(detail_handler::<C>))
        .route(
            "/api/v1/consultations/:id/start",
            post(start_handler::<C>),
        )
        .route(
            "/api/v1/consultations/:id/complete",
            post(complete_handler::<C>),
        )
        .route(
            "/api/v1/consultations/:id/cancel",
            post(cancel_handler::<C>),
        )
        .with_state(service)
}

fn reply<T: serde::Serialize>(
    status: StatusCode,
    result: Result<T, ConsultationError>,
) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(error) => rejection(error.kind(), &error),
    }
}

pub(crate) async fn schedule_handler<C>(
    State(service): State<Arc<ConsultationService<C>>>,
    CallerId(user): CallerId,
    Json(request): Json<ScheduleRequest>,
) -> Response
where
    C: ConsultationRepository + 'static,
{
    reply(StatusCode::CREATED, service.schedule(&user, request))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    status: Option<ConsultationStatus>,
}

async fn list_handler<C>(
    State(service): State<Arc<ConsultationService<C>>>,
    CallerId(user): CallerId,
    Query(query): Query<ListQuery>,
) -> Response
where
    C: ConsultationRepository + 'static,
{
    reply(StatusCode::OK, service.list(&user, query.status))
}

async fn upcoming_handler<C>(
    State(service): State<Arc<ConsultationService<C>>>,
    CallerId(user): CallerId,
) -> Response
where
    C: ConsultationRepository + 'static,
{
    reply(StatusCode::OK, service.upcoming(&user))
}

#[derive(Debug, Deserialize)]
struct SlotsQuery {
    date: NaiveDate,
}

async fn slots_handler<C>(
    State(service): State<Arc<ConsultationService<C>>>,
    Query(query): Query<SlotsQuery>,
) -> Response
where
    C: ConsultationRepository + 'static,
{
    reply(StatusCode::OK, service.available_slots(query.date))
}

async fn detail_handler<C>(
    State(service): State<Arc<ConsultationService<C>>>,
    CallerId(user): CallerId,
    Path(id): Path<Uuid>,
) -> Response
where
    C: ConsultationRepository + 'static,
{
    reply(StatusCode::OK, service.get(&user, ConsultationId(id)))
}

async fn start_handler<C>(
    State(service): State<Arc<ConsultationService<C>>>,
    CallerId(user): CallerId,
    Path(id): Path<Uuid>,
) -> Response
where
    C: ConsultationRepository + 'static,
{
    reply(StatusCode::OK, service.start(&user, ConsultationId(id)))
}

#[derive(Debug, Default, Deserialize)]
struct CompleteRequest {
    #[serde(default)]
    notes: Option<String>,
}

async fn complete_handler<C>(
    State(service): State<Arc<ConsultationService<C>>>,
    CallerId(user): CallerId,
    Path(id): Path<Uuid>,
    request: Option<Json<CompleteRequest>>,
) -> Response
where
    C: ConsultationRepository + 'static,
{
    let notes = request.and_then(|Json(body)| body.notes);
    reply(
        StatusCode::OK,
        service.complete(&user, ConsultationId(id), notes),
    )
}

async fn cancel_handler<C>(
    State(service): State<Arc<ConsultationService<C>>>,
    CallerId(user): CallerId,
    Path(id): Path<Uuid>,
) -> Response
where
    C: ConsultationRepository + 'static,
{
    reply(StatusCode::OK, service.cancel(&user, ConsultationId(id)))
}
