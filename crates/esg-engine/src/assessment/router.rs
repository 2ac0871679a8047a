use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::action_plan::ActionStatus;
use super::certification::certification_level;
use super::domain::{ActionId, DiagnosisId, ResponseSubmission, SimplifiedScores};
use super::repository::AssessmentRepository;
use super::service::{DiagnosisService, DiagnosisServiceError};
use crate::catalog::PillarCode;
use crate::error::ErrorKind;
use crate::http::{rejection, rejection_with, CallerId};

/// Router exposing the diagnosis lifecycle and the standalone tier lookup.
pub fn diagnosis_router<R>(service: Arc<DiagnosisService<R>>) -> Router
where
    R: AssessmentRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/diagnoses",
            post(start_handler::<R>).get(list_handler::<R>),
        )
        .route("/api/v1/diagnoses/:diagnosis_id", get(detail_handler::<R>))
        .route(
            "/api/v1/diagnoses/:diagnosis_id/responses",
            get(responses_handler::<R>).put(respond_handler::<R>),
        )
        .route(
            "/api/v1/diagnoses/:diagnosis_id/progress",
            get(progress_handler::<R>),
        )
        .route(
            "/api/v1/diagnoses/:diagnosis_id/partial-scores",
            get(partial_scores_handler::<R>),
        )
        .route(
            "/api/v1/diagnoses/:diagnosis_id/pillars/:pillar_code/score",
            get(pillar_score_handler::<R>),
        )
        .route(
            "/api/v1/diagnoses/:diagnosis_id/complete",
            post(complete_handler::<R>),
        )
        .route(
            "/api/v1/diagnoses/:diagnosis_id/complete-simplified",
            post(complete_simplified_handler::<R>),
        )
        .route(
            "/api/v1/diagnoses/:diagnosis_id/rescore",
            post(rescore_handler::<R>),
        )
        .route(
            "/api/v1/diagnoses/:diagnosis_id/results",
            get(results_handler::<R>),
        )
        .route(
            "/api/v1/diagnoses/:diagnosis_id/report",
            get(report_handler::<R>),
        )
        .route(
            "/api/v1/diagnoses/:diagnosis_id/actions/:action_id",
            patch(action_status_handler::<R>),
        )
        .route(
            "/api/v1/certification-level",
            get(certification_level_handler),
        )
        .with_state(service)
}

fn failure(error: DiagnosisServiceError) -> Response {
    match &error {
        DiagnosisServiceError::LimitReached(allowance) => rejection_with(
            error.kind(),
            &error,
            Some(json!({
                "current_count": allowance.current_count,
                "limit": allowance.limit,
                "plan_code": allowance.plan_code,
                "upgrade_required": true,
            })),
        ),
        _ => rejection(error.kind(), &error),
    }
}

fn respond<T: serde::Serialize>(
    status: StatusCode,
    result: Result<T, DiagnosisServiceError>,
) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn start_handler<R>(
    State(service): State<Arc<DiagnosisService<R>>>,
    CallerId(user): CallerId,
) -> Response
where
    R: AssessmentRepository + 'static,
{
    match service.start(&user) {
        Ok(started) if started.reused => (StatusCode::OK, Json(started)).into_response(),
        Ok(started) => (StatusCode::CREATED, Json(started)).into_response(),
        Err(error) => failure(error),
    }
}

async fn list_handler<R>(
    State(service): State<Arc<DiagnosisService<R>>>,
    CallerId(user): CallerId,
) -> Response
where
    R: AssessmentRepository + 'static,
{
    respond(StatusCode::OK, service.list(&user))
}

async fn detail_handler<R>(
    State(service): State<Arc<DiagnosisService<R>>>,
    CallerId(user): CallerId,
    Path(id): Path<Uuid>,
) -> Response
where
    R: AssessmentRepository + 'static,
{
    respond(StatusCode::OK, service.get(&user, DiagnosisId(id)))
}

async fn responses_handler<R>(
    State(service): State<Arc<DiagnosisService<R>>>,
    CallerId(user): CallerId,
    Path(id): Path<Uuid>,
) -> Response
where
    R: AssessmentRepository + 'static,
{
    respond(StatusCode::OK, service.responses(&user, DiagnosisId(id)))
}

pub(crate) async fn respond_handler<R>(
    State(service): State<Arc<DiagnosisService<R>>>,
    CallerId(user): CallerId,
    Path(id): Path<Uuid>,
    Json(submission): Json<ResponseSubmission>,
) -> Response
where
    R: AssessmentRepository + 'static,
{
    respond(
        StatusCode::OK,
        service.record_response(&user, DiagnosisId(id), submission),
    )
}

async fn progress_handler<R>(
    State(service): State<Arc<DiagnosisService<R>>>,
    CallerId(user): CallerId,
    Path(id): Path<Uuid>,
) -> Response
where
    R: AssessmentRepository + 'static,
{
    respond(StatusCode::OK, service.progress(&user, DiagnosisId(id)))
}

async fn partial_scores_handler<R>(
    State(service): State<Arc<DiagnosisService<R>>>,
    CallerId(user): CallerId,
    Path(id): Path<Uuid>,
) -> Response
where
    R: AssessmentRepository + 'static,
{
    respond(StatusCode::OK, service.partial_scores(&user, DiagnosisId(id)))
}

async fn pillar_score_handler<R>(
    State(service): State<Arc<DiagnosisService<R>>>,
    CallerId(user): CallerId,
    Path((id, pillar_code)): Path<(Uuid, String)>,
) -> Response
where
    R: AssessmentRepository + 'static,
{
    let Some(code) = PillarCode::from_code(&pillar_code) else {
        return rejection(
            ErrorKind::NotFound,
            format!("pillar '{pillar_code}' not found"),
        );
    };
    match service.pillar_score(&user, DiagnosisId(id), code) {
        Ok(score) => (
            StatusCode::OK,
            Json(json!({ "pillar": code, "score": score })),
        )
            .into_response(),
        Err(error) => failure(error),
    }
}

async fn complete_handler<R>(
    State(service): State<Arc<DiagnosisService<R>>>,
    CallerId(user): CallerId,
    Path(id): Path<Uuid>,
) -> Response
where
    R: AssessmentRepository + 'static,
{
    respond(StatusCode::OK, service.complete(&user, DiagnosisId(id)))
}

async fn complete_simplified_handler<R>(
    State(service): State<Arc<DiagnosisService<R>>>,
    CallerId(user): CallerId,
    Path(id): Path<Uuid>,
    Json(scores): Json<SimplifiedScores>,
) -> Response
where
    R: AssessmentRepository + 'static,
{
    respond(
        StatusCode::OK,
        service.complete_simplified(&user, DiagnosisId(id), scores),
    )
}

async fn rescore_handler<R>(
    State(service): State<Arc<DiagnosisService<R>>>,
    CallerId(user): CallerId,
    Path(id): Path<Uuid>,
) -> Response
where
    R: AssessmentRepository + 'static,
{
    respond(StatusCode::OK, service.rescore(&user, DiagnosisId(id)))
}

async fn results_handler<R>(
    State(service): State<Arc<DiagnosisService<R>>>,
    CallerId(user): CallerId,
    Path(id): Path<Uuid>,
) -> Response
where
    R: AssessmentRepository + 'static,
{
    respond(StatusCode::OK, service.results(&user, DiagnosisId(id)))
}

async fn report_handler<R>(
    State(service): State<Arc<DiagnosisService<R>>>,
    CallerId(user): CallerId,
    Path(id): Path<Uuid>,
) -> Response
where
    R: AssessmentRepository + 'static,
{
    respond(StatusCode::OK, service.report(&user, DiagnosisId(id)))
}

#[derive(Debug, Deserialize)]
struct ActionStatusUpdate {
    status: ActionStatus,
}

async fn action_status_handler<R>(
    State(service): State<Arc<DiagnosisService<R>>>,
    CallerId(user): CallerId,
    Path((id, action_id)): Path<(Uuid, u64)>,
    Json(update): Json<ActionStatusUpdate>,
) -> Response
where
    R: AssessmentRepository + 'static,
{
    respond(
        StatusCode::OK,
        service.update_action_status(&user, DiagnosisId(id), ActionId(action_id), update.status),
    )
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScoreQuery {
    score: String,
}

pub(crate) async fn certification_level_handler(Query(query): Query<ScoreQuery>) -> Response {
    let score = match query.score.trim().parse::<Decimal>() {
        Ok(score) if score >= Decimal::ZERO && score <= Decimal::ONE_HUNDRED => score,
        _ => {
            return rejection(
                ErrorKind::Validation,
                "score must be a number between 0 and 100",
            )
        }
    };
    let tier = certification_level(score);
    (
        StatusCode::OK,
        Json(json!({ "score": score, "level": tier.level, "label": tier.label })),
    )
        .into_response()
}
