use super::common::*;
use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

use crate::consultation::router::schedule_handler;
use crate::consultation::consultation_router;
use crate::http::{CallerId, CALLER_HEADER};

#[tokio::test]
async fn schedule_handler_returns_created() {
    let (service, _) = build_service(StubLedger::with_hours(8));
    let response = schedule_handler(
        State(Arc::new(service)),
        CallerId(user("ana")),
        Json(booking(in_days(2, 10), 60)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    assert_eq!(body["status"], "scheduled");
    assert_eq!(body["duration_minutes"], 60);
}

#[tokio::test]
async fn insufficient_hours_map_to_payment_required() {
    let (service, _) = build_service(StubLedger::with_hours(0));
    let response = schedule_handler(
        State(Arc::new(service)),
        CallerId(user("bia")),
        Json(booking(in_days(2, 10), 30)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
}

#[tokio::test]
async fn lifecycle_through_the_router() {
    let (service, ledger) = build_service(StubLedger::with_hours(8));
    let service = Arc::new(service);
    let booked = service
        .schedule(&user("caio"), booking(in_days(1, 16), 120))
        .expect("book");
    let router = consultation_router(service);

    let post = |path: String, body: Body| {
        Request::builder()
            .method("POST")
            .uri(path)
            .header(CALLER_HEADER, "caio")
            .header("content-type", "application/json")
            .body(body)
            .expect("request builds")
    };

    let started = router
        .clone()
        .oneshot(post(
            format!("/api/v1/consultations/{}/start", booked.id),
            Body::empty(),
        ))
        .await
        .expect("router responds");
    assert_eq!(started.status(), StatusCode::OK);

    let restarted = router
        .clone()
        .oneshot(post(
            format!("/api/v1/consultations/{}/start", booked.id),
            Body::empty(),
        ))
        .await
        .expect("router responds");
    assert_eq!(restarted.status(), StatusCode::CONFLICT);

    let completed = router
        .clone()
        .oneshot(post(
            format!("/api/v1/consultations/{}/complete", booked.id),
            Body::from(json!({ "notes": "Matriz de materialidade" }).to_string()),
        ))
        .await
        .expect("router responds");
    assert_eq!(completed.status(), StatusCode::OK);
    let body = read_json_body(completed).await;
    assert_eq!(body["status"], "completed");
    assert_eq!(body["notes"], "Matriz de materialidade");
    assert_eq!(ledger.debits().len(), 1);

    let foreign = router
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/consultations/{}", booked.id))
                .header(CALLER_HEADER, "intruder")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    assert_eq!(foreign.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn available_slots_need_a_valid_date() {
    let (service, _) = build_service(StubLedger::with_hours(8));
    let router = consultation_router(Arc::new(service));

    let ok = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/consultations/available-slots?date=2030-03-04")
                .header(CALLER_HEADER, "dani")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    assert_eq!(ok.status(), StatusCode::OK);
    let body = read_json_body(ok).await;
    assert_eq!(body.as_array().map(Vec::len), Some(9));

    let bad = router
        .oneshot(
            Request::builder()
                .uri("/api/v1/consultations/available-slots?date=tomorrow")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
}
