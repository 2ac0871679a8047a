//! Shared HTTP plumbing for the domain routers.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use tracing::error;

use crate::assessment::UserId;
use crate::error::ErrorKind;

/// Header carrying the authenticated user id, set by the upstream auth layer.
pub const CALLER_HEADER: &str = "x-user-id";

/// Caller identity resolved from [`CALLER_HEADER`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerId(pub UserId);

#[async_trait]
impl<S> FromRequestParts<S> for CallerId
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(CALLER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| CallerId(UserId(value.to_string())))
            .ok_or_else(|| {
                let payload = json!({ "error": "missing caller identity" });
                (StatusCode::UNAUTHORIZED, Json(payload)).into_response()
            })
    }
}

/// Renders a service rejection. Internal faults are logged and replaced by a generic message.
pub fn rejection(kind: ErrorKind, detail: impl std::fmt::Display) -> Response {
    rejection_with(kind, detail, None)
}

/// Same as [`rejection`] with extra structured fields merged into the body.
pub fn rejection_with(
    kind: ErrorKind,
    detail: impl std::fmt::Display,
    extra: Option<Value>,
) -> Response {
    let message = if kind == ErrorKind::Internal {
        error!(detail = %detail, "internal fault while serving request");
        "internal error".to_string()
    } else {
        detail.to_string()
    };

    let mut payload = json!({ "error": message, "kind": kind });
    if let (Some(Value::Object(fields)), Some(body)) = (extra, payload.as_object_mut()) {
        body.extend(fields);
    }

    (kind.status_code(), Json(payload)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn internal_faults_hide_details() {
        let response = rejection(ErrorKind::Internal, "connection refused by 10.0.0.4:5432");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        let text = String::from_utf8(body.to_vec()).expect("utf8");
        assert!(text.contains("internal error"));
        assert!(!text.contains("10.0.0.4"));
    }

    #[tokio::test]
    async fn merges_structured_fields() {
        let response = rejection_with(
            ErrorKind::CapacityExceeded,
            "limit reached",
            Some(json!({ "limit": 1, "current_count": 1 })),
        );
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        let value: Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(value["limit"], 1);
        assert_eq!(value["kind"], "capacity_exceeded");
    }
}
