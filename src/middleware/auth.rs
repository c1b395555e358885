use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use serde_json::json;
use subtle::ConstantTimeEq;

use crate::AppState;

const MAX_INGEST_BODY: usize = 1024 * 1024;

#[derive(Debug, Deserialize)]
struct SecretProbe {
    #[serde(default)]
    secret: String,
}

/// Guards ingest registration: the JSON body must carry the shared secret.
/// Other methods pass straight through. The body is buffered and put back
/// for the handler.
pub async fn require_ingest_secret(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    if req.method() != Method::POST {
        return next.run(req).await;
    }

    let (parts, body) = req.into_parts();
    let Ok(bytes) = to_bytes(body, MAX_INGEST_BODY).await else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error":"could_not_read_request_body"})),
        )
            .into_response();
    };

    let Ok(probe) = serde_json::from_slice::<SecretProbe>(&bytes) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error":"invalid_request_body"})),
        )
            .into_response();
    };

    let expected = state.config.ingest_secret.as_bytes();
    if !bool::from(probe.secret.as_bytes().ct_eq(expected)) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error":"invalid_secret"})),
        )
            .into_response();
    }

    next.run(axum::http::Request::from_parts(parts, Body::from(bytes)))
        .await
}
