use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use subtle::ConstantTimeEq;

use crate::{
    dto::{api_response::ApiResponse, quiz_dto::SubmitAnswerRequest},
    error::{Error, Result},
    AppState,
};

#[axum::debug_handler]
pub async fn list_sessions(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let sessions = state.quiz_service.list_sessions().await?;
    Ok(Json(ApiResponse::success("sessions_retrieved", sessions)))
}

#[axum::debug_handler]
pub async fn list_attempts(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let session_id = parse_session_id(&id)?;
    let attempts = state.quiz_service.list_attempts(session_id).await?;
    Ok(Json(ApiResponse::success("attempts_retrieved", attempts)))
}

#[axum::debug_handler]
pub async fn list_pending_attempts(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let attempts = state.quiz_service.list_pending_attempts().await?;
    Ok(Json(ApiResponse::success(
        "pending_attempts_retrieved",
        attempts,
    )))
}

#[axum::debug_handler]
pub async fn submit_answer(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<impl IntoResponse> {
    let session_id = parse_session_id(&id)?;

    let submit_url = payload.submit_url.trim();
    if submit_url.is_empty() {
        return Err(Error::BadRequest("submit_url_required".to_string()));
    }
    url::Url::parse(submit_url)
        .map_err(|e| Error::BadRequest(format!("invalid_submit_url: {}", e)))?;

    let expected = state.config.quiz_attempt_password.as_bytes();
    if !bool::from(payload.password.as_bytes().ct_eq(expected)) {
        return Err(Error::Unauthorized("invalid_password".to_string()));
    }

    let verdict = state
        .quiz_service
        .submit_answer(session_id, &payload.answer, submit_url)
        .await?;

    Ok(Json(ApiResponse::success("answer_submitted", verdict)))
}

fn parse_session_id(raw: &str) -> Result<i64> {
    raw.trim()
        .parse()
        .map_err(|_| Error::BadRequest("invalid_session_id".to_string()))
}
