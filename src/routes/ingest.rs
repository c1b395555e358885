use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{
    dto::{
        api_response::ApiResponse,
        ingest_dto::{AcceptIngestQuery, IngestStarted, TaskRequest},
    },
    error::{Error, Result},
    AppState,
};

/// Registers the task and immediately opens its quiz session.
#[axum::debug_handler]
pub async fn create_ingest(
    State(state): State<AppState>,
    Json(payload): Json<TaskRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let ingest = state.ingest_service.register(&payload).await?;
    let session = state.quiz_service.start(&ingest, &ingest.url).await?;
    let ingest = state.ingest_service.get(ingest.id).await?;

    Ok(Json(ApiResponse::success(
        "quiz_session_started",
        IngestStarted { ingest, session },
    )))
}

#[axum::debug_handler]
pub async fn list_ingests(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let ingests = state.ingest_service.list().await?;
    Ok(Json(ApiResponse::success("ingests_listed", ingests)))
}

#[axum::debug_handler]
pub async fn accept_ingest(
    State(state): State<AppState>,
    Query(query): Query<AcceptIngestQuery>,
) -> Result<impl IntoResponse> {
    let id: i64 = query
        .id
        .trim()
        .parse()
        .map_err(|_| Error::BadRequest("invalid_id_parameter".to_string()))?;

    state.ingest_service.accept(id, &query.password).await?;
    Ok(Json(ApiResponse::success("ingest_accepted", ())))
}
