pub mod health;
pub mod ingest;
pub mod quiz;

use axum::{
    routing::{get, post},
    Router,
};
use std::path::Path;
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::{middleware::auth::require_ingest_secret, AppState};

pub fn app(state: AppState) -> Router {
    let public_dir = Path::new(&state.config.public_dir).to_path_buf();
    let index = public_dir.join("index.html");

    let ingest_api = Router::new()
        .route(
            "/ingest",
            post(ingest::create_ingest).get(ingest::list_ingests),
        )
        .route(
            "/ingest/notification-accept",
            get(ingest::accept_ingest),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_ingest_secret,
        ));

    let quiz_api = Router::new()
        .route("/quiz/sessions", get(quiz::list_sessions))
        .route("/quiz/sessions/:id/attempts", get(quiz::list_attempts))
        .route("/quiz/sessions/:id/answer", post(quiz::submit_answer))
        .route("/quiz/pending", get(quiz::list_pending_attempts));

    Router::new()
        .route("/health", get(health::health))
        .merge(ingest_api)
        .merge(quiz_api)
        .nest_service("/assets", ServeDir::new(public_dir.join("assets")))
        .route_service("/quiz-interface", ServeFile::new(index.clone()))
        .fallback_service(ServeFile::new(index))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
