use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::ingest::Ingest;
use crate::models::quiz_session::QuizSession;

/// Body of `POST /ingest`. Serialized as-is into the ingest's raw snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TaskRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub secret: String,
    #[validate(url)]
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct AcceptIngestQuery {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestStarted {
    pub ingest: Ingest,
    pub session: QuizSession,
}
