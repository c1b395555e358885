use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Lifecycle of an ingest. Moves forward only, except that `accept` may be
/// called on any ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum IngestStatus {
    Pending,
    #[serde(rename = "Notification Accepted")]
    #[sqlx(rename = "Notification Accepted")]
    Notified,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Ingest {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub secret: String,
    pub url: String,
    /// Request snapshot as received. Carries the shared secret, so it stays
    /// out of responses.
    #[serde(skip_serializing, default)]
    pub raw: String,
    pub status: IngestStatus,
    pub created_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
}
