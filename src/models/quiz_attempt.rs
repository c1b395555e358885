use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::utils::time::is_open;

pub const INITIAL_QUESTION: &str = "Visit the URL to see the question";
pub const NEXT_QUESTION: &str = "Visit the URL to see the next question";
pub const RETRY_QUESTION: &str =
    "Answer was incorrect. You can retry within the remaining time window.";

/// One question instance within a session. `answer` stays empty until the
/// operator submits; the verdict fields are filled in at the same time.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct QuizAttempt {
    pub id: i64,
    pub session_id: i64,
    pub url: String,
    pub question: String,
    pub answer: String,
    pub submit_url: String,
    pub correct: Option<bool>,
    pub next_url: String,
    pub reason: String,
    pub response_raw: String,
    pub deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl QuizAttempt {
    pub fn is_pending(&self, now: DateTime<Utc>) -> bool {
        self.answer.is_empty() && is_open(self.deadline, now)
    }
}
