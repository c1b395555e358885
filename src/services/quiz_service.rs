use crate::error::{Error, Result};
use crate::models::ingest::{Ingest, IngestStatus};
use crate::models::quiz_attempt::{QuizAttempt, INITIAL_QUESTION, NEXT_QUESTION, RETRY_QUESTION};
use crate::models::quiz_session::{QuizSession, SessionStatus};
use crate::services::ingest_service::IngestService;
use crate::services::submission_service::{SubmissionService, Verdict};
use crate::utils::time::{step_window, SharedClock};
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::SqlitePool;
use tracing::info;

/// What happens to a session after a verdict is recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// The endpoint handed out another question. Wins over `correct`.
    Chain { next_url: String },
    Complete,
    /// Same question again, inside the original window.
    Retry,
}

impl Transition {
    pub fn from_verdict(verdict: &Verdict) -> Self {
        if let Some(next_url) = verdict.next_url() {
            Transition::Chain {
                next_url: next_url.to_string(),
            }
        } else if verdict.correct {
            Transition::Complete
        } else {
            Transition::Retry
        }
    }
}

#[derive(Clone)]
pub struct QuizService {
    pool: SqlitePool,
    clock: SharedClock,
    ingests: IngestService,
    submission: SubmissionService,
}

impl QuizService {
    pub fn new(
        pool: SqlitePool,
        clock: SharedClock,
        ingests: IngestService,
        submission: SubmissionService,
    ) -> Self {
        Self {
            pool,
            clock,
            ingests,
            submission,
        }
    }

    /// Opens the session for `ingest` with its first attempt and marks the
    /// ingest as running.
    pub async fn start(&self, ingest: &Ingest, initial_url: &str) -> Result<QuizSession> {
        let now = self.clock.now();

        let session = sqlx::query_as::<_, QuizSession>(
            r#"
            INSERT INTO quiz_sessions (ingest_id, email, secret, current_url, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(ingest.id)
        .bind(&ingest.email)
        .bind(&ingest.secret)
        .bind(initial_url)
        .bind(SessionStatus::WaitingForAnswer)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        self.ingests
            .set_status(ingest.id, IngestStatus::Running)
            .await?;

        let attempt = self
            .insert_attempt(session.id, initial_url, INITIAL_QUESTION, Some(now + step_window()))
            .await?;

        info!(
            session_id = session.id,
            ingest_id = ingest.id,
            attempt_id = attempt.id,
            "Quiz session started"
        );
        Ok(session)
    }

    /// Forwards `answer` to `submit_url`, records the verdict on the session's
    /// pending attempt and moves the session along.
    pub async fn submit_answer(
        &self,
        session_id: i64,
        answer: &JsonValue,
        submit_url: &str,
    ) -> Result<Verdict> {
        let session = self.get_session(session_id).await?;
        let attempt = self.current_attempt(session_id).await?;

        let verdict = self.submission.submit(submit_url, answer).await?;

        let attempt = self
            .record_verdict(&attempt, answer, submit_url, &verdict)
            .await?;

        match Transition::from_verdict(&verdict) {
            Transition::Chain { next_url } => self.chain(&session, &next_url).await?,
            Transition::Complete => self.complete(&session).await?,
            Transition::Retry => self.retry(&session, &attempt).await?,
        }

        Ok(verdict)
    }

    /// Latest unanswered attempt of the session whose deadline is unset or
    /// still ahead.
    pub async fn current_attempt(&self, session_id: i64) -> Result<QuizAttempt> {
        let now = self.clock.now();
        let unanswered = sqlx::query_as::<_, QuizAttempt>(
            r#"
            SELECT * FROM quiz_attempts
            WHERE session_id = ? AND answer = ''
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        unanswered
            .into_iter()
            .find(|attempt| attempt.is_pending(now))
            .ok_or(Error::NoPendingAttempt)
    }

    pub async fn get_session(&self, session_id: i64) -> Result<QuizSession> {
        sqlx::query_as::<_, QuizSession>(r#"SELECT * FROM quiz_sessions WHERE id = ?"#)
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("quiz_session_not_found".to_string()))
    }

    pub async fn list_sessions(&self) -> Result<Vec<QuizSession>> {
        let sessions = sqlx::query_as::<_, QuizSession>(
            r#"SELECT * FROM quiz_sessions ORDER BY created_at DESC, id DESC"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(sessions)
    }

    pub async fn list_attempts(&self, session_id: i64) -> Result<Vec<QuizAttempt>> {
        let attempts = sqlx::query_as::<_, QuizAttempt>(
            r#"SELECT * FROM quiz_attempts WHERE session_id = ? ORDER BY created_at ASC, id ASC"#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(attempts)
    }

    /// The operator's work queue: open attempts across all sessions, oldest
    /// first.
    pub async fn list_pending_attempts(&self) -> Result<Vec<QuizAttempt>> {
        let now = self.clock.now();
        let unanswered = sqlx::query_as::<_, QuizAttempt>(
            r#"SELECT * FROM quiz_attempts WHERE answer = '' ORDER BY created_at ASC, id ASC"#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(unanswered
            .into_iter()
            .filter(|attempt| attempt.is_pending(now))
            .collect())
    }

    /// The `answer = ''` guard makes the claim conditional: a concurrent
    /// submission that already filled the row leaves nothing to update.
    async fn record_verdict(
        &self,
        attempt: &QuizAttempt,
        answer: &JsonValue,
        submit_url: &str,
        verdict: &Verdict,
    ) -> Result<QuizAttempt> {
        let answer_json = serde_json::to_string(answer)?;
        let response_raw = serde_json::to_string(verdict)?;

        sqlx::query_as::<_, QuizAttempt>(
            r#"
            UPDATE quiz_attempts
            SET answer = ?, submit_url = ?, correct = ?, next_url = ?, reason = ?, response_raw = ?
            WHERE id = ? AND answer = ''
            RETURNING *
            "#,
        )
        .bind(answer_json)
        .bind(submit_url)
        .bind(verdict.correct)
        .bind(&verdict.url)
        .bind(&verdict.reason)
        .bind(response_raw)
        .bind(attempt.id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(Error::NoPendingAttempt)
    }

    async fn chain(&self, session: &QuizSession, next_url: &str) -> Result<()> {
        let now = self.clock.now();
        sqlx::query(r#"UPDATE quiz_sessions SET current_url = ?, updated_at = ? WHERE id = ?"#)
            .bind(next_url)
            .bind(now)
            .bind(session.id)
            .execute(&self.pool)
            .await?;

        let deadline = now + step_window();
        let next = self
            .insert_attempt(session.id, next_url, NEXT_QUESTION, Some(deadline))
            .await?;

        // Keyed by email, so every ingest sharing the address moves with it.
        self.ingests
            .set_deadline_by_email(&session.email, deadline)
            .await?;

        info!(
            session_id = session.id,
            attempt_id = next.id,
            next_url,
            "Quiz chained to next question"
        );
        Ok(())
    }

    async fn complete(&self, session: &QuizSession) -> Result<()> {
        sqlx::query(r#"UPDATE quiz_sessions SET status = ?, updated_at = ? WHERE id = ?"#)
            .bind(SessionStatus::Completed)
            .bind(self.clock.now())
            .bind(session.id)
            .execute(&self.pool)
            .await?;

        self.ingests
            .set_status_by_email(&session.email, IngestStatus::Completed)
            .await?;

        info!(session_id = session.id, "Quiz session completed");
        Ok(())
    }

    async fn retry(&self, session: &QuizSession, answered: &QuizAttempt) -> Result<()> {
        let retry = self
            .insert_attempt(session.id, &answered.url, RETRY_QUESTION, answered.deadline)
            .await?;

        info!(
            session_id = session.id,
            attempt_id = retry.id,
            deadline = ?retry.deadline,
            "Incorrect answer, retry attempt opened"
        );
        Ok(())
    }

    async fn insert_attempt(
        &self,
        session_id: i64,
        url: &str,
        question: &str,
        deadline: Option<DateTime<Utc>>,
    ) -> Result<QuizAttempt> {
        let attempt = sqlx::query_as::<_, QuizAttempt>(
            r#"
            INSERT INTO quiz_attempts (session_id, url, question, deadline, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(session_id)
        .bind(url)
        .bind(question)
        .bind(deadline)
        .bind(self.clock.now())
        .fetch_one(&self.pool)
        .await?;
        Ok(attempt)
    }
}
