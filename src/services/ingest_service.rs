use crate::dto::ingest_dto::TaskRequest;
use crate::error::{Error, Result};
use crate::models::ingest::{Ingest, IngestStatus};
use crate::utils::time::{step_window, SharedClock};
use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use subtle::ConstantTimeEq;
use tracing::info;

#[derive(Clone)]
pub struct IngestService {
    pool: SqlitePool,
    clock: SharedClock,
    accept_password: String,
}

impl IngestService {
    pub fn new(pool: SqlitePool, clock: SharedClock, accept_password: String) -> Self {
        Self {
            pool,
            clock,
            accept_password,
        }
    }

    pub async fn register(&self, req: &TaskRequest) -> Result<Ingest> {
        let now = self.clock.now();
        let raw = serde_json::to_string(req)?;

        let ingest = sqlx::query_as::<_, Ingest>(
            r#"
            INSERT INTO ingests (email, secret, url, raw, status, created_at, deadline)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&req.email)
        .bind(&req.secret)
        .bind(&req.url)
        .bind(raw)
        .bind(IngestStatus::Pending)
        .bind(now)
        .bind(now + step_window())
        .fetch_one(&self.pool)
        .await?;

        info!(ingest_id = ingest.id, email = %ingest.email, "Ingest registered");
        Ok(ingest)
    }

    pub async fn list(&self) -> Result<Vec<Ingest>> {
        let ingests = sqlx::query_as::<_, Ingest>(r#"SELECT * FROM ingests ORDER BY id ASC"#)
            .fetch_all(&self.pool)
            .await?;
        Ok(ingests)
    }

    pub async fn list_by_status(&self, status: IngestStatus) -> Result<Vec<Ingest>> {
        let ingests = sqlx::query_as::<_, Ingest>(
            r#"SELECT * FROM ingests WHERE status = ? ORDER BY id ASC"#,
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(ingests)
    }

    pub async fn get(&self, id: i64) -> Result<Ingest> {
        sqlx::query_as::<_, Ingest>(r#"SELECT * FROM ingests WHERE id = ?"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("ingest_not_found".to_string()))
    }

    /// Operator acknowledgement of a notification. Not guarded on the current
    /// status; accepting twice is harmless.
    pub async fn accept(&self, id: i64, password: &str) -> Result<()> {
        let matches: bool = password
            .as_bytes()
            .ct_eq(self.accept_password.as_bytes())
            .into();
        if !matches {
            return Err(Error::Unauthorized("invalid_password".to_string()));
        }

        self.get(id).await?;
        self.set_status(id, IngestStatus::Notified).await?;
        info!(ingest_id = id, "Ingest notification accepted");
        Ok(())
    }

    pub async fn set_status(&self, id: i64, status: IngestStatus) -> Result<u64> {
        let result = sqlx::query(r#"UPDATE ingests SET status = ? WHERE id = ?"#)
            .bind(status)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Updates every ingest registered under `email`, not just one.
    pub async fn set_status_by_email(&self, email: &str, status: IngestStatus) -> Result<u64> {
        let result = sqlx::query(r#"UPDATE ingests SET status = ? WHERE email = ?"#)
            .bind(status)
            .bind(email)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Updates every ingest registered under `email`, not just one.
    pub async fn set_deadline_by_email(&self, email: &str, deadline: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(r#"UPDATE ingests SET deadline = ? WHERE email = ?"#)
            .bind(deadline)
            .bind(email)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Administrative override: pushes back the deadline of every running or
    /// notified ingest for `email`.
    pub async fn extend_deadline(&self, email: &str, extension: Duration) -> Result<u64> {
        let ingests = sqlx::query_as::<_, Ingest>(
            r#"SELECT * FROM ingests WHERE email = ? AND status IN (?, ?)"#,
        )
        .bind(email)
        .bind(IngestStatus::Running)
        .bind(IngestStatus::Notified)
        .fetch_all(&self.pool)
        .await?;

        let mut updated = 0;
        for ingest in ingests {
            updated += sqlx::query(r#"UPDATE ingests SET deadline = ? WHERE id = ?"#)
                .bind(ingest.deadline + extension)
                .bind(ingest.id)
                .execute(&self.pool)
                .await?
                .rows_affected();
        }

        info!(email, updated, "Extended ingest deadlines");
        Ok(updated)
    }
}
