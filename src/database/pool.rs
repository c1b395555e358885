use crate::error::Result;
use crate::utils::time::step_window;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    if let Some(parent) = sqlite_file_path(database_url)
        .as_deref()
        .and_then(Path::parent)
        .filter(|p| !p.as_os_str().is_empty())
    {
        tokio::fs::create_dir_all(parent).await?;
    }

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(30))
        .connect_with(options)
        .await?;
    Ok(pool)
}

fn sqlite_file_path(database_url: &str) -> Option<PathBuf> {
    let rest = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() || path == ":memory:" {
        None
    } else {
        Some(PathBuf::from(path))
    }
}

/// Single-connection in-memory database with the schema applied. Every
/// connection to `sqlite::memory:` is its own database, so the pool must
/// never open a second one or drop the first.
pub async fn create_memory_pool() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;
    migrate(&pool).await?;
    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;

    if let Err(e) = backfill_attempt_deadlines(pool).await {
        warn!(error = ?e, "Failed to backfill quiz attempt deadlines");
    }
    Ok(())
}

/// Rows written before attempts carried deadlines get one step window from
/// their creation time.
async fn backfill_attempt_deadlines(pool: &SqlitePool) -> Result<u64> {
    let rows = sqlx::query(r#"SELECT id, created_at FROM quiz_attempts WHERE deadline IS NULL"#)
        .fetch_all(pool)
        .await?;

    if rows.is_empty() {
        return Ok(0);
    }

    info!(count = rows.len(), "Migrating quiz attempts with missing deadlines");

    let mut updated = 0;
    for row in rows {
        let id: i64 = row.try_get("id")?;
        let created_at: DateTime<Utc> = row.try_get("created_at")?;
        updated += sqlx::query(r#"UPDATE quiz_attempts SET deadline = ? WHERE id = ?"#)
            .bind(created_at + step_window())
            .bind(id)
            .execute(pool)
            .await?
            .rows_affected();
    }
    Ok(updated)
}
