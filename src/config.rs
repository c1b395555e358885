use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub ingest_secret: String,
    pub ingest_accept_password: String,
    pub quiz_attempt_password: String,
    pub ntfy_base_url: String,
    pub ntfy_topic: String,
    pub notify_interval: Duration,
    pub public_dir: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let notify_interval_ms: u64 = get_env_parse_or("NOTIFY_INTERVAL_MS", 1000)?;

        Ok(Self {
            server_address: get_env_or("SERVER_ADDRESS", "0.0.0.0:8080"),
            database_url: get_env_or("DATABASE_URL", "sqlite://data/app.db?mode=rwc"),
            ingest_secret: get_env("SECRET")?,
            ingest_accept_password: get_env("INGEST_ACCEPT_PASSWORD")?,
            quiz_attempt_password: get_env("QUIZ_ATTEMPT_PASSWORD")?,
            ntfy_base_url: get_env_or("NTFY_BASE_URL", "https://ntfy.sh"),
            ntfy_topic: get_env("NTFY_TOPIC")?,
            notify_interval: Duration::from_millis(notify_interval_ms.max(1)),
            public_dir: get_env_or("PUBLIC_DIR", "./public"),
        })
    }

    /// Full URL of the push-notification topic.
    pub fn notification_url(&self) -> String {
        format!(
            "{}/{}",
            self.ntfy_base_url.trim_end_matches('/'),
            self.ntfy_topic
        )
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_or(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        _ => Ok(default),
    }
}
