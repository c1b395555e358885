pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::services::{
    ingest_service::IngestService, notification_service::NotificationService,
    quiz_service::QuizService, submission_service::SubmissionService,
};
use crate::utils::time::SharedClock;
use reqwest::Client;
use sqlx::SqlitePool;
use std::sync::Arc;

/// Everything a request handler or background task needs, built once at
/// startup and cloned into each of them.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Arc<Config>,
    pub ingest_service: IngestService,
    pub quiz_service: QuizService,
    pub notification_service: NotificationService,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: Config, clock: SharedClock) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;

        let ingest_service = IngestService::new(
            pool.clone(),
            clock.clone(),
            config.ingest_accept_password.clone(),
        );
        let submission_service = SubmissionService::new(http_client.clone());
        let quiz_service = QuizService::new(
            pool.clone(),
            clock,
            ingest_service.clone(),
            submission_service,
        );
        let notification_service = NotificationService::new(
            ingest_service.clone(),
            http_client,
            config.notification_url(),
        );

        Ok(Self {
            pool,
            config: Arc::new(config),
            ingest_service,
            quiz_service,
            notification_service,
        })
    }
}
